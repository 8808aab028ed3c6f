use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::recommendation::Sex;

#[derive(Parser, Debug)]
#[command(author, version, about = "Meal log with model-estimated calories", long_about = None)]
pub struct Cli {
    /// Read configuration from this dotenv file instead of the environment
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Run without an inference gateway; estimates degrade to 0
    #[arg(long, global = true)]
    pub offline: bool,

    /// Start the meal log with the two sample meals
    #[arg(long, global = true)]
    pub sample_meals: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate the calories of one meal
    Calories {
        food: String,
        quantity: String,
    },
    /// Recommended daily calories and water for a profile
    Recommend {
        #[arg(long)]
        age: u32,
        #[arg(long)]
        sex: Sex,
        /// Height in centimeters
        #[arg(long)]
        height: f64,
        /// Weight in kilograms
        #[arg(long)]
        weight: f64,
    },
    /// Ask for three recipes related to a request
    Suggest {
        query: String,
    },
    /// Interactive session reading commands from stdin
    Session,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// One line typed into an interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    AddMeal { food: String, quantity: String },
    DeleteMeal(u64),
    ListMeals,
    Total,
    AddRecipe {
        name: String,
        ingredients: String,
        instructions: String,
    },
    DeleteRecipe(u64),
    ListRecipes,
    Suggest(String),
    Recommend {
        age: u32,
        sex: Sex,
        height_cm: f64,
        weight_kg: f64,
    },
    Status,
    Help,
    Quit,
}

pub const SESSION_HELP: &str = "\
commands:
  add <food...> <quantity>        log a meal (quantity is the last word)
  del <id>                        delete a meal
  list                            list meals
  total                           total calories
  recipe <name> | <ingredients> | <instructions>
  recipes                         list recipes
  unrecipe <id>                   delete a recipe
  suggest <request...>            ask for three related recipes
  recommend <age> <sex> <height_cm> <weight_kg>
  status                          recommendation, loading states, counters
  help | quit";

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "add" => {
                let (food, quantity) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or("usage: add <food...> <quantity>")?;
                Ok(SessionCommand::AddMeal {
                    food: food.trim().to_string(),
                    quantity: quantity.to_string(),
                })
            }
            "del" => parse_id(rest).map(SessionCommand::DeleteMeal),
            "list" => Ok(SessionCommand::ListMeals),
            "total" => Ok(SessionCommand::Total),
            "recipe" => {
                let parts: Vec<&str> = rest.splitn(3, '|').map(str::trim).collect();
                match parts.as_slice() {
                    [name, ingredients, instructions] => Ok(SessionCommand::AddRecipe {
                        name: name.to_string(),
                        ingredients: ingredients.to_string(),
                        instructions: instructions.to_string(),
                    }),
                    _ => Err("usage: recipe <name> | <ingredients> | <instructions>".to_string()),
                }
            }
            "recipes" => Ok(SessionCommand::ListRecipes),
            "unrecipe" => parse_id(rest).map(SessionCommand::DeleteRecipe),
            "suggest" => Ok(SessionCommand::Suggest(rest.to_string())),
            "recommend" => {
                let fields: Vec<&str> = rest.split_whitespace().collect();
                let [age, sex, height, weight] = fields.as_slice() else {
                    return Err("usage: recommend <age> <sex> <height_cm> <weight_kg>".to_string());
                };
                Ok(SessionCommand::Recommend {
                    age: age.parse().map_err(|_| format!("bad age '{age}'"))?,
                    sex: sex.parse()?,
                    height_cm: height.parse().map_err(|_| format!("bad height '{height}'"))?,
                    weight_kg: weight.parse().map_err(|_| format!("bad weight '{weight}'"))?,
                })
            }
            "status" => Ok(SessionCommand::Status),
            "help" | "?" => Ok(SessionCommand::Help),
            "quit" | "exit" => Ok(SessionCommand::Quit),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

fn parse_id(raw: &str) -> Result<u64, String> {
    raw.parse().map_err(|_| format!("bad id '{raw}'"))
}
