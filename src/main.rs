use anyhow::{Context, Result};
use meal_ledger::api_connection::{InferenceGateway, ScriptedGateway, ScriptedReply};
use meal_ledger::cli::{parse_args, Cli, Command, SessionCommand, SESSION_HELP};
use meal_ledger::config::AppConfig;
use meal_ledger::logging::LoggingConfig;
use meal_ledger::meal_ledger::{sample_meals, MealId};
use meal_ledger::recipe_book::RecipeId;
use meal_ledger::recommendation::{ProfileInput, Recommendation};
use meal_ledger::session::DietSession;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

fn build_gateway(cli: &Cli) -> Result<Arc<dyn InferenceGateway>> {
    if cli.offline {
        info!("offline mode, no inference gateway");
        return Ok(Arc::new(ScriptedGateway::new(ScriptedReply::fail(
            "offline: no inference gateway configured",
        ))));
    }

    let config = match &cli.env_file {
        Some(path) => AppConfig::from_env_file(path)
            .with_context(|| format!("Failed to load configuration from '{}'", path.display()))?,
        None => AppConfig::from_env().context("Failed to load configuration from environment")?,
    };
    info!(gateway = ?config.gateway, "gateway configured");
    Ok(config.gateway.build())
}

fn print_recommendation(recommendation: &Recommendation) {
    match (
        recommendation.recommended_calories,
        recommendation.recommended_water_liters,
    ) {
        (Some(calories), Some(water)) => {
            println!("Recommended calories: {} kcal", calories);
            println!("Recommended water: {} L", water);
        }
        _ => println!("No recommendation yet."),
    }
}

async fn print_meals(session: &DietSession) {
    let meals = session.list_meals().await;
    if meals.is_empty() {
        println!("(no meals)");
    }
    for meal in meals {
        println!(
            "[{}] {} ({}) - {} kcal  {}",
            meal.id,
            meal.food_name,
            meal.quantity,
            meal.calories,
            meal.created_at.format("%H:%M")
        );
    }
    println!("Total: {} kcal", session.total_calories().await);
}

/// Returns `false` when the session should end.
async fn run_session_command(session: &DietSession, command: SessionCommand) -> bool {
    match command {
        SessionCommand::AddMeal { food, quantity } => match session.add_meal(&food, &quantity).await {
            Ok(meal) => println!("Added [{}] {} ({}) - {} kcal", meal.id, meal.food_name, meal.quantity, meal.calories),
            Err(e) => println!("Error: {}", e),
        },
        SessionCommand::DeleteMeal(id) => {
            if session.delete_meal(MealId::from(id)).await {
                println!("Deleted meal {}", id);
            } else {
                println!("No meal with id {}", id);
            }
        }
        SessionCommand::ListMeals => print_meals(session).await,
        SessionCommand::Total => println!("Total: {} kcal", session.total_calories().await),
        SessionCommand::AddRecipe {
            name,
            ingredients,
            instructions,
        } => match session.add_recipe(&name, &ingredients, &instructions).await {
            Ok(recipe) => println!("Added recipe [{}] {}", recipe.id, recipe.name),
            Err(e) => println!("Error: {}", e),
        },
        SessionCommand::DeleteRecipe(id) => {
            if session.delete_recipe(RecipeId::from(id)).await {
                println!("Deleted recipe {}", id);
            } else {
                println!("No recipe with id {}", id);
            }
        }
        SessionCommand::ListRecipes => {
            let recipes = session.list_recipes().await;
            if recipes.is_empty() {
                println!("(no recipes)");
            }
            for recipe in recipes {
                println!("[{}] {}", recipe.id, recipe.name);
                println!("    ingredients: {}", recipe.ingredient_list().join(", "));
                println!("    instructions: {}", recipe.instructions);
            }
        }
        SessionCommand::Suggest(query) => match session.recommend_similar(&query).await {
            Ok(text) => println!("{}", text),
            Err(e) => println!("Error: {}", e),
        },
        SessionCommand::Recommend {
            age,
            sex,
            height_cm,
            weight_kg,
        } => {
            let profile = ProfileInput {
                age: Some(age),
                sex: Some(sex),
                height_cm: Some(height_cm),
                weight_kg: Some(weight_kg),
            };
            match session.recommend(&profile).await {
                Ok(recommendation) => print_recommendation(&recommendation),
                Err(e) => println!("Error: {}", e),
            }
        }
        SessionCommand::Status => {
            print_recommendation(&session.recommendation().await);
            println!("{:#?}", session.loading());
            println!("{:#?}", session.enrichment_stats());
        }
        SessionCommand::Help => println!("{}", SESSION_HELP),
        SessionCommand::Quit => return false,
    }
    true
}

async fn run_session(session: &DietSession) -> Result<()> {
    println!("{}", SESSION_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match SessionCommand::parse(&line) {
            Ok(command) => {
                if !run_session_command(session, command).await {
                    break;
                }
            }
            Err(message) => println!("{}", message),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    LoggingConfig::from_env().init()?;

    let cli = parse_args();
    let gateway = build_gateway(&cli)?;
    let seeds = if cli.sample_meals { sample_meals() } else { Vec::new() };
    let session = DietSession::with_meals(gateway, seeds);

    match cli.command {
        Command::Calories { food, quantity } => {
            let meal = session
                .add_meal(&food, &quantity)
                .await
                .context("Failed to log meal")?;
            println!("{} ({}): {} kcal", meal.food_name, meal.quantity, meal.calories);
            if session.enrichment_stats().parsed == 0 {
                println!("(estimate unavailable, recorded as 0 kcal)");
            }
        }
        Command::Recommend {
            age,
            sex,
            height,
            weight,
        } => {
            let profile = ProfileInput {
                age: Some(age),
                sex: Some(sex),
                height_cm: Some(height),
                weight_kg: Some(weight),
            };
            let recommendation = session
                .recommend(&profile)
                .await
                .context("Failed to get recommendation")?;
            print_recommendation(&recommendation);
        }
        Command::Suggest { query } => {
            let text = session
                .recommend_similar(&query)
                .await
                .context("Failed to get recipe suggestions")?;
            println!("{}", text);
        }
        Command::Session => run_session(&session).await?,
    }

    Ok(())
}
