use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::enrichment::{EnrichmentPipeline, SIMILAR_RECIPES_PROMPT};
use crate::error::{require_text, Result, TrackerError};
use crate::operation_state::{Operation, OperationState, OperationTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipeId(u64);

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecipeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    /// Comma-separated, as typed.
    pub ingredients: String,
    pub instructions: String,
}

impl Recipe {
    pub fn ingredient_list(&self) -> Vec<&str> {
        self.ingredients
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Recipes {
    items: Vec<Recipe>,
    next_id: u64,
}

pub struct RecipeBook {
    pipeline: Arc<EnrichmentPipeline>,
    recipes: RwLock<Recipes>,
    suggestion: OperationTracker,
}

impl RecipeBook {
    pub fn new(pipeline: Arc<EnrichmentPipeline>) -> Self {
        Self {
            pipeline,
            recipes: RwLock::new(Recipes::default()),
            suggestion: OperationTracker::new(Operation::RecipeRecommendation),
        }
    }

    pub async fn add_recipe(
        &self,
        name: &str,
        ingredients: &str,
        instructions: &str,
    ) -> Result<Recipe> {
        require_text("recipe name", name)?;
        require_text("ingredients", ingredients)?;
        require_text("instructions", instructions)?;

        let mut recipes = self.recipes.write().await;
        recipes.next_id += 1;
        let recipe = Recipe {
            id: RecipeId(recipes.next_id),
            name: name.trim().to_string(),
            ingredients: ingredients.trim().to_string(),
            instructions: instructions.trim().to_string(),
        };
        recipes.items.push(recipe.clone());
        info!(id = %recipe.id, name = %recipe.name, "recipe added");
        Ok(recipe)
    }

    pub async fn delete_recipe(&self, id: RecipeId) -> bool {
        let mut recipes = self.recipes.write().await;
        let before = recipes.items.len();
        recipes.items.retain(|recipe| recipe.id != id);
        recipes.items.len() != before
    }

    pub async fn list_recipes(&self) -> Vec<Recipe> {
        self.recipes.read().await.items.clone()
    }

    /// Asks the model for three recipes related to `query` and returns its
    /// markdown answer untouched. A gateway failure is returned as an error.
    pub async fn recommend_similar(&self, query: &str) -> Result<String> {
        require_text("query", query)?;
        let in_flight = self.suggestion.begin()?;

        let prompt = SIMILAR_RECIPES_PROMPT.render(&[("query", query.trim())]);
        match self.pipeline.complete_text(&prompt).await {
            Ok(text) => {
                in_flight.succeed();
                Ok(text)
            }
            Err(e) => {
                let reason = e.to_string();
                in_flight.fail(reason.clone());
                Err(TrackerError::Gateway {
                    operation: Operation::RecipeRecommendation,
                    reason,
                })
            }
        }
    }

    pub fn suggestion_state(&self) -> OperationState {
        self.suggestion.state()
    }

    pub fn is_suggesting(&self) -> bool {
        self.suggestion.is_in_flight()
    }

    pub fn suggestion_tracker(&self) -> &OperationTracker {
        &self.suggestion
    }
}
