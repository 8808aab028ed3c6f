use std::sync::Arc;

use crate::api_connection::InferenceGateway;
use crate::enrichment::{EnrichmentPipeline, EnrichmentStats};
use crate::error::Result;
use crate::meal_ledger::{MealEntry, MealId, MealLedger, MealSeed};
use crate::operation_state::OperationState;
use crate::recipe_book::{Recipe, RecipeBook, RecipeId};
use crate::recommendation::{ProfileInput, Recommendation, RecommendationEngine};

/// Snapshot of the three independent async operations, for a front end that
/// greys out whatever is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStates {
    pub meal_enrichment: OperationState,
    pub recommendation: OperationState,
    pub recipe_recommendation: OperationState,
}

/// One user's stores over one shared enrichment pipeline.
pub struct DietSession {
    pipeline: Arc<EnrichmentPipeline>,
    ledger: MealLedger,
    recipes: RecipeBook,
    recommendations: RecommendationEngine,
}

impl DietSession {
    pub fn new(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self::with_meals(gateway, Vec::new())
    }

    pub fn with_meals(gateway: Arc<dyn InferenceGateway>, seeds: Vec<MealSeed>) -> Self {
        let pipeline = Arc::new(EnrichmentPipeline::new(gateway));
        Self {
            ledger: MealLedger::with_entries(pipeline.clone(), seeds),
            recipes: RecipeBook::new(pipeline.clone()),
            recommendations: RecommendationEngine::new(pipeline.clone()),
            pipeline,
        }
    }

    pub async fn add_meal(&self, food_name: &str, quantity: &str) -> Result<MealEntry> {
        self.ledger.add_meal(food_name, quantity).await
    }

    pub async fn delete_meal(&self, id: MealId) -> bool {
        self.ledger.delete_meal(id).await
    }

    pub async fn list_meals(&self) -> Vec<MealEntry> {
        self.ledger.list_meals().await
    }

    pub async fn total_calories(&self) -> u64 {
        self.ledger.total_calories().await
    }

    pub async fn add_recipe(
        &self,
        name: &str,
        ingredients: &str,
        instructions: &str,
    ) -> Result<Recipe> {
        self.recipes.add_recipe(name, ingredients, instructions).await
    }

    pub async fn delete_recipe(&self, id: RecipeId) -> bool {
        self.recipes.delete_recipe(id).await
    }

    pub async fn list_recipes(&self) -> Vec<Recipe> {
        self.recipes.list_recipes().await
    }

    pub async fn recommend_similar(&self, query: &str) -> Result<String> {
        self.recipes.recommend_similar(query).await
    }

    pub async fn recommend(&self, profile: &ProfileInput) -> Result<Recommendation> {
        self.recommendations.recommend(profile).await
    }

    pub async fn recommendation(&self) -> Recommendation {
        self.recommendations.current().await
    }

    pub fn loading(&self) -> LoadingStates {
        LoadingStates {
            meal_enrichment: self.ledger.enrichment_state(),
            recommendation: self.recommendations.state(),
            recipe_recommendation: self.recipes.suggestion_state(),
        }
    }

    pub fn is_meal_enrichment_in_flight(&self) -> bool {
        self.ledger.is_enriching()
    }

    pub fn is_recommendation_in_flight(&self) -> bool {
        self.recommendations.is_recommending()
    }

    pub fn is_recipe_recommendation_in_flight(&self) -> bool {
        self.recipes.is_suggesting()
    }

    pub fn enrichment_stats(&self) -> EnrichmentStats {
        self.pipeline.stats()
    }

    pub fn ledger(&self) -> &MealLedger {
        &self.ledger
    }

    pub fn recipe_book(&self) -> &RecipeBook {
        &self.recipes
    }

    pub fn recommendation_engine(&self) -> &RecommendationEngine {
        &self.recommendations
    }
}
