use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::enrichment::{EnrichmentPipeline, EnrichmentResult, NumericKind, MEAL_CALORIES_PROMPT};
use crate::error::{require_text, Result};
use crate::operation_state::{Operation, OperationState, OperationTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MealId(u64);

impl fmt::Display for MealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MealId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: MealId,
    pub food_name: String,
    /// Free-form amount, e.g. "1개" or "100g".
    pub quantity: String,
    pub calories: u32,
    pub created_at: DateTime<Utc>,
}

/// A meal to seed the ledger with, calories already known.
#[derive(Debug, Clone)]
pub struct MealSeed {
    pub food_name: String,
    pub quantity: String,
    pub calories: u32,
}

impl MealSeed {
    pub fn new(food_name: impl Into<String>, quantity: impl Into<String>, calories: u32) -> Self {
        Self {
            food_name: food_name.into(),
            quantity: quantity.into(),
            calories,
        }
    }
}

/// The two meals a fresh dashboard starts with.
pub fn sample_meals() -> Vec<MealSeed> {
    vec![
        MealSeed::new("사과", "1개", 52),
        MealSeed::new("닭가슴살", "100g", 165),
    ]
}

#[derive(Debug, Default)]
struct Entries {
    meals: Vec<MealEntry>,
    next_id: u64,
}

impl Entries {
    fn push(&mut self, food_name: String, quantity: String, calories: u32) -> MealEntry {
        self.next_id += 1;
        let entry = MealEntry {
            id: MealId(self.next_id),
            food_name,
            quantity,
            calories,
            created_at: Utc::now(),
        };
        self.meals.push(entry.clone());
        entry
    }
}

/// Ordered log of meals with resolved calories.
///
/// Calories are estimated before an entry is inserted, so readers never see
/// a half-built meal. The entry lock is not held across the gateway call.
pub struct MealLedger {
    pipeline: Arc<EnrichmentPipeline>,
    entries: RwLock<Entries>,
    enrichment: OperationTracker,
}

impl MealLedger {
    pub fn new(pipeline: Arc<EnrichmentPipeline>) -> Self {
        Self {
            pipeline,
            entries: RwLock::new(Entries::default()),
            enrichment: OperationTracker::new(Operation::MealEnrichment),
        }
    }

    pub fn with_entries(pipeline: Arc<EnrichmentPipeline>, seeds: Vec<MealSeed>) -> Self {
        let mut entries = Entries::default();
        for seed in seeds {
            entries.push(seed.food_name, seed.quantity, seed.calories);
        }
        Self {
            pipeline,
            entries: RwLock::new(entries),
            enrichment: OperationTracker::new(Operation::MealEnrichment),
        }
    }

    /// Estimates calories for the meal, then appends it.
    ///
    /// A failed or unparsable estimate still records the meal, with 0 kcal.
    pub async fn add_meal(&self, food_name: &str, quantity: &str) -> Result<MealEntry> {
        require_text("food name", food_name)?;
        require_text("quantity", quantity)?;
        let in_flight = self.enrichment.begin()?;

        let food_name = food_name.trim();
        let quantity = quantity.trim();
        let result = self
            .pipeline
            .estimate(
                &MEAL_CALORIES_PROMPT,
                &[("food", food_name), ("quantity", quantity)],
                NumericKind::Integer,
            )
            .await;

        let calories = match &result {
            EnrichmentResult::Estimated(estimate) => estimate.value.min(u32::MAX as f64) as u32,
            EnrichmentResult::Failed { reason } => {
                warn!(food = %food_name, %reason, "calorie estimate failed, recording 0 kcal");
                0
            }
        };

        let entry = self
            .entries
            .write()
            .await
            .push(food_name.to_string(), quantity.to_string(), calories);
        info!(id = %entry.id, food = %entry.food_name, calories, "meal added");

        match result {
            EnrichmentResult::Estimated(_) => in_flight.succeed(),
            EnrichmentResult::Failed { reason } => in_flight.fail(reason),
        }
        Ok(entry)
    }

    /// Returns whether an entry was removed.
    pub async fn delete_meal(&self, id: MealId) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.meals.len();
        entries.meals.retain(|meal| meal.id != id);
        let removed = entries.meals.len() != before;
        if removed {
            info!(%id, "meal deleted");
        }
        removed
    }

    pub async fn list_meals(&self) -> Vec<MealEntry> {
        self.entries.read().await.meals.clone()
    }

    /// Summed from the current entries on every call.
    pub async fn total_calories(&self) -> u64 {
        self.entries
            .read()
            .await
            .meals
            .iter()
            .map(|meal| u64::from(meal.calories))
            .sum()
    }

    pub fn enrichment_state(&self) -> OperationState {
        self.enrichment.state()
    }

    pub fn is_enriching(&self) -> bool {
        self.enrichment.is_in_flight()
    }

    pub fn enrichment_tracker(&self) -> &OperationTracker {
        &self.enrichment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::{ScriptedGateway, ScriptedReply};
    use crate::error::{TrackerError, ValidationError};

    fn ledger(gateway: ScriptedGateway) -> (Arc<ScriptedGateway>, MealLedger) {
        let gateway = Arc::new(gateway);
        let pipeline = Arc::new(EnrichmentPipeline::new(gateway.clone()));
        (gateway, MealLedger::new(pipeline))
    }

    #[tokio::test]
    async fn test_add_meal_records_estimate() {
        let (gateway, ledger) = ledger(ScriptedGateway::always("173kcal"));
        let entry = ledger.add_meal("바나나", "1개").await.unwrap();

        assert_eq!(entry.calories, 173);
        assert_eq!(entry.food_name, "바나나");
        assert_eq!(ledger.list_meals().await, vec![entry]);
        assert_eq!(ledger.total_calories().await, 173);
        assert_eq!(gateway.call_count(), 1);
        assert_eq!(ledger.enrichment_state(), OperationState::Succeeded);
    }

    #[tokio::test]
    async fn test_empty_fields_make_no_gateway_call() {
        let (gateway, ledger) = ledger(ScriptedGateway::always("100"));

        let err = ledger.add_meal("", "1개").await.unwrap_err();
        assert_eq!(err, TrackerError::Validation(ValidationError::Empty("food name")));
        let err = ledger.add_meal("사과", "  ").await.unwrap_err();
        assert_eq!(err, TrackerError::Validation(ValidationError::Empty("quantity")));

        assert_eq!(gateway.call_count(), 0);
        assert!(ledger.list_meals().await.is_empty());
        assert_eq!(ledger.enrichment_state(), OperationState::Idle);
    }

    #[tokio::test]
    async fn test_gateway_failure_records_zero() {
        let (_, ledger) = ledger(ScriptedGateway::new(ScriptedReply::fail("network down")));
        let entry = ledger.add_meal("김치찌개", "1인분").await.unwrap();

        assert_eq!(entry.calories, 0);
        assert_eq!(ledger.list_meals().await.len(), 1);
        assert_eq!(
            ledger.enrichment_state(),
            OperationState::Failed("network down".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop() {
        let (_, ledger) = ledger(ScriptedGateway::always("10"));
        let entry = ledger.add_meal("두부", "50g").await.unwrap();

        assert!(!ledger.delete_meal(MealId::from(9999)).await);
        assert_eq!(ledger.list_meals().await.len(), 1);

        assert!(ledger.delete_meal(entry.id).await);
        assert!(!ledger.delete_meal(entry.id).await);
        assert!(ledger.list_meals().await.is_empty());
        assert_eq!(ledger.total_calories().await, 0);
    }

    #[tokio::test]
    async fn test_seeded_ledger_keeps_order_and_fresh_ids() {
        let gateway = Arc::new(ScriptedGateway::always("300"));
        let pipeline = Arc::new(EnrichmentPipeline::new(gateway));
        let ledger = MealLedger::with_entries(pipeline, sample_meals());
        assert_eq!(ledger.total_calories().await, 217);

        let added = ledger.add_meal("라면", "1봉지").await.unwrap();
        let meals = ledger.list_meals().await;
        let names: Vec<_> = meals.iter().map(|m| m.food_name.as_str()).collect();
        assert_eq!(names, ["사과", "닭가슴살", "라면"]);
        assert!(meals[..2].iter().all(|m| m.id != added.id));
    }
}
