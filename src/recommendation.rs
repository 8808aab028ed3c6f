use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::enrichment::{
    EnrichmentPipeline, EnrichmentResult, NumericKind, DAILY_CALORIES_PROMPT, DAILY_WATER_PROMPT,
};
use crate::error::{Result, TrackerError, ValidationError};
use crate::operation_state::{Operation, OperationState, OperationTracker};

/// Activity level assumed for every recommendation.
pub const ASSUMED_ACTIVITY_LEVEL: &str = "sedentary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => f.write_str("male"),
            Sex::Female => f.write_str("female"),
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "남" | "남성" => Ok(Sex::Male),
            "female" | "f" | "여" | "여성" => Ok(Sex::Female),
            other => Err(format!("unknown sex '{other}', expected male or female")),
        }
    }
}

/// Profile as submitted by the user; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInput {
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

/// A complete profile with every field positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Profile {
    age: u32,
    sex: Sex,
    height_cm: f64,
    weight_kg: f64,
}

impl Profile {
    pub fn new(age: u32, sex: Sex, height_cm: f64, weight_kg: f64) -> Result<Self, ValidationError> {
        if age == 0 {
            return Err(ValidationError::NotPositive("age"));
        }
        if !(height_cm.is_finite() && height_cm > 0.0) {
            return Err(ValidationError::NotPositive("height"));
        }
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(ValidationError::NotPositive("weight"));
        }
        Ok(Self {
            age,
            sex,
            height_cm,
            weight_kg,
        })
    }
}

impl TryFrom<&ProfileInput> for Profile {
    type Error = ValidationError;

    fn try_from(input: &ProfileInput) -> std::result::Result<Self, Self::Error> {
        let age = input.age.ok_or(ValidationError::Missing("age"))?;
        let sex = input.sex.ok_or(ValidationError::Missing("sex"))?;
        let height_cm = input.height_cm.ok_or(ValidationError::Missing("height"))?;
        let weight_kg = input.weight_kg.ok_or(ValidationError::Missing("weight"))?;
        Profile::new(age, sex, height_cm, weight_kg)
    }
}

/// Daily targets. Both fields are set together or not at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_calories: Option<u32>,
    pub recommended_water_liters: Option<f64>,
}

impl Recommendation {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.recommended_calories.is_some() && self.recommended_water_liters.is_some()
    }
}

pub struct RecommendationEngine {
    pipeline: Arc<EnrichmentPipeline>,
    current: RwLock<Recommendation>,
    tracker: OperationTracker,
}

impl RecommendationEngine {
    pub fn new(pipeline: Arc<EnrichmentPipeline>) -> Self {
        Self {
            pipeline,
            current: RwLock::new(Recommendation::unset()),
            tracker: OperationTracker::new(Operation::Recommendation),
        }
    }

    /// Asks for the calorie budget and the water volume at the same time and
    /// waits for both. If either fails, the stored recommendation is cleared
    /// and that failure is returned.
    pub async fn recommend(&self, input: &ProfileInput) -> Result<Recommendation> {
        let profile = Profile::try_from(input)?;
        let in_flight = self.tracker.begin()?;

        let age = profile.age.to_string();
        let sex = profile.sex.to_string();
        let height = profile.height_cm.to_string();
        let weight = profile.weight_kg.to_string();
        let substitutions = [
            ("age", age.as_str()),
            ("sex", sex.as_str()),
            ("height_cm", height.as_str()),
            ("weight_kg", weight.as_str()),
            ("activity", ASSUMED_ACTIVITY_LEVEL),
        ];

        let (calories, water) = tokio::join!(
            self.pipeline
                .estimate(&DAILY_CALORIES_PROMPT, &substitutions, NumericKind::Integer),
            self.pipeline
                .estimate(&DAILY_WATER_PROMPT, &substitutions, NumericKind::Decimal),
        );

        let outcome = match (calories, water) {
            (EnrichmentResult::Estimated(calories), EnrichmentResult::Estimated(water)) => {
                Ok(Recommendation {
                    recommended_calories: Some(calories.value.min(u32::MAX as f64) as u32),
                    recommended_water_liters: Some(water.value),
                })
            }
            (EnrichmentResult::Failed { reason }, _) => Err(format!("calorie estimate: {reason}")),
            (_, EnrichmentResult::Failed { reason }) => Err(format!("water estimate: {reason}")),
        };

        let mut current = self.current.write().await;
        match outcome {
            Ok(recommendation) => {
                *current = recommendation;
                in_flight.succeed();
                info!(
                    calories = ?recommendation.recommended_calories,
                    water_liters = ?recommendation.recommended_water_liters,
                    "recommendation updated"
                );
                Ok(recommendation)
            }
            Err(reason) => {
                *current = Recommendation::unset();
                in_flight.fail(reason.clone());
                warn!(%reason, "recommendation cleared");
                Err(TrackerError::Gateway {
                    operation: Operation::Recommendation,
                    reason,
                })
            }
        }
    }

    pub async fn current(&self) -> Recommendation {
        *self.current.read().await
    }

    pub fn state(&self) -> OperationState {
        self.tracker.state()
    }

    pub fn is_recommending(&self) -> bool {
        self.tracker.is_in_flight()
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }
}
