use meal_ledger::api_connection::{ScriptedGateway, ScriptedReply};
use meal_ledger::config::{AppConfig, GatewayConfig};
use meal_ledger::enrichment::EnrichmentStats;
use meal_ledger::meal_ledger::{sample_meals, MealId};
use meal_ledger::operation_state::{Operation, OperationState};
use meal_ledger::recommendation::{ProfileInput, Recommendation, Sex};
use meal_ledger::{DietSession, TrackerError, ValidationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn session_with(gateway: ScriptedGateway) -> (Arc<ScriptedGateway>, DietSession) {
    let gateway = Arc::new(gateway);
    (gateway.clone(), DietSession::new(gateway))
}

fn profile() -> ProfileInput {
    ProfileInput {
        age: Some(30),
        sex: Some(Sex::Male),
        height_cm: Some(175.0),
        weight_kg: Some(70.0),
    }
}

#[tokio::test]
async fn test_total_matches_entries_after_random_operations() {
    let (_, session) = session_with(
        ScriptedGateway::always("150kcal")
            .with_rule("'피자", ScriptedReply::text("약 800"))
            .with_rule("'물", ScriptedReply::text("0"))
            .with_rule("'수수께끼", ScriptedReply::text("모르겠어요"))
            .with_rule("'오류", ScriptedReply::fail("500")),
    );
    let foods = ["피자", "물", "수수께끼", "오류", "샐러드"];
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let before = session.list_meals().await;
        if before.is_empty() || rng.gen_bool(0.6) {
            let food = foods[rng.gen_range(0..foods.len())];
            session.add_meal(food, "1인분").await.unwrap();
            assert_eq!(session.list_meals().await.len(), before.len() + 1);
        } else {
            let id = if rng.gen_bool(0.8) {
                before[rng.gen_range(0..before.len())].id
            } else {
                MealId::from(rng.gen_range(10_000..20_000))
            };
            let removed = session.delete_meal(id).await;
            let after = session.list_meals().await;
            assert!(after.iter().all(|meal| meal.id != id));
            assert_eq!(after.len() + usize::from(removed), before.len());
        }

        let meals = session.list_meals().await;
        let sum: u64 = meals.iter().map(|meal| u64::from(meal.calories)).sum();
        assert_eq!(session.total_calories().await, sum);
    }
}

#[tokio::test]
async fn test_degradation_and_failure_are_counted_apart() {
    let (_, session) = session_with(
        ScriptedGateway::always("200")
            .with_rule("'수수께끼", ScriptedReply::text("죄송합니다"))
            .with_rule("'오류", ScriptedReply::fail("timeout")),
    );
    let degraded = session.add_meal("수수께끼", "1개").await.unwrap();
    let failed = session.add_meal("오류", "1개").await.unwrap();
    let parsed = session.add_meal("밥", "1공기").await.unwrap();

    assert_eq!((degraded.calories, failed.calories, parsed.calories), (0, 0, 200));
    assert_eq!(
        session.enrichment_stats(),
        EnrichmentStats {
            parsed: 1,
            degraded: 1,
            gateway_failures: 1
        }
    );
    assert_eq!(session.total_calories().await, 200);
}

#[tokio::test]
async fn test_recommendation_calls_run_concurrently() {
    let (gateway, session) = session_with(
        ScriptedGateway::new(ScriptedReply::text("2500"))
            .with_rule("water", ScriptedReply::text("2.5"))
            .with_latency(Duration::from_millis(50)),
    );

    let recommendation = session.recommend(&profile()).await.unwrap();
    assert_eq!(
        recommendation,
        Recommendation {
            recommended_calories: Some(2500),
            recommended_water_liters: Some(2.5),
        }
    );
    assert_eq!(gateway.call_count(), 2);
    assert_eq!(gateway.peak_in_flight(), 2);
    assert_eq!(session.recommendation().await, recommendation);
}

#[tokio::test]
async fn test_resubmission_while_in_flight_is_refused() {
    let (gateway, session) = session_with(
        ScriptedGateway::always("2000").with_latency(Duration::from_millis(100)),
    );
    let session = Arc::new(session);

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.recommend(&profile()).await }
    });
    while !session.is_recommendation_in_flight() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let second = session.recommend(&profile()).await;
    assert_eq!(
        second,
        Err(TrackerError::OperationInFlight(Operation::Recommendation))
    );
    assert!(!session.is_meal_enrichment_in_flight());
    assert!(!session.is_recipe_recommendation_in_flight());

    assert!(first.await.unwrap().is_ok());
    assert_eq!(gateway.call_count(), 2);
    assert_eq!(session.loading().recommendation, OperationState::Succeeded);
}

#[tokio::test]
async fn test_invalid_profile_issues_no_calls() {
    let (gateway, session) = session_with(ScriptedGateway::always("2500"));
    let mut input = profile();
    input.age = Some(0);
    assert_eq!(
        session.recommend(&input).await,
        Err(TrackerError::Validation(ValidationError::NotPositive("age")))
    );

    let missing = ProfileInput {
        height_cm: None,
        ..profile()
    };
    assert_eq!(
        session.recommend(&missing).await,
        Err(TrackerError::Validation(ValidationError::Missing("height")))
    );
    assert_eq!(gateway.call_count(), 0);
    assert_eq!(session.recommendation().await, Recommendation::unset());
}

#[tokio::test]
async fn test_stores_are_independent() {
    let (_, session) = session_with(ScriptedGateway::always("## 추천 레시피"));
    let recipe = session
        .add_recipe("오트밀", "귀리, 우유, 바나나", "데운다")
        .await
        .unwrap();
    assert_eq!(session.recommend_similar("아침 메뉴").await.unwrap(), "## 추천 레시피");

    assert!(session.list_meals().await.is_empty());
    assert_eq!(session.list_recipes().await, vec![recipe.clone()]);
    assert!(session.delete_recipe(recipe.id).await);
    assert_eq!(
        session.loading().recipe_recommendation,
        OperationState::Succeeded
    );
    assert_eq!(session.loading().meal_enrichment, OperationState::Idle);
}

#[tokio::test]
async fn test_sample_meals_seed_the_ledger() {
    let gateway = Arc::new(ScriptedGateway::always("0"));
    let session = DietSession::with_meals(gateway, sample_meals());
    assert_eq!(session.list_meals().await.len(), 2);
    assert_eq!(session.total_calories().await, 52 + 165);
}

#[test]
fn test_config_from_env_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "MEAL_LEDGER_GATEWAY=proxy").unwrap();
    writeln!(file, "MEAL_LEDGER_PROXY_URL=http://diet.local:8080/api/chat").unwrap();

    let config = AppConfig::from_env_file(file.path()).unwrap();
    assert_eq!(
        config.gateway,
        GatewayConfig::Proxy {
            url: "http://diet.local:8080/api/chat".to_string()
        }
    );
}

#[test]
fn test_config_from_missing_env_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppConfig::from_env_file(&dir.path().join("absent.env")).is_err());
}
