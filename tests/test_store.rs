use crop_forecast::error::ForecastError;
use crop_forecast::models::{FeatureSchema, GbmParams, GbmRegressor};
use crop_forecast::store::{LoadOutcome, ModelStore};
use tempfile::TempDir;

fn small_params() -> GbmParams {
    GbmParams {
        n_estimators: 30,
        max_depth: 3,
        ..GbmParams::default()
    }
}

fn trained_model(lag_window: usize) -> crop_forecast::models::TrainedRegressor {
    let features = lag_window + 1;
    let rows = 40;

    let x: Vec<Vec<f64>> = (0..rows)
        .map(|i| (0..features).map(|f| (i + f) as f64).collect())
        .collect();
    let y: Vec<f64> = (0..rows).map(|i| 100.0 + i as f64).collect();

    GbmRegressor::with_params(small_params())
        .fit(&x, &y, FeatureSchema::from_lag_window(lag_window))
        .unwrap()
}

#[test]
fn missing_artifact_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path());

    let outcome = store
        .load("soja", "12", &FeatureSchema::from_lag_window(6))
        .unwrap();
    assert!(matches!(outcome, LoadOutcome::NotFound));
    assert!(!store.contains("soja", "12"));
}

#[test]
fn round_trip_with_matching_schema_loads() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path());

    let model = trained_model(6);
    store.save("soja", "12", &model).unwrap();
    assert!(store.contains("soja", "12"));

    let outcome = store
        .load("soja", "12", &FeatureSchema::from_lag_window(6))
        .unwrap();

    let loaded = match outcome {
        LoadOutcome::Loaded(m) => m,
        other => panic!("expected Loaded, got {:?}", other),
    };

    // Same artifact scores the same inputs identically
    let row: Vec<f64> = (0..7).map(|f| (39 + f) as f64).collect();
    assert_eq!(
        loaded.predict_one(&row).unwrap(),
        model.predict_one(&row).unwrap()
    );
}

#[test]
fn lag_window_change_is_a_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path());

    store.save("soja", "12", &trained_model(14)).unwrap();

    let outcome = store
        .load("soja", "12", &FeatureSchema::from_lag_window(6))
        .unwrap();

    match outcome {
        LoadOutcome::SchemaMismatch { stored, requested } => {
            assert_eq!(stored.lag_window, 14);
            assert_eq!(requested.lag_window, 6);
        }
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}

#[test]
fn artifacts_are_keyed_by_alias_and_id() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path());

    store.save("soja", "12", &trained_model(4)).unwrap();

    assert!(store.contains("soja", "12"));
    assert!(!store.contains("soja", "13"));
    assert!(!store.contains("milho", "12"));
}

#[test]
fn corrupt_artifact_is_a_persistence_error() {
    let dir = TempDir::new().unwrap();
    let store = ModelStore::new(dir.path());

    std::fs::write(dir.path().join("soja_12_model.bin"), b"not a model").unwrap();

    let err = store
        .load("soja", "12", &FeatureSchema::from_lag_window(6))
        .unwrap_err();
    assert!(matches!(err, ForecastError::Persistence(_)));
}
