//! Forecast pipeline: fetch, feature build, train-or-load, iterative predict
//!
//! One invocation runs start to finish on the calling thread:
//! fetch -> feature build -> train or load -> predict steps 1..=horizon.
//! Any failure is fatal to the invocation and surfaces to the caller; there
//! are no retries and no partial forecasts.

use crate::data::SeriesSource;
use crate::error::{ForecastError, Result};
use crate::features::{build_lag_table, FeatureFrame};
use crate::models::{evaluate_holdout, FeatureSchema, GbmParams, GbmRegressor, TrainedRegressor};
use crate::store::{LoadOutcome, ModelStore};
use chrono::NaiveDate;
use tracing::info;

/// Smallest horizon the lag feedback mechanism supports
pub const MIN_HORIZON: usize = 2;

/// Result of one pipeline invocation
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// Most recent observed (date, value) pairs, two per forecast step,
    /// oldest first; what a front-end charts next to the forecast
    pub history: Vec<(NaiveDate, f64)>,
    /// One predicted value per future step, rounded to two decimal places
    pub predictions: Vec<f64>,
    /// Hold-out evaluation score when the model was trained this run,
    /// `None` when it was loaded from the store
    pub eval_score: Option<f64>,
}

/// Forecast pipeline over injected collaborators
///
/// Holds a series source, a model store and the regressor hyperparameters;
/// the horizon and the lag window derived from it are per-call values, never
/// pipeline state.
#[derive(Debug)]
pub struct ForecastPipeline<S: SeriesSource> {
    source: S,
    store: ModelStore,
    params: GbmParams,
}

impl<S: SeriesSource> ForecastPipeline<S> {
    /// Create a pipeline with default hyperparameters
    pub fn new(source: S, store: ModelStore) -> Self {
        Self::with_params(source, store, GbmParams::default())
    }

    /// Create a pipeline with custom hyperparameters
    pub fn with_params(source: S, store: ModelStore, params: GbmParams) -> Self {
        Self {
            source,
            store,
            params,
        }
    }

    /// Run the full pipeline for one (alias, id) pair
    ///
    /// Trains and persists a model on the first run for a pair; every later
    /// run reuses the stored model verbatim, even if the series has grown
    /// since. A stored model fitted against a different lag window fails
    /// fast with `SchemaMismatch`.
    pub fn run(&self, alias: &str, id: &str, horizon: usize) -> Result<ForecastOutcome> {
        if horizon < MIN_HORIZON {
            return Err(ForecastError::InvalidHorizon { got: horizon });
        }

        let lag_window = horizon - 1;
        let schema = FeatureSchema::from_lag_window(lag_window);

        info!("Starting pipeline | {}/{} horizon {}", alias, id, horizon);

        let series = self.source.series(alias, id)?;
        let table = build_lag_table(&series, lag_window)?;

        let (model, eval_score) = self.train_or_load(alias, id, &table, schema)?;
        let predictions = iterate_forecast(&model, table.last_feature_row()?, horizon)?;

        info!(
            "End pipeline | {}/{} -> {} predictions",
            alias,
            id,
            predictions.len()
        );

        Ok(ForecastOutcome {
            history: series.tail(2 * horizon)?,
            predictions,
            eval_score,
        })
    }

    fn train_or_load(
        &self,
        alias: &str,
        id: &str,
        table: &FeatureFrame,
        schema: FeatureSchema,
    ) -> Result<(TrainedRegressor, Option<f64>)> {
        match self.store.load(alias, id, &schema)? {
            LoadOutcome::Loaded(model) => {
                info!("Model loading");
                Ok((model, None))
            }
            LoadOutcome::SchemaMismatch { stored, requested } => {
                Err(ForecastError::SchemaMismatch {
                    expected: stored.feature_count,
                    found: requested.feature_count,
                })
            }
            LoadOutcome::NotFound => {
                info!("Model training");

                let x = table.x_matrix()?;
                let y = table.targets()?;

                // Score comes from a throwaway fit on a 33% hold-out; the
                // production model below is refit on every row.
                let score = evaluate_holdout(&x, &y, &self.params, &schema)?;

                let model = GbmRegressor::with_params(self.params.clone()).fit(&x, &y, schema)?;
                self.store.save(alias, id, &model)?;

                Ok((model, Some(score)))
            }
        }
    }
}

/// Round a predicted price to two decimal places
fn round_prediction(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Produce `horizon` one-step-ahead predictions with lag feedback
///
/// Starts from the input row of the most recent observed date. After each
/// step the predicted value becomes the newest lag and the oldest lag falls
/// off the end, so every lag shifts one position older. The seasonal code in
/// slot 0 is held fixed for all steps even as the implied date advances.
fn iterate_forecast(
    model: &TrainedRegressor,
    mut row: Vec<f64>,
    horizon: usize,
) -> Result<Vec<f64>> {
    info!("Model prediction");

    let mut predictions: Vec<f64> = Vec::with_capacity(horizon);

    for step in 1..=horizon {
        if let Some(previous) = predictions.last().copied() {
            row.insert(1, previous);
            row.pop();
        }

        let predicted = round_prediction(model.predict_one(&row)?);
        info!("Predicted value - {}/{} -> {}", step, horizon, predicted);
        predictions.push(predicted);
    }

    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round_prediction(132.5549), 132.55);
        assert_eq!(round_prediction(132.555), 132.56);
        assert_eq!(round_prediction(-0.004), -0.0);
    }
}
