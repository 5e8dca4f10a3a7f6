//! Gradient boosting regressor wrapper
//!
//! Thin layer over the smartcore implementation: hyperparameters, fitting,
//! single-row and batch prediction, and the randomized hold-out evaluation
//! used for score reporting.

use crate::error::{ForecastError, Result};
use crate::models::FeatureSchema;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::gradient_boosting_regressor::{
    GradientBoostingRegressor, GradientBoostingRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

/// Share of rows reserved for the evaluation hold-out
pub const EVAL_TEST_RATIO: f64 = 0.33;

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmParams {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: u16,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            max_depth: 5,
            learning_rate: 0.1,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl GbmParams {
    fn to_smartcore(&self) -> GradientBoostingRegressorParameters {
        GradientBoostingRegressorParameters::default()
            .with_n_trees(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_learning_rate(self.learning_rate)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
    }
}

/// Untrained gradient boosting regressor
#[derive(Debug, Clone, Default)]
pub struct GbmRegressor {
    params: GbmParams,
}

/// Fitted regressor together with the feature layout it was trained on
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedRegressor {
    schema: FeatureSchema,
    model: GradientBoostingRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl GbmRegressor {
    /// Create a regressor with default hyperparameters
    pub fn new() -> Self {
        Self::with_params(GbmParams::default())
    }

    /// Create a regressor with custom hyperparameters
    pub fn with_params(params: GbmParams) -> Self {
        Self { params }
    }

    /// Get the hyperparameters
    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Fit on the full feature matrix and targets
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64], schema: FeatureSchema) -> Result<TrainedRegressor> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForecastError::Training(format!(
                "Feature matrix and targets disagree: {} rows vs {} targets",
                x.len(),
                y.len()
            )));
        }
        if x[0].len() != schema.feature_count {
            return Err(ForecastError::Training(format!(
                "Feature matrix has {} columns, schema expects {}",
                x[0].len(),
                schema.feature_count
            )));
        }

        info!(
            "Training regressor on {} rows with {} features",
            x.len(),
            schema.feature_count
        );

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec())
            .map_err(|e| ForecastError::Training(format!("Building feature matrix: {:?}", e)))?;

        let model = GradientBoostingRegressor::fit(&matrix, &y.to_vec(), self.params.to_smartcore())
            .map_err(|e| ForecastError::Training(format!("{:?}", e)))?;

        Ok(TrainedRegressor { schema, model })
    }
}

impl TrainedRegressor {
    /// Feature layout this model was fitted against
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Predict one value per input row
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let matrix = DenseMatrix::from_2d_vec(&rows.to_vec())
            .map_err(|e| ForecastError::Prediction(format!("Building feature matrix: {:?}", e)))?;

        self.model
            .predict(&matrix)
            .map_err(|e| ForecastError::Prediction(format!("{:?}", e)))
    }

    /// Predict a single feature row
    pub fn predict_one(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.schema.feature_count {
            return Err(ForecastError::SchemaMismatch {
                expected: self.schema.feature_count,
                found: row.len(),
            });
        }

        let values = self.predict(&[row.to_vec()])?;
        values
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Prediction("Empty prediction batch".to_string()))
    }
}

/// Variance-weighted R² between actual and predicted values
///
/// With a single target series the variance weighting collapses to the plain
/// coefficient of determination.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(ForecastError::Data(format!(
            "Score inputs disagree: {} actual vs {} predicted",
            actual.len(),
            predicted.len()
        )));
    }

    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Ok(0.0);
    }

    Ok(1.0 - ss_res / ss_tot)
}

/// Hold-out evaluation score for one hyperparameter configuration
///
/// Reserves a randomized share of the rows, fits a throwaway model on the
/// remainder and scores it on the reserve. The returned score is indicative
/// only: the production model is a separate fit on all rows, so the score
/// never gates deployment.
pub fn evaluate_holdout(
    x: &[Vec<f64>],
    y: &[f64],
    params: &GbmParams,
    schema: &FeatureSchema,
) -> Result<f64> {
    let n = x.len();
    let test_size = ((n as f64) * EVAL_TEST_RATIO).round() as usize;
    if test_size == 0 || test_size >= n {
        return Err(ForecastError::Data(format!(
            "Too few rows for a hold-out split: {}",
            n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rand::thread_rng());

    let (test_idx, train_idx) = indices.split_at(test_size);

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
    let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| x[i].clone()).collect();
    let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

    let eval_model = GbmRegressor::with_params(params.clone()).fit(&x_train, &y_train, schema.clone())?;
    let predicted = eval_model.predict(&x_test)?;

    let score = r2_score(&y_test, &predicted)?;
    info!("Model score: {}", score);

    Ok(score)
}
