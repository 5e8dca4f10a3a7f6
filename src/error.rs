//! Error types for the crop_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the crop_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Network or parse failure while retrieving the catalog or a raw series
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Series too short to build the requested lag window
    #[error("Insufficient history: need at least {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// Horizon below the minimum the lag mechanism supports
    #[error("Invalid horizon: {got} (minimum is 2)")]
    InvalidHorizon { got: usize },

    /// Persisted model was trained against a different feature layout
    #[error("Schema mismatch: model expects {expected} features, current configuration has {found}")]
    SchemaMismatch { expected: usize, found: usize },

    /// Disk read/write failure for the dataset cache or the model store
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Error related to data validation or frame shape
    #[error("Data error: {0}")]
    Data(String),

    /// Error while fitting the regressor
    #[error("Training error: {0}")]
    Training(String),

    /// Error while predicting with the regressor
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        ForecastError::Fetch(err.to_string())
    }
}
