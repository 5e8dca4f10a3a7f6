//! Regression models for price forecasting

use serde::{Deserialize, Serialize};

pub mod gbm;

pub use gbm::{evaluate_holdout, r2_score, GbmParams, GbmRegressor, TrainedRegressor};

/// Version of the seasonal bucket encoding baked into feature tables
pub const SEASONAL_ENCODING_VERSION: u32 = 1;

/// Feature layout a trained model was fitted against
///
/// Persisted next to the serialized regressor and checked on load, so a model
/// trained with one lag window can never silently score rows built with
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Number of regressor input columns (seasonal code plus lags)
    pub feature_count: usize,
    /// Number of lagged price columns
    pub lag_window: usize,
    /// Seasonal encoding version the features were built with
    pub seasonal_encoding_version: u32,
}

impl FeatureSchema {
    /// Schema implied by a lag window under the current seasonal encoding
    pub fn from_lag_window(lag_window: usize) -> Self {
        Self {
            feature_count: lag_window + 1,
            lag_window,
            seasonal_encoding_version: SEASONAL_ENCODING_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_counts_seasonal_column() {
        let schema = FeatureSchema::from_lag_window(6);
        assert_eq!(schema.feature_count, 7);
        assert_eq!(schema.lag_window, 6);
        assert_eq!(schema.seasonal_encoding_version, SEASONAL_ENCODING_VERSION);
    }
}
