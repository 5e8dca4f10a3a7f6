//! # Crop Forecast
//!
//! A Rust library for forecasting Brazilian agricultural commodity prices
//! from the CEPEA indicator series.
//!
//! ## Features
//!
//! - Indicator catalog discovery (portal scrape with a JSON disk cache)
//! - Raw series download with an indefinite on-disk workbook cache
//! - Lagged-feature engineering with a four-bucket seasonal code
//! - Gradient-boosted regression, trained once per indicator variant and
//!   persisted with its feature schema
//! - Iterative multi-step forecasts that feed each prediction back as the
//!   newest lag of the next step
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crop_forecast::data::SeriesFetcher;
//! use crop_forecast::pipeline::ForecastPipeline;
//! use crop_forecast::store::ModelStore;
//!
//! # fn main() -> crop_forecast::Result<()> {
//! let fetcher = SeriesFetcher::new("datasets")?;
//! let store = ModelStore::new("models");
//! let pipeline = ForecastPipeline::new(fetcher, store);
//!
//! // Train (first run) or load, then predict 15 days ahead
//! let outcome = pipeline.run("boi", "2", 15)?;
//! println!("{:?}", outcome.predictions);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod data;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use crate::catalog::{Catalog, CatalogResolver, IndicatorEntry};
pub use crate::data::{PriceSeries, SeriesFetcher, SeriesSource};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{build_lag_table, season_code, FeatureFrame};
pub use crate::models::{FeatureSchema, GbmParams, GbmRegressor, TrainedRegressor};
pub use crate::pipeline::{ForecastOutcome, ForecastPipeline};
pub use crate::store::{LoadOutcome, ModelStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
