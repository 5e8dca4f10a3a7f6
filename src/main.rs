//! Command-line entry point for the crop price forecaster
//!
//! Resolves the indicator catalog, runs the forecast pipeline for one
//! (culture, id) pair and prints the predicted prices. Exits non-zero on any
//! fetch, training or prediction failure.

use anyhow::{bail, Context, Result};
use clap::Parser;
use crop_forecast::catalog::CatalogResolver;
use crop_forecast::data::SeriesFetcher;
use crop_forecast::pipeline::ForecastPipeline;
use crop_forecast::store::ModelStore;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Horizons the front-end offers
const ALLOWED_HORIZONS: [usize; 3] = [7, 15, 30];

fn parse_horizon(s: &str) -> std::result::Result<usize, String> {
    let horizon: usize = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if ALLOWED_HORIZONS.contains(&horizon) {
        Ok(horizon)
    } else {
        Err(format!(
            "horizon must be one of {:?}, got {}",
            ALLOWED_HORIZONS, horizon
        ))
    }
}

#[derive(Debug, Parser)]
#[command(name = "crop_forecast", about = "Commodity price forecasts from CEPEA indicator series")]
struct Args {
    /// Alias of the culture (e.g. "boi", "soja")
    #[arg(long)]
    culture: String,

    /// Id of the indicator variant
    #[arg(long)]
    id: String,

    /// Days ahead to predict
    #[arg(long, default_value = "15", value_parser = parse_horizon)]
    horizon: usize,

    /// Directory for cached series workbooks
    #[arg(long, default_value = "datasets")]
    cache_dir: PathBuf,

    /// Directory for persisted models
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    /// Catalog cache file
    #[arg(long, default_value = "cultures.json")]
    catalog_file: PathBuf,

    /// Re-scrape the catalog even if the cache file exists
    #[arg(long)]
    refresh_catalog: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let resolver = CatalogResolver::new(&args.catalog_file)?;
    let catalog = if args.refresh_catalog {
        resolver.refresh()?
    } else {
        resolver.load_or_fetch()?
    };

    let title = match catalog
        .get(&args.culture)
        .and_then(|variants| variants.get(&args.id))
    {
        Some(entry) => entry.title.clone(),
        None => bail!(
            "Unknown indicator {}/{}; known cultures: {:?}",
            args.culture,
            args.id,
            catalog.keys().collect::<Vec<_>>()
        ),
    };

    info!("Starting pipeline | {}", title);

    let fetcher = SeriesFetcher::new(&args.cache_dir)?;
    let store = ModelStore::new(&args.models_dir);
    let pipeline = ForecastPipeline::new(fetcher, store);

    let outcome = pipeline
        .run(&args.culture, &args.id, args.horizon)
        .with_context(|| format!("Forecast failed for {}/{}", args.culture, args.id))?;

    if let Some(score) = outcome.eval_score {
        println!("evaluation score: {:.4}", score);
    }

    println!("last {} observations:", outcome.history.len());
    for (date, value) in &outcome.history {
        println!("  {}  {:.2}", date, value);
    }

    println!("next {} days:", outcome.predictions.len());
    for (i, value) in outcome.predictions.iter().enumerate() {
        println!("  +{:<2} {:.2}", i + 1, value);
    }

    Ok(())
}
