use chrono::{Duration, NaiveDate};
use crop_forecast::data::{PriceSeries, SeriesSource};
use crop_forecast::models::GbmParams;
use crop_forecast::pipeline::ForecastPipeline;
use crop_forecast::store::ModelStore;
use crop_forecast::Result;

/// Serves a synthetic series so the demo runs without portal access
struct SyntheticSource;

impl SeriesSource for SyntheticSource {
    fn series(&self, _alias: &str, _id: &str) -> Result<PriceSeries> {
        create_sample_series(120)
    }
}

fn create_sample_series(len: usize) -> Result<PriceSeries> {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");

    let dates: Vec<NaiveDate> = (0..len)
        .map(|i| first + Duration::days(i as i64))
        .collect();

    // Gentle upward trend with a weekly wobble
    let values: Vec<f64> = (0..len)
        .map(|i| 250.0 + 0.3 * i as f64 + 4.0 * ((i as f64) * 0.9).sin())
        .collect();

    PriceSeries::new(dates, values)
}

fn main() -> Result<()> {
    println!("Crop Forecast: Offline Pipeline Example");
    println!("=======================================\n");

    let store_dir = std::env::temp_dir().join("crop_forecast_demo_models");
    let params = GbmParams {
        n_estimators: 200,
        ..GbmParams::default()
    };

    let pipeline = ForecastPipeline::with_params(SyntheticSource, ModelStore::new(&store_dir), params);

    println!("Running pipeline (trains on first run, loads afterwards)...\n");
    let outcome = pipeline.run("demo", "1", 7)?;

    if let Some(score) = outcome.eval_score {
        println!("Hold-out evaluation score: {:.4}\n", score);
    }

    println!("Recent history:");
    for (date, value) in outcome.history.iter().rev().take(5).rev() {
        println!("  {}  {:.2}", date, value);
    }

    println!("\nNext 7 days:");
    for (i, value) in outcome.predictions.iter().enumerate() {
        println!("  +{}  {:.2}", i + 1, value);
    }

    println!("\nForecasting complete!");
    Ok(())
}
