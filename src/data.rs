//! Raw price series handling: download, disk cache, and workbook parsing

use crate::error::{ForecastError, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Sheet holding the series inside the downloaded workbook
const SHEET_NAME: &str = "Plan 1";

/// Three banner rows plus one header row precede the data
const LEADING_ROWS: usize = 4;

/// Day count between the Excel serial epoch (1899-12-30) and a serial value
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Browser User-Agent the portal expects on series downloads
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

/// Ordered daily price series for one indicator variant
///
/// Wraps a two-column DataFrame (`date` as epoch milliseconds, `value` as the
/// nominal price). Rows are in chronological order; spacing is whatever the
/// source published and is not validated.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    df: DataFrame,
}

impl PriceSeries {
    /// Build a series from parallel date and value vectors
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::Data(format!(
                "Date and value lengths differ: {} vs {}",
                dates.len(),
                values.len()
            )));
        }

        let date_series = Series::new(
            "date",
            dates
                .iter()
                .map(|d| {
                    d.and_hms_opt(0, 0, 0)
                        .map(|dt| dt.timestamp_millis())
                        .ok_or_else(|| ForecastError::Data(format!("Invalid date: {}", d)))
                })
                .collect::<Result<Vec<i64>>>()?,
        );
        let value_series = Series::new("value", values);

        let df = DataFrame::new(vec![date_series, value_series])?;
        Ok(Self { df })
    }

    /// Get the underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Get the number of observations
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Get the observation dates
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        self.df
            .column("date")?
            .i64()?
            .into_no_null_iter()
            .map(|ms| {
                NaiveDateTime::from_timestamp_millis(ms)
                    .map(|dt| dt.date())
                    .ok_or_else(|| ForecastError::Data(format!("Invalid date timestamp: {}", ms)))
            })
            .collect()
    }

    /// Get the observed prices
    pub fn values(&self) -> Result<Vec<f64>> {
        Ok(self
            .df
            .column("value")?
            .f64()?
            .into_no_null_iter()
            .collect())
    }

    /// Last `n` observations as (date, value) pairs, oldest first
    pub fn tail(&self, n: usize) -> Result<Vec<(NaiveDate, f64)>> {
        let dates = self.dates()?;
        let values = self.values()?;
        let start = dates.len().saturating_sub(n);

        Ok(dates[start..]
            .iter()
            .copied()
            .zip(values[start..].iter().copied())
            .collect())
    }
}

/// Source of raw price series, keyed by indicator alias and variant id
///
/// The forecast pipeline depends on this seam rather than on the HTTP fetcher
/// directly, so tests and other front-ends can supply series in memory.
pub trait SeriesSource {
    /// Retrieve the full ordered series for one (alias, id) pair
    fn series(&self, alias: &str, id: &str) -> Result<PriceSeries>;
}

/// Downloads indicator workbooks from the portal and caches them on disk
///
/// A cached workbook is reused forever; nothing invalidates it. Concurrent
/// fetches of the same (alias, id) may race on the cache file write.
#[derive(Debug)]
pub struct SeriesFetcher {
    base_url: String,
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl SeriesFetcher {
    /// Portal base URL the series endpoint hangs off
    pub const BASE_URL: &'static str = "https://www.cepea.esalq.usp.br/br";

    /// Create a fetcher caching workbooks under `cache_dir`
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        Self::with_base_url(Self::BASE_URL, cache_dir)
    }

    /// Create a fetcher against a custom portal root
    pub fn with_base_url<P: AsRef<Path>>(base_url: &str, cache_dir: P) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: base_url.to_string(),
            cache_dir: cache_dir.as_ref().to_path_buf(),
            client,
        })
    }

    /// Cache file path for one (alias, id) pair
    fn workbook_path(&self, alias: &str, id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}_{}_dataset.xls", alias, id))
    }

    /// Download the workbook for (alias, id) unless already cached
    fn ensure_workbook(&self, alias: &str, id: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| ForecastError::Persistence(format!("Creating cache dir: {}", e)))?;

        let path = self.workbook_path(alias, id);
        if path.exists() {
            tracing::debug!("Using cached workbook {}", path.display());
            return Ok(path);
        }

        let url = format!("{}/indicador/series/{}.aspx?id={}", self.base_url, alias, id);
        tracing::info!("Downloading series workbook from {}", url);

        let body = self
            .client
            .get(url.as_str())
            .send()?
            .error_for_status()?
            .bytes()?;

        fs::write(&path, &body)
            .map_err(|e| ForecastError::Persistence(format!("Writing cache file: {}", e)))?;

        Ok(path)
    }
}

impl SeriesSource for SeriesFetcher {
    fn series(&self, alias: &str, id: &str) -> Result<PriceSeries> {
        let path = self.ensure_workbook(alias, id)?;
        parse_workbook(&path)
    }
}

/// Parse a cached indicator workbook into a price series
///
/// Expects the portal layout: sheet "Plan 1", three banner rows, a header row,
/// then one row per day with date, nominal R$ price, and a US$ price column
/// which is discarded.
pub fn parse_workbook(path: &Path) -> Result<PriceSeries> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ForecastError::Fetch(format!("Opening workbook {}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range(SHEET_NAME)
        .ok_or_else(|| {
            ForecastError::Fetch(format!(
                "Sheet '{}' not found in {}",
                SHEET_NAME,
                path.display()
            ))
        })?
        .map_err(|e| ForecastError::Fetch(format!("Reading sheet '{}': {}", SHEET_NAME, e)))?;

    let mut dates = Vec::new();
    let mut values = Vec::new();

    for row in range.rows().skip(LEADING_ROWS) {
        if row.iter().all(|cell| matches!(cell, DataType::Empty)) {
            continue;
        }
        if row.len() < 2 {
            return Err(ForecastError::Fetch(format!(
                "Workbook row has {} cells, expected at least 2",
                row.len()
            )));
        }

        dates.push(parse_date_cell(&row[0])?);
        values.push(parse_price_cell(&row[1])?);
    }

    PriceSeries::new(dates, values)
}

/// Interpret a workbook cell as a calendar date
///
/// The portal publishes dates as dd/mm/yyyy strings; Excel serial values are
/// accepted as well in case the sheet was re-saved with typed cells.
pub fn parse_date_cell(cell: &DataType) -> Result<NaiveDate> {
    match cell {
        DataType::String(s) => NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
            .map_err(|e| ForecastError::Fetch(format!("Unparseable date '{}': {}", s, e))),
        DataType::DateTime(serial) | DataType::Float(serial) => {
            let (y, m, d) = EXCEL_EPOCH;
            NaiveDate::from_ymd_opt(y, m, d)
                .map(|epoch| epoch + Duration::days(*serial as i64))
                .ok_or_else(|| ForecastError::Fetch("Invalid Excel epoch".to_string()))
        }
        other => Err(ForecastError::Fetch(format!(
            "Unexpected date cell: {:?}",
            other
        ))),
    }
}

/// Interpret a workbook cell as a decimal price
pub fn parse_price_cell(cell: &DataType) -> Result<f64> {
    match cell {
        DataType::Float(v) => Ok(*v),
        DataType::Int(v) => Ok(*v as f64),
        DataType::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|e| ForecastError::Fetch(format!("Unparseable price '{}': {}", s, e))),
        other => Err(ForecastError::Fetch(format!(
            "Unexpected price cell: {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_cell_from_portal_string() {
        let cell = DataType::String("17/05/2024".to_string());
        let date = parse_date_cell(&cell).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
    }

    #[test]
    fn date_cell_from_excel_serial() {
        // 2024-05-17 is serial 45429 from the 1899-12-30 epoch
        let cell = DataType::DateTime(45429.0);
        let date = parse_date_cell(&cell).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
    }

    #[test]
    fn price_cell_accepts_comma_decimal() {
        let cell = DataType::String("132,55".to_string());
        assert_eq!(parse_price_cell(&cell).unwrap(), 132.55);
    }

    #[test]
    fn price_cell_rejects_garbage() {
        let cell = DataType::String("n/a".to_string());
        assert!(parse_price_cell(&cell).is_err());
    }

    #[test]
    fn series_tail_returns_most_recent_pairs() {
        let dates: Vec<NaiveDate> = (1..=5)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
            .collect();
        let series = PriceSeries::new(dates, vec![10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();

        let tail = series.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].1, 13.0);
        assert_eq!(tail[1].1, 14.0);
    }

    #[test]
    fn series_rejects_length_mismatch() {
        let dates = vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()];
        assert!(PriceSeries::new(dates, vec![1.0, 2.0]).is_err());
    }
}
