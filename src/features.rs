//! Supervised-learning feature engineering for price series
//!
//! Turns an ordered price series into a regression table: one seasonal code
//! per date plus `lag_window` lagged copies of the price, aligned by row
//! offset. Row alignment is load-bearing: every lag column and the truncated
//! base frame must share the same row index or downstream predictions are
//! silently wrong.

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Name of the lag column holding the price `p` rows back
pub fn lag_column(p: usize) -> String {
    format!("value_(t-{})", p)
}

/// Map a date to one of four seasonal buckets
///
/// 0 = autumn, 1 = winter, 2 = spring, 3 = summer (southern hemisphere).
/// Transition months (March, June, September, December) switch season on the
/// 21st; the year is irrelevant.
pub fn season_code(date: NaiveDate) -> i64 {
    let (early, late) = match date.month() {
        1 | 2 => (3, 3),
        3 => (3, 0),
        4 | 5 => (0, 0),
        6 => (0, 1),
        7 | 8 => (1, 1),
        9 => (1, 2),
        10 | 11 => (2, 2),
        12 => (2, 3),
        _ => unreachable!("chrono months are 1-12"),
    };

    if date.day() < 21 {
        early
    } else {
        late
    }
}

/// Supervised regression table built from one price series
///
/// Column order is `date`, `value` (target), `seasons`, then
/// `value_(t-1)` .. `value_(t-W)`. The regressor input keeps that order with
/// `date` and `value` removed.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    df: DataFrame,
    lag_window: usize,
}

/// Build the lag table for `series` with `lag_window` lagged price columns
///
/// The first `lag_window` rows of the series lack full lag history and are
/// dropped; the remaining rows keep their chronological order. A series of
/// `lag_window` rows or fewer cannot produce a single usable row.
pub fn build_lag_table(series: &PriceSeries, lag_window: usize) -> Result<FeatureFrame> {
    if lag_window == 0 {
        return Err(ForecastError::InvalidHorizon { got: 1 });
    }

    let len = series.len();
    if len <= lag_window {
        return Err(ForecastError::InsufficientHistory {
            needed: lag_window + 1,
            got: len,
        });
    }

    let dates = series.dates()?;
    let values = series.values()?;
    let seasons: Vec<i64> = dates.iter().map(|d| season_code(*d)).collect();

    let start = lag_window;

    let date_col = series
        .dataframe()
        .column("date")?
        .slice(start as i64, len - start);
    let value_col = Series::new("value", values[start..].to_vec());
    let season_col = Series::new("seasons", seasons[start..].to_vec());

    let mut columns = vec![date_col, value_col, season_col];
    for p in 1..=lag_window {
        // Row r of lag p holds the price at row (start + r) - p of the series,
        // i.e. row r - p of the truncated frame.
        columns.push(Series::new(
            lag_column(p).as_str(),
            values[start - p..len - p].to_vec(),
        ));
    }

    let df = DataFrame::new(columns)?;
    Ok(FeatureFrame { df, lag_window })
}

impl FeatureFrame {
    /// Get the underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows in the table
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Number of lagged price columns
    pub fn lag_window(&self) -> usize {
        self.lag_window
    }

    /// Number of regressor input columns (seasonal code plus lags)
    pub fn feature_count(&self) -> usize {
        self.lag_window + 1
    }

    /// Regressor input column names, in input order
    pub fn feature_columns(&self) -> Vec<String> {
        let mut names = vec!["seasons".to_string()];
        names.extend((1..=self.lag_window).map(lag_column));
        names
    }

    /// Regressor input matrix: one row per table row, columns in
    /// `feature_columns` order
    pub fn x_matrix(&self) -> Result<Vec<Vec<f64>>> {
        let seasons: Vec<i64> = self
            .df
            .column("seasons")?
            .i64()?
            .into_no_null_iter()
            .collect();

        let mut lag_cols: Vec<Vec<f64>> = Vec::with_capacity(self.lag_window);
        for p in 1..=self.lag_window {
            lag_cols.push(
                self.df
                    .column(&lag_column(p))?
                    .f64()?
                    .into_no_null_iter()
                    .collect(),
            );
        }

        let mut rows = Vec::with_capacity(self.height());
        for r in 0..self.height() {
            let mut row = Vec::with_capacity(self.feature_count());
            row.push(seasons[r] as f64);
            for col in &lag_cols {
                row.push(col[r]);
            }
            rows.push(row);
        }

        Ok(rows)
    }

    /// Regression targets, aligned with `x_matrix` rows
    pub fn targets(&self) -> Result<Vec<f64>> {
        Ok(self
            .df
            .column("value")?
            .f64()?
            .into_no_null_iter()
            .collect())
    }

    /// Input vector of the most recent observed row
    pub fn last_feature_row(&self) -> Result<Vec<f64>> {
        let mut rows = self.x_matrix()?;
        rows.pop()
            .ok_or_else(|| ForecastError::Data("Feature table is empty".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_series(len: usize) -> PriceSeries {
        let dates: Vec<NaiveDate> = (0..len)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64))
            .collect();
        let values: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
        PriceSeries::new(dates, values).unwrap()
    }

    #[test]
    fn transition_months_switch_on_the_21st() {
        for month in [3u32, 6, 9, 12] {
            let day20 = NaiveDate::from_ymd_opt(2023, month, 20).unwrap();
            let day21 = NaiveDate::from_ymd_opt(2023, month, 21).unwrap();
            assert_ne!(season_code(day20), season_code(day21), "month {}", month);
        }
    }

    #[test]
    fn plain_months_hold_one_season() {
        for month in [1u32, 2, 4, 5, 7, 8, 10, 11] {
            let day1 = NaiveDate::from_ymd_opt(2023, month, 1).unwrap();
            let day28 = NaiveDate::from_ymd_opt(2023, month, 28).unwrap();
            assert_eq!(season_code(day1), season_code(day28), "month {}", month);
        }
    }

    #[test]
    fn season_is_year_independent() {
        let a = NaiveDate::from_ymd_opt(1999, 7, 4).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        assert_eq!(season_code(a), season_code(b));
    }

    #[test]
    fn lag_table_drops_short_history_rows() {
        let table = build_lag_table(&ramp_series(10), 3).unwrap();
        assert_eq!(table.height(), 7);
        assert_eq!(table.feature_count(), 4);
    }

    #[test]
    fn lag_columns_align_with_truncated_frame() {
        let table = build_lag_table(&ramp_series(10), 3).unwrap();
        let targets = table.targets().unwrap();
        let x = table.x_matrix().unwrap();

        // value_(t-1) of row i equals the truncated frame's value at row i-1
        for i in 1..table.height() {
            assert_eq!(x[i][1], targets[i - 1]);
        }
        // first row's lags are the last pre-truncation observations, newest first
        assert_eq!(x[0][1..].to_vec(), vec![102.0, 101.0, 100.0]);
    }

    #[test]
    fn too_short_series_is_rejected() {
        let err = build_lag_table(&ramp_series(3), 3).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory { needed: 4, got: 3 }
        ));
    }

    #[test]
    fn zero_lag_window_is_rejected() {
        let err = build_lag_table(&ramp_series(10), 0).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidHorizon { .. }));
    }
}
