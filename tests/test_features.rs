use chrono::{Duration, NaiveDate};
use crop_forecast::data::PriceSeries;
use crop_forecast::error::ForecastError;
use crop_forecast::features::{build_lag_table, lag_column, season_code};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn daily_series(len: usize, start_value: f64) -> PriceSeries {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..len)
        .map(|i| first + Duration::days(i as i64))
        .collect();
    let values: Vec<f64> = (0..len).map(|i| start_value + i as f64).collect();
    PriceSeries::new(dates, values).unwrap()
}

#[rstest]
#[case(1, 3)]
#[case(2, 3)]
#[case(4, 0)]
#[case(5, 0)]
#[case(7, 1)]
#[case(8, 1)]
#[case(10, 2)]
#[case(11, 2)]
fn season_of_plain_month(#[case] month: u32, #[case] expected: i64) {
    let date = NaiveDate::from_ymd_opt(2024, month, 10).unwrap();
    assert_eq!(season_code(date), expected);
}

#[rstest]
#[case(3, 3, 0)]
#[case(6, 0, 1)]
#[case(9, 1, 2)]
#[case(12, 2, 3)]
fn transition_month_splits_at_day_21(
    #[case] month: u32,
    #[case] before: i64,
    #[case] from_21st: i64,
) {
    let day20 = NaiveDate::from_ymd_opt(2024, month, 20).unwrap();
    let day21 = NaiveDate::from_ymd_opt(2024, month, 21).unwrap();
    assert_eq!(season_code(day20), before);
    assert_eq!(season_code(day21), from_21st);
}

#[test]
fn table_has_one_row_per_observation_with_full_history() {
    let series = daily_series(10, 100.0);
    let table = build_lag_table(&series, 3).unwrap();

    assert_eq!(table.height(), 7);
    assert_eq!(table.lag_window(), 3);
    assert_eq!(table.feature_count(), 4);
    assert_eq!(
        table.feature_columns(),
        vec!["seasons", "value_(t-1)", "value_(t-2)", "value_(t-3)"]
    );
}

#[test]
fn forty_row_ramp_with_lag_window_six() {
    let series = daily_series(40, 100.0);
    let table = build_lag_table(&series, 6).unwrap();

    assert_eq!(table.height(), 34);

    // Row 0's value_(t-1) is the sixth original observation (index 5)
    let x = table.x_matrix().unwrap();
    assert_eq!(x[0][1], 105.0);
    // ... and its oldest lag is the very first observation
    assert_eq!(x[0][6], 100.0);
}

#[test]
fn lag_one_tracks_the_previous_truncated_row() {
    let series = daily_series(25, 50.0);
    let table = build_lag_table(&series, 4).unwrap();

    let x = table.x_matrix().unwrap();
    let y = table.targets().unwrap();

    for i in 1..table.height() {
        assert_eq!(x[i][1], y[i - 1]);
    }
}

#[test]
fn rows_keep_chronological_order() {
    let series = daily_series(12, 10.0);
    let table = build_lag_table(&series, 2).unwrap();

    let y = table.targets().unwrap();
    let mut sorted = y.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(y, sorted);
}

#[test]
fn last_feature_row_matches_final_table_row() {
    let series = daily_series(15, 200.0);
    let table = build_lag_table(&series, 3).unwrap();

    let x = table.x_matrix().unwrap();
    let last = table.last_feature_row().unwrap();
    assert_eq!(&last, x.last().unwrap());
}

#[rstest]
#[case(5, 5)]
#[case(5, 8)]
fn window_not_smaller_than_series_is_rejected(#[case] len: usize, #[case] window: usize) {
    let series = daily_series(len, 100.0);
    let err = build_lag_table(&series, window).unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientHistory { .. }));
}

#[test]
fn lag_column_names_are_stable() {
    assert_eq!(lag_column(1), "value_(t-1)");
    assert_eq!(lag_column(14), "value_(t-14)");
}
