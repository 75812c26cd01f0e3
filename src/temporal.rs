//! Timestamp parsing and ISO-8601 formatting shared by the preparers.
//!
//! Timestamp columns are parsed once into polars `Datetime` (microseconds)
//! and only formatted back to ISO strings when building payloads.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;

use crate::error::CatchNetError;

/// Accepted timestamp layouts, tried in order: ISO with `T` or a space
/// separator and optional fractional seconds, UTC `Z` suffix, bare date
/// (midnight).
pub const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

fn strptime(column: &str, format: &str) -> Expr {
    col(column)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .str()
        .to_datetime(
            Some(TimeUnit::Microseconds),
            None,
            StrptimeOptions {
                format: Some(format.into()),
                strict: false,
                ..Default::default()
            },
            lit("raise"),
        )
}

/// Expression turning `column` into a naive microsecond `Datetime`.
///
/// String columns are parsed against [`TIMESTAMP_FORMATS`]; a value matching
/// none of them becomes null, so callers compare null counts before and
/// after (see `frame::check_parse`). Date and datetime columns are cast.
pub fn timestamp_expr(df: &DataFrame, column: &str) -> Result<Expr, CatchNetError> {
    let expr = if df.column(column)?.dtype() == &DataType::String {
        let mut formats = TIMESTAMP_FORMATS.iter().rev();
        let mut expr = match formats.next() {
            Some(fmt) => strptime(column, fmt),
            None => lit(NULL).cast(DataType::Datetime(TimeUnit::Microseconds, None)),
        };
        for fmt in formats {
            let parsed = strptime(column, fmt);
            expr = when(parsed.clone().is_not_null())
                .then(parsed)
                .otherwise(expr);
        }
        expr
    } else {
        col(column).cast(DataType::Datetime(TimeUnit::Microseconds, None))
    };
    Ok(expr.alias(column))
}

/// Materialize a datetime column as naive timestamps.
pub fn datetime_values(
    df: &DataFrame,
    column: &str,
) -> Result<Vec<Option<NaiveDateTime>>, CatchNetError> {
    let micros = df
        .column(column)?
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(micros
        .i64()?
        .into_iter()
        .map(|us| {
            us.and_then(DateTime::from_timestamp_micros)
                .map(|dt| dt.naive_utc())
        })
        .collect())
}

/// Parse a request date parameter (`YYYY-MM-DD`).
pub fn parse_request_date(raw: &str) -> Result<NaiveDate, CatchNetError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| CatchNetError::Validation(format!("invalid date '{raw}': {e}")))
}

pub fn iso_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn iso_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// End of a stay that began at `start` and lasted `dwell_seconds`.
/// `None` when the result is not representable.
pub fn add_seconds(start: &NaiveDateTime, dwell_seconds: f64) -> Option<NaiveDateTime> {
    let millis = (dwell_seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    let delta = Duration::try_milliseconds(millis as i64)?;
    start.checked_add_signed(delta)
}
