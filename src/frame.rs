use polars::prelude::*;

use crate::error::CatchNetError;

pub(crate) fn require_columns(
    df: &DataFrame,
    table: &str,
    required: &[&str],
) -> Result<(), CatchNetError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(CatchNetError::missing_column(table, col_name));
        }
    }
    Ok(())
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.schema().contains(name)
}

/// Expression parsing `column` to Float64, stripping whitespace first when
/// the column is still a string (CSV input).
pub(crate) fn float_expr(df: &DataFrame, column: &str) -> Result<Expr, CatchNetError> {
    let expr = if df.column(column)?.dtype() == &DataType::String {
        col(column)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .cast(DataType::Float64)
    } else {
        col(column).cast(DataType::Float64)
    };
    Ok(expr)
}

/// Fail when a parse produced more nulls than the source had: some value did
/// not parse as `what` (numbers, timestamps, dates).
pub(crate) fn check_parse(
    raw: &DataFrame,
    raw_column: &str,
    parsed: &DataFrame,
    parsed_column: &str,
    table: &str,
    what: &str,
) -> Result<(), CatchNetError> {
    let before = raw.column(raw_column)?.null_count();
    let after = parsed.column(parsed_column)?.null_count();
    if after > before {
        return Err(CatchNetError::Validation(format!(
            "{table}.{raw_column}: {} value(s) are not {what}",
            after - before
        )));
    }
    Ok(())
}

/// Dwell seconds and tonnage are quantities; a negative value is malformed.
pub(crate) fn check_non_negative(
    df: &DataFrame,
    column: &str,
    table: &str,
) -> Result<(), CatchNetError> {
    let negatives = float_values(df, column)?
        .into_iter()
        .flatten()
        .filter(|v| *v < 0.0)
        .count();
    if negatives > 0 {
        return Err(CatchNetError::Validation(format!(
            "{table}.{column}: {negatives} value(s) are negative"
        )));
    }
    Ok(())
}

/// Reject a lookup table whose join key is not unique.
pub(crate) fn ensure_unique_keys(
    df: &DataFrame,
    table: &str,
    key: &str,
) -> Result<(), CatchNetError> {
    let dups = df
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg([col(key).count().alias("_key_count")])
        .filter(col("_key_count").gt(lit(1)))
        .collect()?;

    if dups.height() > 0 {
        return Err(CatchNetError::JoinIntegrity {
            table: table.to_string(),
            key: key.to_string(),
            duplicates: dups.height(),
        });
    }
    Ok(())
}

/// Materialize a column as owned strings, casting non-string dtypes.
pub(crate) fn string_values(
    df: &DataFrame,
    column: &str,
) -> Result<Vec<Option<String>>, CatchNetError> {
    let casted = df.column(column)?.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

pub(crate) fn float_values(
    df: &DataFrame,
    column: &str,
) -> Result<Vec<Option<f64>>, CatchNetError> {
    let casted = df.column(column)?.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Finite values only; NaN and infinities become `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

pub(crate) fn finite_opt(value: Option<f64>) -> Option<f64> {
    value.and_then(finite)
}

/// Trim a caller-supplied list of names. `None` means "no filter"; a list
/// that is empty after trimming is rejected.
pub(crate) fn normalize_filter(
    values: Option<&[String]>,
    what: &str,
) -> Result<Option<Vec<String>>, CatchNetError> {
    let Some(values) = values else {
        return Ok(None);
    };
    let trimmed: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect();
    if trimmed.is_empty() {
        return Err(CatchNetError::Validation(format!(
            "{what} filter is empty after trimming"
        )));
    }
    Ok(Some(trimmed))
}
