use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::classify::AreaRules;
use crate::error::CatchNetError;
use crate::frame::{
    check_non_negative, check_parse, ensure_unique_keys, float_expr, float_values, has_column,
    require_columns, string_values,
};
use crate::schema::{dwell, prepared, vessel};
use crate::temporal::{add_seconds, datetime_values, iso_datetime, timestamp_expr};

/// Restricts a prepared dwell table to one arrival port and one arrival day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyFilter {
    pub port: String,
    pub arrival_date: NaiveDate,
}

/// Canonical columns of a prepared dwell table, in output order.
pub const PREPARED_COLUMNS: [&str; 9] = [
    dwell::VESSEL_NAME,
    dwell::LOCATION_NAME,
    dwell::KIND,
    prepared::AREA_TYPE,
    dwell::ARRIVAL_TIME,
    prepared::DATE,
    dwell::ARRIVAL_PORT,
    dwell::DWELL,
    prepared::TONNAGE,
];

/// Normalize raw dwell or ping records into the canonical per-visit table.
///
/// Required columns: vessel_name, location_name, kind, dwell and a time
/// column (`arrival_time`, or `time` for ping tables). `arrival_port` is
/// carried when present.
///
/// Output columns are [`PREPARED_COLUMNS`]: `area_type` comes from the rule
/// table, `arrival_time` is a microsecond `Datetime`, `date` its calendar
/// `Date`, `dwell` is non-negative seconds, and `tonnage` is joined from the registry (null for unregistered
/// vessels).
pub fn prepare(
    raw: &DataFrame,
    vessels: &DataFrame,
    rules: &AreaRules,
    filter: Option<&DailyFilter>,
) -> Result<DataFrame, CatchNetError> {
    require_columns(
        raw,
        dwell::TABLE,
        &[dwell::VESSEL_NAME, dwell::LOCATION_NAME, dwell::KIND, dwell::DWELL],
    )?;
    let time_col = time_column(raw)?;

    let port_expr = if has_column(raw, dwell::ARRIVAL_PORT) {
        col(dwell::ARRIVAL_PORT).cast(DataType::String)
    } else {
        lit(NULL).cast(DataType::String).alias(dwell::ARRIVAL_PORT)
    };

    let mut df = raw
        .clone()
        .lazy()
        .select([
            col(dwell::VESSEL_NAME).cast(DataType::String),
            col(dwell::LOCATION_NAME).cast(DataType::String),
            col(dwell::KIND).cast(DataType::String),
            port_expr,
            float_expr(raw, dwell::DWELL)?,
            timestamp_expr(raw, time_col)?.alias(dwell::ARRIVAL_TIME),
        ])
        .with_column(
            col(dwell::ARRIVAL_TIME)
                .cast(DataType::Date)
                .alias(prepared::DATE),
        )
        .collect()?;
    check_parse(raw, dwell::DWELL, &df, dwell::DWELL, dwell::TABLE, "numeric")?;
    check_non_negative(&df, dwell::DWELL, dwell::TABLE)?;
    check_parse(
        raw,
        time_col,
        &df,
        dwell::ARRIVAL_TIME,
        dwell::TABLE,
        "timestamps",
    )?;

    let kinds = df.column(dwell::KIND)?.str()?;
    let area_types: Vec<Option<&'static str>> = kinds
        .into_iter()
        .map(|k| k.map(|k| rules.classify(k).as_str()))
        .collect();
    df.with_column(Column::new(prepared::AREA_TYPE.into(), &area_types))?;

    let registry = registry_frame(vessels)?;

    let mut lazy = df.lazy().join(
        registry.lazy(),
        [col(dwell::VESSEL_NAME)],
        [col(dwell::VESSEL_NAME)],
        JoinArgs::new(JoinType::Left),
    );

    if let Some(f) = filter {
        lazy = lazy.filter(
            col(prepared::DATE)
                .eq(lit(f.arrival_date))
                .and(col(dwell::ARRIVAL_PORT).eq(lit(f.port.clone()))),
        );
    }

    let out = lazy
        .select(PREPARED_COLUMNS.iter().map(|c| col(*c)).collect::<Vec<_>>())
        .collect()?;

    tracing::debug!(
        raw_rows = raw.height(),
        prepared_rows = out.height(),
        filtered = filter.is_some(),
        "dwell table prepared"
    );
    Ok(out)
}

/// `arrival_time` when present, otherwise the ping `time` column.
fn time_column(raw: &DataFrame) -> Result<&'static str, CatchNetError> {
    if has_column(raw, dwell::ARRIVAL_TIME) {
        Ok(dwell::ARRIVAL_TIME)
    } else if has_column(raw, dwell::TIME) {
        Ok(dwell::TIME)
    } else {
        Err(CatchNetError::missing_column(dwell::TABLE, dwell::ARRIVAL_TIME))
    }
}

/// Registry keyed by vessel_name with a numeric tonnage.
fn registry_frame(vessels: &DataFrame) -> Result<DataFrame, CatchNetError> {
    require_columns(vessels, vessel::TABLE, &[vessel::VESSEL_ID, vessel::TONNAGE])?;

    let registry = vessels
        .clone()
        .lazy()
        .select([
            col(vessel::VESSEL_ID)
                .cast(DataType::String)
                .alias(dwell::VESSEL_NAME),
            float_expr(vessels, vessel::TONNAGE)?.alias(prepared::TONNAGE),
        ])
        .collect()?;
    check_parse(
        vessels,
        vessel::TONNAGE,
        &registry,
        prepared::TONNAGE,
        vessel::TABLE,
        "numeric",
    )?;
    check_non_negative(&registry, prepared::TONNAGE, vessel::TABLE)?;
    ensure_unique_keys(&registry, vessel::TABLE, dwell::VESSEL_NAME)?;
    Ok(registry)
}

// ── Vessel routine ──────────────────────────────────────────────────────────

/// One stay in a vessel's routine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineSegment {
    pub source: Option<String>,
    pub kind: Option<String>,
    pub start: String,
    pub end: Option<String>,
}

/// Chronological stays of one vessel.
///
/// Required columns: vessel_name, source, target, kind, dwell and a time
/// column. `kind` is reported as its classified area type and
/// `end = start + dwell` (absent when not representable). Rows without a
/// timestamp are dropped; a negative dwell is a validation error.
pub fn vessel_segments(
    raw: &DataFrame,
    vessel_name: &str,
    rules: &AreaRules,
) -> Result<Vec<RoutineSegment>, CatchNetError> {
    require_columns(
        raw,
        dwell::TABLE,
        &[
            dwell::VESSEL_NAME,
            dwell::SOURCE,
            dwell::TARGET,
            dwell::KIND,
            dwell::DWELL,
        ],
    )?;
    let time_col = time_column(raw)?;

    let own = raw
        .clone()
        .lazy()
        .filter(
            col(dwell::VESSEL_NAME)
                .cast(DataType::String)
                .eq(lit(vessel_name.to_string())),
        )
        .collect()?;

    let parsed = own
        .clone()
        .lazy()
        .with_columns([float_expr(&own, dwell::DWELL)?, timestamp_expr(&own, time_col)?])
        .collect()?;
    check_parse(&own, dwell::DWELL, &parsed, dwell::DWELL, dwell::TABLE, "numeric")?;
    check_non_negative(&parsed, dwell::DWELL, dwell::TABLE)?;
    check_parse(&own, time_col, &parsed, time_col, dwell::TABLE, "timestamps")?;

    let sources = string_values(&parsed, dwell::SOURCE)?;
    let kinds = string_values(&parsed, dwell::KIND)?;
    let times = datetime_values(&parsed, time_col)?;
    let dwells = float_values(&parsed, dwell::DWELL)?;

    let mut stays = Vec::with_capacity(parsed.height());
    let mut dropped = 0usize;
    for (((source, kind), time), dwell_s) in sources.into_iter().zip(kinds).zip(times).zip(dwells)
    {
        let Some(start) = time else {
            dropped += 1;
            continue;
        };
        let end = dwell_s.and_then(|d| add_seconds(&start, d));
        stays.push((start, source, kind, end));
    }
    if dropped > 0 {
        tracing::warn!(vessel = vessel_name, dropped, "routine rows without a timestamp");
    }

    stays.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(stays
        .into_iter()
        .map(|(start, source, kind, end)| RoutineSegment {
            source,
            kind: kind.map(|k| rules.classify(&k).as_str().to_string()),
            start: iso_datetime(&start),
            end: end.map(|e| iso_datetime(&e)),
        })
        .collect())
}
