use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

use crate::error::CatchNetError;
use crate::frame::{finite, finite_opt, float_values, require_columns, string_values};
use crate::schema::{baseline, dwell, prepared};

/// Grouping key for baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselineGrouping {
    #[default]
    Location,
    LocationAndArea,
}

impl BaselineGrouping {
    fn columns(&self) -> Vec<&'static str> {
        match self {
            Self::Location => vec![dwell::LOCATION_NAME],
            Self::LocationAndArea => vec![dwell::LOCATION_NAME, prepared::AREA_TYPE],
        }
    }
}

/// Typical time-at-location. `safe_low..=safe_high` is the normal range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationBaseline {
    pub location_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_type: Option<String>,
    pub mean_dwell: Option<f64>,
    pub q25: Option<f64>,
    pub q75: Option<f64>,
    pub count: usize,
    pub safe_low: Option<f64>,
    pub safe_high: Option<f64>,
}

/// A baseline row with the vessel's own mean dwell at that location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineComparison {
    #[serde(flatten)]
    pub baseline: LocationBaseline,
    pub vessel_dwell: Option<f64>,
}

/// Percentile with linear interpolation between closest ranks.
/// `sorted` must be ascending and free of NaN.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn summarize(mut values: Vec<f64>) -> (Option<f64>, Option<f64>, Option<f64>, usize) {
    values.retain(|v| !v.is_nan());
    values.sort_by(|a, b| a.total_cmp(b));
    let count = values.len();
    if count == 0 {
        return (None, None, None, 0);
    }
    let mean = values.iter().sum::<f64>() / count as f64;
    (
        finite(mean),
        percentile(&values, 0.25).and_then(finite),
        percentile(&values, 0.75).and_then(finite),
        count,
    )
}

/// Keep only events at the given locations.
pub fn restrict_to_locations(
    events: &DataFrame,
    locations: &[String],
) -> Result<DataFrame, CatchNetError> {
    require_columns(events, dwell::TABLE, &[dwell::LOCATION_NAME])?;
    let wanted = Series::new("locations".into(), locations);
    let df = events
        .clone()
        .lazy()
        .filter(col(dwell::LOCATION_NAME).is_in(lit(wanted), false))
        .collect()?;
    Ok(df)
}

/// Per-location dwell baselines, sorted by location (then area type).
///
/// Required columns: location_name, dwell (+ area_type when grouping by
/// area). Null dwell values are ignored; rows with a null location are
/// dropped.
pub fn compute_baselines(
    events: &DataFrame,
    grouping: BaselineGrouping,
) -> Result<Vec<LocationBaseline>, CatchNetError> {
    let group_cols = grouping.columns();
    let mut required = group_cols.clone();
    required.push(dwell::DWELL);
    require_columns(events, dwell::TABLE, &required)?;

    let keyed = events
        .clone()
        .lazy()
        .filter(col(dwell::LOCATION_NAME).is_not_null())
        .collect()?;
    if keyed.height() < events.height() {
        tracing::warn!(
            dropped = events.height() - keyed.height(),
            "dwell rows without a location ignored"
        );
    }

    let partitions = keyed.partition_by(group_cols.clone(), true)?;

    let mut rows = Vec::with_capacity(partitions.len());
    for partition in &partitions {
        let location = string_values(partition, dwell::LOCATION_NAME)?
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_default();
        let area_type = match grouping {
            BaselineGrouping::Location => None,
            BaselineGrouping::LocationAndArea => string_values(partition, prepared::AREA_TYPE)?
                .into_iter()
                .next()
                .flatten(),
        };

        let values: Vec<f64> = float_values(partition, dwell::DWELL)?
            .into_iter()
            .flatten()
            .collect();
        let (mean_dwell, q25, q75, count) = summarize(values);

        rows.push(LocationBaseline {
            location_name: location,
            area_type,
            mean_dwell,
            q25,
            q75,
            count,
            safe_low: q25.map(|q| q.max(0.0)),
            safe_high: q75,
        });
    }

    rows.sort_by(|a, b| {
        a.location_name
            .cmp(&b.location_name)
            .then_with(|| a.area_type.cmp(&b.area_type))
    });
    Ok(rows)
}

/// Mean dwell per location over one vessel's own events.
pub fn vessel_deviation(
    events: &DataFrame,
    vessel_name: &str,
) -> Result<BTreeMap<String, f64>, CatchNetError> {
    require_columns(
        events,
        dwell::TABLE,
        &[dwell::VESSEL_NAME, dwell::LOCATION_NAME, dwell::DWELL],
    )?;

    let means = events
        .clone()
        .lazy()
        .filter(
            col(dwell::VESSEL_NAME)
                .eq(lit(vessel_name.to_string()))
                .and(col(dwell::LOCATION_NAME).is_not_null()),
        )
        .group_by([col(dwell::LOCATION_NAME)])
        .agg([col(dwell::DWELL)
            .cast(DataType::Float64)
            .mean()
            .alias(baseline::VESSEL_DWELL)])
        .collect()?;

    let locations = string_values(&means, dwell::LOCATION_NAME)?;
    let values = float_values(&means, baseline::VESSEL_DWELL)?;

    let mut out = BTreeMap::new();
    for (location, value) in locations.into_iter().zip(values) {
        if let (Some(location), Some(value)) = (location, finite_opt(value)) {
            out.insert(location, value);
        }
    }
    Ok(out)
}

/// Left join of baselines with a vessel's per-location mean.
///
/// One output row per baseline row; `vessel_dwell` is `None` where the
/// vessel has no activity. A location appearing twice in the baselines
/// breaks the one-to-one join and fails the request.
pub fn compare(
    baselines: Vec<LocationBaseline>,
    deviation: &BTreeMap<String, f64>,
) -> Result<Vec<BaselineComparison>, CatchNetError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates = 0usize;
    for b in &baselines {
        if !seen.insert(b.location_name.as_str()) {
            duplicates += 1;
        }
    }
    if duplicates > 0 {
        return Err(CatchNetError::JoinIntegrity {
            table: "baseline".to_string(),
            key: dwell::LOCATION_NAME.to_string(),
            duplicates,
        });
    }

    Ok(baselines
        .into_iter()
        .map(|b| {
            let vessel_dwell = deviation.get(&b.location_name).copied();
            BaselineComparison {
                baseline: b,
                vessel_dwell,
            }
        })
        .collect())
}

// ── Daily series ────────────────────────────────────────────────────────────

/// Inclusive range of calendar days ending on `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesWindow {
    pub end: NaiveDate,
    pub days: i64,
}

impl SeriesWindow {
    pub fn start(&self) -> NaiveDate {
        self.end - Duration::days((self.days - 1).max(0))
    }
}

/// Mean dwell per day at one location, dates ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSeries {
    pub location_name: String,
    pub dates: Vec<String>,
    pub avg_dwell: Vec<Option<f64>>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Mean dwell per (day, location) within `window`, optionally restricted to
/// `locations`. Requires the prepared `date` column (`Date` dtype); dates
/// come back as ISO strings.
pub fn daily_series(
    events: &DataFrame,
    window: SeriesWindow,
    locations: Option<&[String]>,
) -> Result<Vec<LocationSeries>, CatchNetError> {
    require_columns(
        events,
        dwell::TABLE,
        &[dwell::LOCATION_NAME, prepared::DATE, dwell::DWELL],
    )?;

    let scoped = match locations {
        Some(locs) => restrict_to_locations(events, locs)?,
        None => events.clone(),
    };

    let daily = scoped
        .lazy()
        .filter(
            col(prepared::DATE)
                .gt_eq(lit(window.start()))
                .and(col(prepared::DATE).lt_eq(lit(window.end)))
                .and(col(dwell::LOCATION_NAME).is_not_null()),
        )
        .group_by([col(dwell::LOCATION_NAME), col(prepared::DATE)])
        .agg([col(dwell::DWELL)
            .cast(DataType::Float64)
            .mean()
            .alias(baseline::AVG_DWELL)])
        .collect()?;

    let names = string_values(&daily, dwell::LOCATION_NAME)?;
    let dates = string_values(&daily, prepared::DATE)?;
    let avgs = float_values(&daily, baseline::AVG_DWELL)?;

    let mut by_location: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    for ((name, date), avg) in names.into_iter().zip(dates).zip(avgs) {
        if let (Some(name), Some(date)) = (name, date) {
            by_location
                .entry(name)
                .or_default()
                .insert(date, finite_opt(avg).map(round2));
        }
    }

    Ok(by_location
        .into_iter()
        .map(|(location_name, points)| {
            let (dates, avg_dwell) = points.into_iter().unzip();
            LocationSeries {
                location_name,
                dates,
                avg_dwell,
            }
        })
        .collect())
}
