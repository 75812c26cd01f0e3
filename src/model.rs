use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use polars::prelude::DataFrame;

use crate::attribution::AttributionEngine;
use crate::baseline::{
    compare, compute_baselines, daily_series, restrict_to_locations, vessel_deviation,
    BaselineGrouping, SeriesWindow,
};
use crate::config::{AnalysisConfig, Config};
use crate::dwell::{self, DailyFilter};
use crate::error::CatchNetError;
use crate::exports::{self, ExportFilter};
use crate::frame::{finite_opt, float_values, normalize_filter, string_values};
use crate::habitat::HabitatIndex;
use crate::payload::*;
use crate::schema::{attribution, dwell as dwell_cols, prepared};
use crate::store::Tables;
use crate::temporal::{datetime_values, iso_date, iso_datetime};

/// Which movement table feeds the baseline engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSource {
    #[default]
    Dwell,
    Pings,
}

#[derive(Debug, Clone, Default)]
pub struct BaselineQuery {
    pub vessel: Option<String>,
    pub locations: Option<Vec<String>>,
    pub grouping: BaselineGrouping,
    pub source: EventSource,
}

#[derive(Debug, Clone)]
pub struct SeriesQuery {
    pub end: NaiveDate,
    pub locations: Option<Vec<String>>,
    pub source: EventSource,
}

/// Query façade over the loaded tables.
///
/// Owns the tables and the habitat index built from them; every query is a
/// pure function of that snapshot, so one model can serve concurrent
/// requests.
pub struct CatchNetModel {
    tables: Tables,
    habitat: HabitatIndex,
    config: AnalysisConfig,
}

impl CatchNetModel {
    pub fn new(tables: Tables, config: AnalysisConfig) -> Result<Self, CatchNetError> {
        let habitat = HabitatIndex::build(&tables.fish_locations)?;
        Ok(Self {
            tables,
            habitat,
            config,
        })
    }

    /// Load the tables named in `config.data` and build the model.
    pub fn open(config: &Config) -> Result<Self, CatchNetError> {
        let tables = Tables::load(&config.data)?;
        Self::new(tables, config.analysis.clone())
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn habitat(&self) -> &HabitatIndex {
        &self.habitat
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Arrival day of the vessels whose catch is exported on `export_date`.
    pub fn arrival_date_for(&self, export_date: NaiveDate) -> NaiveDate {
        export_date - Duration::days(self.config.arrival_offset_days)
    }

    // ── Daily views ─────────────────────────────────────────────────────────

    /// Vessels that arrived at `port` on the arrival day for `date`.
    pub fn daily_snapshot(&self, port: &str, date: NaiveDate) -> Result<DailySnapshot, CatchNetError> {
        let port = required_param(port, "port")?;
        let arrival_date = self.arrival_date_for(date);
        let events = self.prepared_dwell(Some(&DailyFilter {
            port: port.clone(),
            arrival_date,
        }))?;

        let vessels = string_values(&events, dwell_cols::VESSEL_NAME)?;
        let locations = string_values(&events, dwell_cols::LOCATION_NAME)?;
        let dwells = float_values(&events, dwell_cols::DWELL)?;
        let areas = string_values(&events, prepared::AREA_TYPE)?;
        let arrivals = datetime_values(&events, dwell_cols::ARRIVAL_TIME)?;
        let tonnages = float_values(&events, prepared::TONNAGE)?;

        let summary = DailySummary {
            num_vessels: distinct(&vessels),
            num_locations: distinct(&locations),
            total_dwell: dwells.iter().filter_map(|d| finite_opt(*d)).sum(),
        };

        let mut rows = Vec::with_capacity(events.height());
        for i in 0..events.height() {
            rows.push(DwellRow {
                vessel_name: vessels[i].clone(),
                location_name: locations[i].clone(),
                dwell: finite_opt(dwells[i]),
                area_type: areas[i].clone(),
                arrival_time: arrivals[i].as_ref().map(iso_datetime),
                tonnage: finite_opt(tonnages[i]),
            });
        }

        let message = rows.is_empty().then(|| {
            format!(
                "no dwell events at {port} with arrival on {}",
                iso_date(&arrival_date)
            )
        });
        Ok(DailySnapshot {
            date: iso_date(&date),
            port,
            summary,
            rows,
            message,
        })
    }

    /// Export tonnage per species leaving `port` on `date`.
    pub fn daily_exports(&self, port: &str, date: NaiveDate) -> Result<DailyExports, CatchNetError> {
        let port = required_param(port, "port")?;
        let rows = exports::daily_exports(
            &self.tables.transactions,
            &self.tables.fish,
            &self.config.prohibited_species,
            &ExportFilter {
                harbor: port.clone(),
                date,
            },
        )?;
        let message = rows
            .is_empty()
            .then(|| format!("no exports from {port} on {}", iso_date(&date)));
        Ok(DailyExports {
            port,
            date: iso_date(&date),
            rows,
            message,
        })
    }

    /// Attribute the cargos exported from `port` on `date` to the vessels
    /// that arrived there on the matching arrival day.
    pub fn vessel_catch(&self, port: &str, date: NaiveDate) -> Result<VesselCatch, CatchNetError> {
        let port = required_param(port, "port")?;
        let cargos = exports::prepare_cargos(
            &self.tables.transactions,
            &self.tables.fish,
            Some(&ExportFilter {
                harbor: port.clone(),
                date,
            }),
        )?;
        let events = self.prepared_dwell(Some(&DailyFilter {
            port: port.clone(),
            arrival_date: self.arrival_date_for(date),
        }))?;

        let engine = AttributionEngine::new(&self.habitat, &self.config.prohibited_species);
        let rows = engine.attribute(&cargos, &events)?;

        let num_cargo = distinct(&string_values(&cargos, attribution::CARGO_ID)?);
        let num_vessels = rows
            .iter()
            .map(|r| r.vessel_name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let message = if num_cargo == 0 {
            Some(format!("no exports from {port} on {}", iso_date(&date)))
        } else if rows.is_empty() {
            Some(format!(
                "no vessel activity in the habitats of the {num_cargo} cargo(s) from {port}"
            ))
        } else {
            None
        };

        Ok(VesselCatch {
            date: iso_date(&date),
            port,
            num_cargo,
            num_vessels,
            rows,
            message,
        })
    }

    /// A vessel's stays in chronological order.
    pub fn vessel_routine(&self, vessel: &str) -> Result<VesselRoutine, CatchNetError> {
        let vessel = required_param(vessel, "vessel")?;
        let segments = dwell::vessel_segments(
            &self.tables.dwell_events,
            &vessel,
            &self.config.area_rules,
        )?;
        let message = segments
            .is_empty()
            .then(|| format!("no movements recorded for vessel {vessel}"));
        Ok(VesselRoutine {
            num_segments: segments.len(),
            vessel,
            segments,
            message,
        })
    }

    // ── Baselines ───────────────────────────────────────────────────────────

    /// Per-location baselines over the whole history, optionally compared
    /// with one vessel's mean dwell.
    pub fn dwell_baseline(&self, query: &BaselineQuery) -> Result<DwellComparison, CatchNetError> {
        let vessel = query
            .vessel
            .as_deref()
            .map(|v| required_param(v, "vessel"))
            .transpose()?;
        let locations = normalize_filter(query.locations.as_deref(), "location")?;

        let mut events = self.prepared_events(query.source)?;
        if let Some(locs) = &locations {
            events = restrict_to_locations(&events, locs)?;
        }

        let baselines = compute_baselines(&events, query.grouping)?;
        let deviation = match &vessel {
            Some(v) => vessel_deviation(&events, v)?,
            None => Default::default(),
        };
        let has_vessel = !deviation.is_empty();
        let rows = compare(baselines, &deviation)?;

        let message = if rows.is_empty() {
            Some("no dwell activity at the requested locations".to_string())
        } else {
            match &vessel {
                Some(v) if !has_vessel => Some(format!("no dwell activity for vessel {v}")),
                _ => None,
            }
        };

        Ok(DwellComparison {
            num_locations: rows.len(),
            has_vessel,
            vessel,
            rows,
            message,
        })
    }

    /// Daily mean dwell per location over the configured window ending on
    /// `query.end`.
    pub fn dwell_series(&self, query: &SeriesQuery) -> Result<DwellSeries, CatchNetError> {
        let locations = normalize_filter(query.locations.as_deref(), "location")?;
        let events = self.prepared_events(query.source)?;
        let window = SeriesWindow {
            end: query.end,
            days: self.config.series_days,
        };
        let rows = daily_series(&events, window, locations.as_deref())?;
        let message = rows.is_empty().then(|| {
            format!(
                "no dwell activity between {} and {}",
                iso_date(&window.start()),
                iso_date(&window.end)
            )
        });
        Ok(DwellSeries { rows, message })
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn prepared_dwell(&self, filter: Option<&DailyFilter>) -> Result<DataFrame, CatchNetError> {
        dwell::prepare(
            &self.tables.dwell_events,
            &self.tables.vessels,
            &self.config.area_rules,
            filter,
        )
    }

    fn prepared_events(&self, source: EventSource) -> Result<DataFrame, CatchNetError> {
        let raw = match source {
            EventSource::Dwell => &self.tables.dwell_events,
            EventSource::Pings => self.tables.pings()?,
        };
        dwell::prepare(raw, &self.tables.vessels, &self.config.area_rules, None)
    }
}

fn required_param(value: &str, name: &str) -> Result<String, CatchNetError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatchNetError::Validation(format!("{name} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn distinct(values: &[Option<String>]) -> usize {
    values.iter().flatten().collect::<BTreeSet<_>>().len()
}
