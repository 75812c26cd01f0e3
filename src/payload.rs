//! Query result payloads handed to the presentation layer.
//!
//! Floats are finite or `None` (serialized as `null`). An empty result
//! carries a `message` explaining what matched nothing.

use serde::Serialize;

use crate::attribution::CatchAttribution;
use crate::baseline::{BaselineComparison, LocationSeries};
use crate::dwell::RoutineSegment;
use crate::exports::ExportRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub num_vessels: usize,
    pub num_locations: usize,
    pub total_dwell: f64,
}

/// One prepared dwell event in the daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DwellRow {
    pub vessel_name: Option<String>,
    pub location_name: Option<String>,
    pub dwell: Option<f64>,
    pub area_type: Option<String>,
    pub arrival_time: Option<String>,
    pub tonnage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub date: String,
    pub port: String,
    pub summary: DailySummary,
    pub rows: Vec<DwellRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExports {
    pub port: String,
    pub date: String,
    pub rows: Vec<ExportRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselCatch {
    pub date: String,
    pub port: String,
    pub num_cargo: usize,
    pub num_vessels: usize,
    pub rows: Vec<CatchAttribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VesselRoutine {
    pub vessel: String,
    pub num_segments: usize,
    pub segments: Vec<RoutineSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DwellComparison {
    pub num_locations: usize,
    pub has_vessel: bool,
    pub vessel: Option<String>,
    pub rows: Vec<BaselineComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DwellSeries {
    pub rows: Vec<LocationSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
