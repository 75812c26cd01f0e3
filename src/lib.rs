//! Catch attribution and dwell-baseline analytics for maritime surveillance.
//!
//! Given vessel dwell events, the vessel registry, export transactions and
//! fish habitat mappings, answers which vessels likely caught an export
//! cargo (and how much), and how a vessel's time at a location compares to
//! that location's historical baseline.

pub mod attribution;
pub mod baseline;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dwell;
pub mod error;
pub mod exports;
mod frame;
pub mod habitat;
pub mod model;
pub mod payload;
pub mod schema;
pub mod store;
pub mod temporal;

#[cfg(feature = "python")]
mod python;

pub use attribution::{AttributionEngine, CatchAttribution};
pub use baseline::{BaselineGrouping, LocationBaseline};
pub use classify::{classify_kind, AreaRule, AreaRules, AreaType};
pub use config::{AnalysisConfig, Config, DataConfig, ProhibitedSpecies};
pub use error::CatchNetError;
pub use frame::finite;
pub use habitat::HabitatIndex;
pub use model::{BaselineQuery, CatchNetModel, EventSource, SeriesQuery};
pub use store::Tables;
