//! CLI argument parsing for catchnet

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::baseline::BaselineGrouping;
use crate::model::EventSource;

/// Movement table used for baselines and series
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    /// Dwell events (default)
    Dwell,
    /// Movement pings
    Pings,
}

impl From<SourceArg> for EventSource {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Dwell => EventSource::Dwell,
            SourceArg::Pings => EventSource::Pings,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "catchnet")]
#[command(version)]
#[command(about = "Catch attribution and dwell baselines over vessel movement data", long_about = None)]
pub struct Cli {
    /// Directory holding the source tables (overrides the config file)
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Enable debug logging on stderr
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vessels that arrived at a port for a given export day
    DailyView {
        #[arg(long)]
        port: String,
        /// Export day (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },
    /// Export tonnage per species from a port on a day
    DailyExports {
        #[arg(long)]
        port: String,
        #[arg(long)]
        date: String,
    },
    /// Attribute a day's export cargos to vessels
    VesselCatch {
        #[arg(long)]
        port: String,
        #[arg(long)]
        date: String,
    },
    /// Chronological stays of one vessel
    Routine {
        #[arg(long)]
        vessel: String,
    },
    /// Per-location dwell baselines, optionally against one vessel
    Baseline {
        #[arg(long)]
        vessel: Option<String>,
        /// Restrict to these locations (repeatable)
        #[arg(long = "location", value_name = "NAME")]
        locations: Vec<String>,
        /// Group by location and area type
        #[arg(long)]
        by_area: bool,
        #[arg(long, value_enum, default_value = "dwell")]
        source: SourceArg,
    },
    /// Daily mean dwell per location over the series window
    Series {
        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        #[arg(long = "location", value_name = "NAME")]
        locations: Vec<String>,
        #[arg(long, value_enum, default_value = "dwell")]
        source: SourceArg,
    },
}

/// Repeatable `--location` flags; absent means "all locations".
pub fn location_filter(locations: &[String]) -> Option<Vec<String>> {
    (!locations.is_empty()).then(|| locations.to_vec())
}

pub fn grouping(by_area: bool) -> BaselineGrouping {
    if by_area {
        BaselineGrouping::LocationAndArea
    } else {
        BaselineGrouping::Location
    }
}
