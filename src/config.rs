//! Runtime configuration: where the tables live and the analysis constants.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! [data]
//! dir = "data"
//! transactions = "transactions.csv"
//!
//! [analysis]
//! arrival_offset_days = 1
//! series_days = 7
//! prohibited_species = ["Sockfish/Pisces foetida"]
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::AreaRules;
use crate::error::CatchNetError;

pub const DEFAULT_PROHIBITED: [&str; 3] = [
    "Sockfish/Pisces foetida",
    "Offidiaa/Piscis osseus",
    "Helenaa/Pisces satis",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, CatchNetError> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML file. Relative `data.dir` values resolve against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, CatchNetError> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        if config.data.dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.data.dir = parent.join(&config.data.dir);
            }
        }
        Ok(config)
    }

    /// [`Config::load`] when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CatchNetError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// Table file names, relative to `dir`. `.parquet` and `.csv` are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub dwell_events: String,
    pub vessels: String,
    pub transactions: String,
    pub fish: String,
    pub fish_locations: String,
    /// Loaded only when the file exists.
    pub pings: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            dwell_events: "dwell_dynamic.parquet".to_string(),
            vessels: "vessels.parquet".to_string(),
            transactions: "transactions.parquet".to_string(),
            fish: "fish.parquet".to_string(),
            fish_locations: "fish_locations.parquet".to_string(),
            pings: Some("pings.parquet".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub prohibited_species: ProhibitedSpecies,
    /// Days between a vessel's arrival at port and the export of its catch.
    /// The arrival day for an export on day D is D minus this offset.
    pub arrival_offset_days: i64,
    /// Length of the daily dwell series window, ending on the requested day.
    pub series_days: i64,
    pub area_rules: AreaRules,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            prohibited_species: ProhibitedSpecies::default(),
            arrival_offset_days: 1,
            series_days: 7,
            area_rules: AreaRules::default(),
        }
    }
}

/// Species whose export is illegal, matched on exact `entity_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProhibitedSpecies(BTreeSet<String>);

impl Default for ProhibitedSpecies {
    fn default() -> Self {
        Self::new(DEFAULT_PROHIBITED)
    }
}

impl ProhibitedSpecies {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, entity_name: &str) -> bool {
        self.0.contains(entity_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
