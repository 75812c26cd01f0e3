use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::config::DataConfig;
use crate::error::CatchNetError;
use crate::schema::{dwell, fish, transaction, vessel};

/// The source tables, loaded once and shared read-only by every query.
#[derive(Debug, Clone)]
pub struct Tables {
    pub dwell_events: DataFrame,
    pub vessels: DataFrame,
    pub transactions: DataFrame,
    pub fish: DataFrame,
    pub fish_locations: DataFrame,
    pub pings: Option<DataFrame>,
}

impl Tables {
    /// Wrap frames supplied by the caller.
    pub fn new(
        dwell_events: DataFrame,
        vessels: DataFrame,
        transactions: DataFrame,
        fish: DataFrame,
        fish_locations: DataFrame,
    ) -> Self {
        Self {
            dwell_events,
            vessels,
            transactions,
            fish,
            fish_locations,
            pings: None,
        }
    }

    pub fn with_pings(mut self, pings: DataFrame) -> Self {
        self.pings = Some(pings);
        self
    }

    /// Load every table named in `config`. The ping table is optional and
    /// skipped when its file does not exist.
    pub fn load(config: &DataConfig) -> Result<Self, CatchNetError> {
        let dir = config.dir.as_path();
        let pings = match &config.pings {
            Some(name) if dir.join(name).exists() => Some(read_table(dir, "pings", name)?),
            _ => None,
        };

        Ok(Self {
            dwell_events: read_table(dir, dwell::TABLE, &config.dwell_events)?,
            vessels: read_table(dir, vessel::TABLE, &config.vessels)?,
            transactions: read_table(dir, transaction::TABLE, &config.transactions)?,
            fish: read_table(dir, fish::TABLE, &config.fish)?,
            fish_locations: read_table(dir, fish::LOCATIONS_TABLE, &config.fish_locations)?,
            pings,
        })
    }

    pub fn pings(&self) -> Result<&DataFrame, CatchNetError> {
        self.pings
            .as_ref()
            .ok_or_else(|| CatchNetError::NotLoaded("pings".into()))
    }
}

/// Read a table by file extension: parquet as typed columns, anything else
/// as CSV with every column a string.
pub fn read_table(dir: &Path, name: &str, filename: &str) -> Result<DataFrame, CatchNetError> {
    let path = dir.join(filename);
    if !path.exists() {
        return Err(CatchNetError::MissingTable {
            name: name.to_string(),
            path: path.display().to_string(),
        });
    }

    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    let df = if is_parquet {
        ParquetReader::new(File::open(&path)?).finish()?
    } else {
        read_csv_as_strings(path)?
    };

    tracing::info!(table = name, rows = df.height(), cols = df.width(), "table loaded");
    Ok(df)
}

/// Read a CSV file with all columns as String dtype, trimming whitespace
/// from column names.
fn read_csv_as_strings(path: PathBuf) -> Result<DataFrame, CatchNetError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn csv_config(dir: &Path) -> DataConfig {
        DataConfig {
            dir: dir.to_path_buf(),
            dwell_events: "dwell.csv".into(),
            vessels: "vessels.csv".into(),
            transactions: "transactions.csv".into(),
            fish: "fish.csv".into(),
            fish_locations: "fish_locations.csv".into(),
            pings: Some("pings.csv".into()),
        }
    }

    fn write_all(dir: &Path) {
        write(
            dir,
            "dwell.csv",
            " vessel_name ,location_name,kind,arrival_time,dwell\nA,X,Fishing Ground,2035-09-15 06:00:00,3600\n",
        );
        write(dir, "vessels.csv", "vessel_id,tonnage\nA,100\n");
        write(
            dir,
            "transactions.csv",
            "source,fish_id,qty_tons,target_harbor,date\nC1,1,30,City of Haacklee,2035-09-16\n",
        );
        write(dir, "fish.csv", "id,entity_name\n1,Tuna\n");
        write(dir, "fish_locations.csv", "entity_name,location_id\nTuna,X\n");
    }

    #[test]
    fn loads_csv_tables_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());

        let tables = Tables::load(&csv_config(dir.path())).unwrap();
        assert_eq!(tables.dwell_events.height(), 1);
        assert!(tables.dwell_events.column("vessel_name").is_ok());
        assert_eq!(
            tables.vessels.column("tonnage").unwrap().dtype(),
            &DataType::String
        );
        assert!(tables.pings.is_none());
        assert!(matches!(tables.pings(), Err(CatchNetError::NotLoaded(_))));
    }

    #[test]
    fn optional_pings_are_loaded_when_present() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        write(
            dir.path(),
            "pings.csv",
            "vessel_name,location_name,kind,time,dwell\nA,X,Fishing Ground,2035-09-15T06:00:00,60\n",
        );
        let tables = Tables::load(&csv_config(dir.path())).unwrap();
        assert_eq!(tables.pings().unwrap().height(), 1);
    }

    #[test]
    fn missing_required_file_names_the_table() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        std::fs::remove_file(dir.path().join("fish.csv")).unwrap();
        match Tables::load(&csv_config(dir.path())) {
            Err(CatchNetError::MissingTable { name, .. }) => assert_eq!(name, "fish"),
            other => panic!("expected missing table, got {other:?}"),
        }
    }
}
