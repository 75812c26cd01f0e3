use std::path::{Path, PathBuf};

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;
use serde::Serialize;

use crate::baseline::BaselineGrouping;
use crate::config::Config;
use crate::model::{BaselineQuery, CatchNetModel, EventSource, SeriesQuery};
use crate::schema;
use crate::store::Tables;
use crate::temporal::parse_request_date;

/// Python handle on a loaded model. Every query returns a JSON document.
#[pyclass(name = "CatchNet", frozen)]
pub struct PyCatchNet {
    model: CatchNetModel,
}

fn to_json<T: Serialize>(payload: &T) -> PyResult<String> {
    serde_json::to_string(payload).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn parse_source(source: &str) -> PyResult<EventSource> {
    match source {
        "dwell" => Ok(EventSource::Dwell),
        "pings" => Ok(EventSource::Pings),
        _ => Err(PyValueError::new_err(format!(
            "Invalid source: '{}'. Must be 'dwell' or 'pings'",
            source
        ))),
    }
}

#[pymethods]
impl PyCatchNet {
    /// Load tables from `data_dir`, optionally reading a TOML config first.
    #[new]
    #[pyo3(signature = (data_dir=None, config_path=None))]
    fn new(data_dir: Option<String>, config_path: Option<String>) -> PyResult<Self> {
        let mut config = Config::load_or_default(config_path.as_deref().map(Path::new))?;
        if let Some(dir) = data_dir {
            config.data.dir = PathBuf::from(dir);
        }
        let model = CatchNetModel::open(&config)?;
        Ok(Self { model })
    }

    /// Build a model from frames already held in Python. The `[analysis]`
    /// section of `config_path` (prohibited species, area rules, offsets)
    /// applies when given.
    #[staticmethod]
    #[pyo3(signature = (dwell_events, vessels, transactions, fish, fish_locations, pings=None, config_path=None))]
    #[allow(clippy::too_many_arguments)]
    fn from_frames(
        dwell_events: PyDataFrame,
        vessels: PyDataFrame,
        transactions: PyDataFrame,
        fish: PyDataFrame,
        fish_locations: PyDataFrame,
        pings: Option<PyDataFrame>,
        config_path: Option<String>,
    ) -> PyResult<Self> {
        let config = Config::load_or_default(config_path.as_deref().map(Path::new))?;
        let mut tables = Tables::new(
            dwell_events.0,
            vessels.0,
            transactions.0,
            fish.0,
            fish_locations.0,
        );
        if let Some(p) = pings {
            tables = tables.with_pings(p.0);
        }
        let model = CatchNetModel::new(tables, config.analysis)?;
        Ok(Self { model })
    }

    fn daily_view(&self, port: &str, date: &str) -> PyResult<String> {
        let date = parse_request_date(date)?;
        to_json(&self.model.daily_snapshot(port, date)?)
    }

    fn daily_exports_view(&self, port: &str, date: &str) -> PyResult<String> {
        let date = parse_request_date(date)?;
        to_json(&self.model.daily_exports(port, date)?)
    }

    fn vessel_catch(&self, port: &str, date: &str) -> PyResult<String> {
        let date = parse_request_date(date)?;
        to_json(&self.model.vessel_catch(port, date)?)
    }

    fn vessel_routine(&self, vessel: &str) -> PyResult<String> {
        to_json(&self.model.vessel_routine(vessel)?)
    }

    #[pyo3(signature = (vessel=None, locations=None, by_area=false, source="dwell"))]
    fn dwell_baseline(
        &self,
        vessel: Option<String>,
        locations: Option<Vec<String>>,
        by_area: bool,
        source: &str,
    ) -> PyResult<String> {
        let query = BaselineQuery {
            vessel,
            locations,
            grouping: if by_area {
                BaselineGrouping::LocationAndArea
            } else {
                BaselineGrouping::Location
            },
            source: parse_source(source)?,
        };
        to_json(&self.model.dwell_baseline(&query)?)
    }

    #[pyo3(signature = (end, locations=None, source="dwell"))]
    fn dwell_series(
        &self,
        end: &str,
        locations: Option<Vec<String>>,
        source: &str,
    ) -> PyResult<String> {
        let query = SeriesQuery {
            end: parse_request_date(end)?,
            locations,
            source: parse_source(source)?,
        };
        to_json(&self.model.dwell_series(&query)?)
    }

    #[getter]
    fn dwell_events_df(&self) -> PyDataFrame {
        PyDataFrame(self.model.tables().dwell_events.clone())
    }

    #[getter]
    fn transactions_df(&self) -> PyDataFrame {
        PyDataFrame(self.model.tables().transactions.clone())
    }
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let dwell = PyModule::new(m.py(), "dwell")?;
    dwell.add("VESSEL_NAME", schema::dwell::VESSEL_NAME)?;
    dwell.add("LOCATION_NAME", schema::dwell::LOCATION_NAME)?;
    dwell.add("KIND", schema::dwell::KIND)?;
    dwell.add("ARRIVAL_TIME", schema::dwell::ARRIVAL_TIME)?;
    dwell.add("TIME", schema::dwell::TIME)?;
    dwell.add("DWELL", schema::dwell::DWELL)?;
    dwell.add("ARRIVAL_PORT", schema::dwell::ARRIVAL_PORT)?;
    m.add_submodule(&dwell)?;

    let vessel = PyModule::new(m.py(), "vessel")?;
    vessel.add("VESSEL_ID", schema::vessel::VESSEL_ID)?;
    vessel.add("TONNAGE", schema::vessel::TONNAGE)?;
    m.add_submodule(&vessel)?;

    let transaction = PyModule::new(m.py(), "transaction")?;
    transaction.add("SOURCE", schema::transaction::SOURCE)?;
    transaction.add("FISH_ID", schema::transaction::FISH_ID)?;
    transaction.add("QTY_TONS", schema::transaction::QTY_TONS)?;
    transaction.add("TARGET_HARBOR", schema::transaction::TARGET_HARBOR)?;
    transaction.add("DATE", schema::transaction::DATE)?;
    m.add_submodule(&transaction)?;

    let fish = PyModule::new(m.py(), "fish")?;
    fish.add("ID", schema::fish::ID)?;
    fish.add("ENTITY_NAME", schema::fish::ENTITY_NAME)?;
    fish.add("LOCATION_ID", schema::fish::LOCATION_ID)?;
    m.add_submodule(&fish)?;

    Ok(())
}

/// Must match the `[lib]` name in Cargo.toml.
#[pymodule]
#[pyo3(name = "catchnet")]
fn catchnet_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCatchNet>()?;
    add_schema_exports(m)?;
    Ok(())
}
