use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatchNetError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Table '{name}' not found at {path}")]
    MissingTable { name: String, path: String },

    #[error("Missing column: {table}.{column}")]
    MissingColumn { table: String, column: String },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Join integrity: {table}.{key} has {duplicates} duplicated key(s)")]
    JoinIntegrity {
        table: String,
        key: String,
        duplicates: usize,
    },
}

impl CatchNetError {
    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        Self::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

#[cfg(feature = "python")]
impl From<CatchNetError> for pyo3::PyErr {
    fn from(err: CatchNetError) -> pyo3::PyErr {
        match err {
            CatchNetError::Validation(_)
            | CatchNetError::MissingColumn { .. }
            | CatchNetError::InvalidData(_) => {
                pyo3::exceptions::PyValueError::new_err(err.to_string())
            }
            _ => pyo3::exceptions::PyRuntimeError::new_err(err.to_string()),
        }
    }
}
