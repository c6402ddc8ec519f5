use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between reading a dataset and writing a model.
#[derive(Error, Debug)]
pub enum Error {
  #[error("io error on {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("line {line}, column {column}: {value:?} is not a number")]
  Parse {
    line: u64,
    column: usize,
    value: String,
  },

  #[error("line {line}: expected {expected} columns, found {found}")]
  Shape {
    line: u64,
    expected: usize,
    found: usize,
  },

  #[error("dataset has no data rows")]
  Empty,

  #[error("{rows} rows cannot be split with validation_split={validation_split}")]
  Split { rows: usize, validation_split: f64 },

  #[error("invalid topology: {0}")]
  Topology(String),

  #[error("invalid training parameters: {0}")]
  Params(String),

  #[error("config error: {0}")]
  Config(#[from] serde_yaml::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("inference error: {0}")]
  Inference(String),

  #[error("tensor error: {0}")]
  Tensor(String),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Error::Io {
      path: path.into(),
      source,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
