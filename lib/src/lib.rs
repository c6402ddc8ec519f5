pub mod dataset;
pub mod error;
pub mod inference;
pub mod model;
pub mod onnx;
pub mod training;
pub mod utils;

use std::path::{Path, PathBuf};

use tracing::info;

pub use error::{Error, Result};
use training::{EpochObserver, TrainParams, TrainedModel};

pub const DEFAULT_MODEL_NAME: &str = "new_model";

/// Loads `csv_path`, trains the flow network with default parameters and
/// writes it to `<model_name>.onnx`, printing epoch progress to stdout.
pub fn create_model(csv_path: &Path, model_name: &str) -> Result<PathBuf> {
  let mut progress = training::ConsoleProgress::stdout();
  let params = TrainParams::default();
  create_model_with(csv_path, model_name, &params, &mut progress).map(|(path, _)| path)
}

/// [`create_model`] with explicit parameters and progress reporting.
#[tracing::instrument(skip(params, observer))]
pub fn create_model_with(
  csv_path: &Path,
  model_name: &str,
  params: &TrainParams,
  observer: &mut dyn EpochObserver,
) -> Result<(PathBuf, TrainedModel)> {
  params.validate()?;
  let data = dataset::read_dataset(csv_path)?;
  let trained = training::run_model(data, params, observer)?;
  let path = onnx::export(&trained.network, model_name)?;
  info!(
    "Exported {} parameters to {:?}",
    trained.network.parameter_count(),
    path
  );
  Ok((path, trained))
}
