use std::path::Path;

use flownet::{model::Topology, training::TrainParams};
use serde::Deserialize;

/// Training settings read from a YAML file or the command line.
/// Also defines the config file format (every field can be omitted).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  pub epochs: Option<usize>,
  pub batch_size: Option<usize>,
  /// Trailing fraction of rows held out for validation
  pub validation_split: Option<f64>,
  pub learning_rate: Option<f32>,
  pub seed: Option<u64>,
  /// Whether to reshuffle training rows every epoch
  pub shuffle: Option<bool>,
  pub topology: Option<Topology>,
}

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, flownet::Error> {
    let text = std::fs::read_to_string(path).map_err(|source| flownet::Error::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(serde_yaml::from_str(&text)?)
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      epochs: other.epochs.or(self.epochs),
      batch_size: other.batch_size.or(self.batch_size),
      validation_split: other.validation_split.or(self.validation_split),
      learning_rate: other.learning_rate.or(self.learning_rate),
      seed: other.seed.or(self.seed),
      shuffle: other.shuffle.or(self.shuffle),
      topology: other.topology.or(self.topology),
    }
  }

  /// Applies the set fields on top of the default training parameters.
  pub fn into_params(self) -> TrainParams {
    let mut params = TrainParams::default();
    if let Some(epochs) = self.epochs {
      params.epochs = epochs;
    }
    if let Some(batch_size) = self.batch_size {
      params.batch_size = batch_size;
    }
    if let Some(validation_split) = self.validation_split {
      params.validation_split = validation_split;
    }
    if let Some(learning_rate) = self.learning_rate {
      params.optimizer.learning_rate = learning_rate;
    }
    if let Some(seed) = self.seed {
      params.seed = seed;
    }
    if let Some(shuffle) = self.shuffle {
      params.shuffle = shuffle;
    }
    if let Some(topology) = self.topology {
      params.topology = topology;
    }
    params
  }
}
