pub mod network;

use burn::{
  backend::{Autodiff, NdArray},
  tensor::{activation, backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::{
  dataset::{INPUT_DIMENSION, OUTPUT_DIMENSION},
  error::{Error, Result},
};

pub use network::*;

/// Name of the graph in the exported artifact.
pub const MODEL_NAME: &str = "flow_prediction_nn";

/// Evaluation and export run on the CPU.
pub type CpuBackend = NdArray<f32>;
pub type TrainBackend = Autodiff<CpuBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
  Linear,
  Sigmoid,
  Relu,
}

impl Activation {
  pub fn apply<B: Backend, const D: usize>(self, x: Tensor<B, D>) -> Tensor<B, D> {
    match self {
      Activation::Linear => x,
      Activation::Sigmoid => activation::sigmoid(x),
      Activation::Relu => activation::relu(x),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
  /// `U(-l, l)` with `l = sqrt(6 / (fan_in + fan_out))`.
  #[default]
  GlorotUniform,
  /// `U(-l, l)` with `l = sqrt(6 / fan_in)`.
  HeUniform,
}

impl Initializer {
  pub fn limit(self, fan_in: usize, fan_out: usize) -> f32 {
    match self {
      Initializer::GlorotUniform => (6.0 / (fan_in + fan_out) as f32).sqrt(),
      Initializer::HeUniform => (6.0 / fan_in as f32).sqrt(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
  pub units: usize,
  pub activation: Activation,
  #[serde(default)]
  pub initializer: Initializer,
}

impl LayerSpec {
  pub const fn new(units: usize, activation: Activation, initializer: Initializer) -> Self {
    Self {
      units,
      activation,
      initializer,
    }
  }
}

/// Ordered description of a fully connected network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
  pub input_width: usize,
  pub layers: Vec<LayerSpec>,
}

impl Topology {
  /// The flow-rate network: three raw inputs, two regression outputs.
  pub fn flow_prediction() -> Self {
    use Activation::*;
    use Initializer::*;
    Topology {
      input_width: INPUT_DIMENSION,
      layers: vec![
        LayerSpec::new(300, Sigmoid, GlorotUniform),
        LayerSpec::new(100, Relu, HeUniform),
        LayerSpec::new(1000, Relu, HeUniform),
        LayerSpec::new(1000, Relu, HeUniform),
        LayerSpec::new(100, Relu, HeUniform),
        LayerSpec::new(OUTPUT_DIMENSION, Linear, GlorotUniform),
      ],
    }
  }

  pub fn output_width(&self) -> usize {
    self.layers.last().map(|l| l.units).unwrap_or(self.input_width)
  }

  /// `(fan_in, units)` of every layer.
  pub fn shapes(&self) -> Vec<(usize, usize)> {
    let mut fan_in = self.input_width;
    self
      .layers
      .iter()
      .map(|l| {
        let shape = (fan_in, l.units);
        fan_in = l.units;
        shape
      })
      .collect()
  }

  pub fn parameter_count(&self) -> usize {
    self.shapes().iter().map(|(i, o)| i * o + o).sum()
  }

  /// Checks that the topology maps the dataset's features onto its targets.
  pub fn validate(&self) -> Result<()> {
    if self.layers.is_empty() {
      return Err(Error::Topology("no layers".to_string()));
    }
    if let Some(i) = self.layers.iter().position(|l| l.units == 0) {
      return Err(Error::Topology(format!("layer {} has zero units", i + 1)));
    }
    if self.input_width != INPUT_DIMENSION {
      return Err(Error::Topology(format!(
        "input width is {}, expected {}",
        self.input_width, INPUT_DIMENSION
      )));
    }
    if self.output_width() != OUTPUT_DIMENSION {
      return Err(Error::Topology(format!(
        "output width is {}, expected {}",
        self.output_width(),
        OUTPUT_DIMENSION
      )));
    }
    Ok(())
  }
}

impl Default for Topology {
  fn default() -> Self {
    Self::flow_prediction()
  }
}
