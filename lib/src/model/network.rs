use burn::{
  module::{AutodiffModule, Module, Param},
  nn::{Linear, LinearConfig},
  tensor::{
    backend::{AutodiffBackend, Backend},
    Distribution, Tensor, TensorData,
  },
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::debug;

use super::Topology;
use crate::{
  dataset::{InputsVec, OutputsVec, INPUT_DIMENSION, OUTPUT_DIMENSION},
  error::{Error, Result},
};

/// The trainable part of a [`Network`]: one `Linear` per layer.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
  pub layers: Vec<Linear<B>>,
}

/// Kernel and bias of one layer, copied out of the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerWeights {
  pub fan_in: usize,
  pub units: usize,
  /// Row-major `[fan_in, units]`.
  pub kernel: Vec<f32>,
  pub bias: Vec<f32>,
}

/// A stack of dense layers built from a [`Topology`].
///
/// The topology is fixed at construction; training only rewrites the layers'
/// kernels and biases.
#[derive(Debug, Clone)]
pub struct Network<B: Backend> {
  topology: Topology,
  pub mlp: Mlp<B>,
}

pub(crate) fn tensor_error<E: std::fmt::Debug>(e: E) -> Error {
  Error::Tensor(format!("{e:?}"))
}

/// Packs fixed-width rows into a `[rows, N]` tensor.
pub fn rows_to_tensor<B: Backend, const N: usize>(
  rows: impl IntoIterator<Item = [f32; N]>,
  device: &B::Device,
) -> Tensor<B, 2> {
  let values: Vec<f32> = rows.into_iter().flatten().collect();
  let count = values.len() / N;
  Tensor::from_data(TensorData::new(values, [count, N]), device)
}

fn dense<B: Backend>(
  fan_in: usize,
  units: usize,
  limit: f32,
  rng: &mut StdRng,
  device: &B::Device,
) -> Linear<B> {
  let kernel = TensorData::random::<f32, _, _>(
    [fan_in, units],
    Distribution::Uniform(-limit as f64, limit as f64),
    rng,
  );
  let mut linear = LinearConfig::new(fan_in, units).init(device);
  linear.weight = Param::from_tensor(Tensor::from_data(kernel, device));
  linear.bias = Some(Param::from_tensor(Tensor::zeros([units], device)));
  linear
}

impl<B: Backend> Network<B> {
  pub fn new(topology: Topology, seed: u64, device: &B::Device) -> Result<Self> {
    let mut rng = StdRng::seed_from_u64(seed);
    Self::with_rng(topology, &mut rng, device)
  }

  /// Samples every kernel from `rng`; biases start at zero.
  pub fn with_rng(topology: Topology, rng: &mut StdRng, device: &B::Device) -> Result<Self> {
    topology.validate()?;
    let layers: Vec<Linear<B>> = topology
      .shapes()
      .into_iter()
      .zip(topology.layers.iter())
      .map(|((fan_in, units), spec)| {
        dense(fan_in, units, spec.initializer.limit(fan_in, units), rng, device)
      })
      .collect();
    debug!(
      layers = layers.len(),
      parameters = topology.parameter_count(),
      "initialized network"
    );
    Ok(Network {
      topology,
      mlp: Mlp { layers },
    })
  }

  pub fn topology(&self) -> &Topology {
    &self.topology
  }

  pub fn input_width(&self) -> usize {
    self.topology.input_width
  }

  pub fn output_width(&self) -> usize {
    self.topology.output_width()
  }

  /// `[batch, input_width]` in, `[batch, output_width]` out.
  pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
    self
      .mlp
      .layers
      .iter()
      .zip(&self.topology.layers)
      .fold(input, |x, (linear, spec)| spec.activation.apply(linear.forward(x)))
  }

  pub fn predict(&self, input: &[f32; INPUT_DIMENSION]) -> Result<[f32; OUTPUT_DIMENSION]> {
    let mut rows = self.predict_batch(&vec![*input])?;
    rows
      .pop()
      .ok_or_else(|| Error::Tensor("empty prediction".to_string()))
  }

  pub fn predict_batch(&self, inputs: &InputsVec) -> Result<OutputsVec> {
    if inputs.is_empty() {
      return Ok(Vec::new());
    }
    let device = self.device();
    let output = self.forward(rows_to_tensor(inputs.iter().copied(), &device));
    let values = output.into_data().to_vec::<f32>().map_err(tensor_error)?;
    Ok(
      values
        .chunks_exact(OUTPUT_DIMENSION)
        .map(|c| [c[0], c[1]])
        .collect(),
    )
  }

  /// Copies every layer's parameters out of the backend, in layer order.
  pub fn weights(&self) -> Result<Vec<LayerWeights>> {
    self
      .mlp
      .layers
      .iter()
      .map(|linear| {
        let kernel = linear.weight.val();
        let [fan_in, units] = kernel.dims();
        let kernel = kernel.into_data().to_vec::<f32>().map_err(tensor_error)?;
        let bias = match &linear.bias {
          Some(bias) => bias.val().into_data().to_vec::<f32>().map_err(tensor_error)?,
          None => vec![0.0; units],
        };
        Ok(LayerWeights {
          fan_in,
          units,
          kernel,
          bias,
        })
      })
      .collect()
  }

  pub fn parameter_count(&self) -> usize {
    self.mlp.num_params()
  }

  pub fn device(&self) -> B::Device {
    self
      .mlp
      .devices()
      .into_iter()
      .next()
      .unwrap_or_default()
  }
}

impl<B: AutodiffBackend> Network<B> {
  /// Drops the autodiff graph, for evaluation and export.
  pub fn valid(&self) -> Network<B::InnerBackend> {
    Network {
      topology: self.topology.clone(),
      mlp: self.mlp.valid(),
    }
  }
}
