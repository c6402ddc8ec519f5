pub mod adam;
pub mod loss;

use std::io::{self, Stdout, Write};

use burn::{
  backend::ndarray::NdArrayDevice,
  optim::{GradientsParams, Optimizer},
  tensor::{backend::Backend, ElementConversion},
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use adam::*;
pub use loss::*;

use crate::{
  dataset::Dataset,
  error::{Error, Result},
  model::{rows_to_tensor, CpuBackend, Mlp, Network, Topology, TrainBackend},
};

pub const DEFAULT_EPOCHS: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
  pub epochs: usize,
  pub batch_size: usize,
  /// Trailing fraction of the rows held out for validation, taken before shuffling.
  pub validation_split: f64,
  /// Reshuffle the training rows at the start of every epoch.
  pub shuffle: bool,
  /// Seeds both weight initialization and shuffling.
  pub seed: u64,
  pub optimizer: AdamConfig,
  pub topology: Topology,
}

impl Default for TrainParams {
  fn default() -> Self {
    Self {
      epochs: DEFAULT_EPOCHS,
      batch_size: DEFAULT_BATCH_SIZE,
      validation_split: DEFAULT_VALIDATION_SPLIT,
      shuffle: true,
      seed: DEFAULT_SEED,
      optimizer: AdamConfig::default(),
      topology: Topology::flow_prediction(),
    }
  }
}

impl TrainParams {
  pub fn validate(&self) -> Result<()> {
    if self.epochs == 0 {
      return Err(Error::Params("epochs must be positive".to_string()));
    }
    if self.batch_size == 0 {
      return Err(Error::Params("batch_size must be positive".to_string()));
    }
    if !(0.0..1.0).contains(&self.validation_split) {
      return Err(Error::Params(format!(
        "validation_split must be in [0, 1), got {}",
        self.validation_split
      )));
    }
    if self.optimizer.learning_rate.is_nan() || self.optimizer.learning_rate <= 0.0 {
      return Err(Error::Params("learning_rate must be positive".to_string()));
    }
    self.topology.validate()
  }
}

/// Per-epoch losses. `val_loss` stays empty when nothing was held out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
  pub loss: Vec<f32>,
  pub val_loss: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
  /// 1-based.
  pub epoch: usize,
  pub epochs: usize,
  pub loss: f32,
  pub val_loss: Option<f32>,
}

/// Training progress hook, called once per finished epoch.
pub trait EpochObserver {
  fn on_epoch_end(&mut self, stats: &EpochStats);

  fn on_train_end(&mut self, _history: &History) {}
}

/// Ignores progress.
pub struct Silent;

impl EpochObserver for Silent {
  fn on_epoch_end(&mut self, _stats: &EpochStats) {}
}

/// Keeps one console line up to date with the current epoch.
pub struct ConsoleProgress<W: Write> {
  out: W,
}

impl ConsoleProgress<Stdout> {
  pub fn stdout() -> Self {
    Self { out: io::stdout() }
  }
}

impl<W: Write> ConsoleProgress<W> {
  pub fn new(out: W) -> Self {
    Self { out }
  }

  pub fn into_inner(self) -> W {
    self.out
  }
}

impl<W: Write> EpochObserver for ConsoleProgress<W> {
  fn on_epoch_end(&mut self, stats: &EpochStats) {
    // best effort
    let _ = match stats.val_loss {
      Some(val_loss) => write!(
        self.out,
        "\rEpoch {}/{} - loss: {:.4} - val_loss: {:.4}",
        stats.epoch, stats.epochs, stats.loss, val_loss
      ),
      None => write!(
        self.out,
        "\rEpoch {}/{} - loss: {:.4}",
        stats.epoch, stats.epochs, stats.loss
      ),
    };
    let _ = self.out.flush();
  }

  fn on_train_end(&mut self, _history: &History) {
    let _ = writeln!(self.out);
  }
}

pub struct TrainedModel {
  pub network: Network<CpuBackend>,
  pub history: History,
}

/// Mean absolute error of `network` on `dataset`, evaluated `batch_size` rows at a time.
pub fn evaluate<B: Backend>(network: &Network<B>, dataset: &Dataset, batch_size: usize) -> f32 {
  if dataset.is_empty() {
    return 0.0;
  }
  let device = network.device();
  let mut total = 0f64;
  for (x, y) in dataset
    .features
    .chunks(batch_size.max(1))
    .zip(dataset.targets.chunks(batch_size.max(1)))
  {
    let prediction = network.forward(rows_to_tensor(x.iter().copied(), &device));
    let loss = mae_loss(prediction, rows_to_tensor(y.iter().copied(), &device));
    total += loss.into_scalar().elem::<f32>() as f64 * x.len() as f64;
  }
  (total / dataset.len() as f64) as f32
}

/// Builds a fresh network from `params.topology` and fits it to `data`.
#[tracing::instrument(skip_all, fields(rows = data.len(), epochs = params.epochs))]
pub fn run_model(
  data: Dataset,
  params: &TrainParams,
  observer: &mut dyn EpochObserver,
) -> Result<TrainedModel> {
  params.validate()?;
  let (train, validation) = data.split(params.validation_split)?;
  info!(
    "Training on {} rows, validating on {}",
    train.len(),
    validation.len()
  );

  let device = NdArrayDevice::default();
  let mut rng = StdRng::seed_from_u64(params.seed);
  let mut network = Network::<TrainBackend>::with_rng(params.topology.clone(), &mut rng, &device)?;
  let mut optimizer = params.optimizer.init::<TrainBackend, Mlp<TrainBackend>>();
  let learning_rate = params.optimizer.learning_rate as f64;
  let mut steps = 0usize;
  let mut history = History::default();
  let mut order: Vec<usize> = (0..train.len()).collect();

  let start = std::time::Instant::now();
  for epoch in 1..=params.epochs {
    if params.shuffle {
      order.shuffle(&mut rng);
    }

    let mut weighted_loss = 0f64;
    for rows in order.chunks(params.batch_size) {
      let x = rows_to_tensor(rows.iter().map(|&i| train.features[i]), &device);
      let y = rows_to_tensor(rows.iter().map(|&i| train.targets[i]), &device);

      let loss = mae_loss(network.forward(x), y);
      let grads = GradientsParams::from_grads(loss.backward(), &network.mlp);
      network.mlp = optimizer.step(learning_rate, network.mlp, grads);
      weighted_loss += loss.into_scalar().elem::<f32>() as f64 * rows.len() as f64;
      steps += 1;
    }

    let loss = (weighted_loss / train.len() as f64) as f32;
    let val_loss = (!validation.is_empty())
      .then(|| evaluate(&network.valid(), &validation, params.batch_size));
    if !loss.is_finite() || val_loss.is_some_and(|v| !v.is_finite()) {
      warn!(epoch, loss, ?val_loss, "non-finite loss");
    }
    debug!(epoch, loss, ?val_loss, "epoch finished");

    history.loss.push(loss);
    if let Some(v) = val_loss {
      history.val_loss.push(v);
    }
    observer.on_epoch_end(&EpochStats {
      epoch,
      epochs: params.epochs,
      loss,
      val_loss,
    });
  }
  observer.on_train_end(&history);

  info!(
    "Took {:.2}s, {}µs / step over {} steps",
    start.elapsed().as_secs_f32(),
    start.elapsed().as_micros() / steps.max(1) as u128,
    steps
  );
  Ok(TrainedModel {
    network: network.valid(),
    history,
  })
}
