use burn::{
  module::AutodiffModule,
  optim::{self, Optimizer},
  tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

/// Adam hyperparameters; defaults match Keras (`epsilon` is 1e-7, not burn's 1e-5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
  pub learning_rate: f32,
  pub beta_1: f32,
  pub beta_2: f32,
  pub epsilon: f32,
}

impl Default for AdamConfig {
  fn default() -> Self {
    Self {
      learning_rate: 1e-3,
      beta_1: 0.9,
      beta_2: 0.999,
      epsilon: 1e-7,
    }
  }
}

impl AdamConfig {
  pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> impl Optimizer<M, B> {
    optim::AdamConfig::new()
      .with_beta_1(self.beta_1)
      .with_beta_2(self.beta_2)
      .with_epsilon(self.epsilon)
      .init::<B, M>()
  }
}
