use burn::tensor::{backend::Backend, Tensor};

/// Mean absolute error over every element of a `[batch, outputs]` pair.
///
/// Differentiable when `B` is an autodiff backend. NaN in either input stays
/// NaN in the loss and in its gradient.
pub fn mae_loss<B: Backend>(prediction: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
  prediction.sub(target).abs().mean()
}

#[cfg(test)]
mod tests {
  use burn::tensor::{ElementConversion, TensorData};
  use proptest::prelude::*;

  use super::*;
  use crate::model::CpuBackend;

  fn tensor(values: &[f32], cols: usize) -> Tensor<CpuBackend, 2> {
    let data = TensorData::new(values.to_vec(), [values.len() / cols, cols]);
    Tensor::from_data(data, &Default::default())
  }

  fn loss(prediction: &[f32], target: &[f32]) -> f32 {
    mae_loss(tensor(prediction, 2), tensor(target, 2))
      .into_scalar()
      .elem::<f32>()
  }

  #[test]
  fn loss_is_mean_of_absolute_errors() {
    let l = loss(&[1.0, 2.0, 3.0, 4.0], &[0.0, 2.0, 5.0, 4.5]);
    assert!((l - (1.0 + 0.0 + 2.0 + 0.5) / 4.0).abs() < 1e-7);
  }

  #[test]
  fn nan_prediction_gives_nan_loss() {
    assert!(loss(&[f32::NAN, 1.0], &[0.0, 0.0]).is_nan());
  }

  proptest! {
    #[test]
    fn loss_is_the_mean_offset(
      pairs in prop::collection::vec((-1e3f32..1e3, 0.01f32..10.0), 1..32)
    ) {
      let prediction: Vec<f32> = pairs.iter().flat_map(|(p, _)| [*p, -*p]).collect();
      let target: Vec<f32> = pairs.iter().flat_map(|(p, d)| [p + d, -p - d]).collect();
      let expected = pairs.iter().map(|(_, d)| *d as f64).sum::<f64>() / pairs.len() as f64;
      let l = loss(&prediction, &target) as f64;
      prop_assert!((l - expected).abs() < 1e-3 * (1.0 + expected));
    }
  }
}
