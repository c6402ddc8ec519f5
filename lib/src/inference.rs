//! Runs exported models through `tract-onnx`, independently of [`crate::model`].

use std::path::Path;

use tract_onnx::prelude::*;

use crate::{
  dataset::{INPUT_DIMENSION, OUTPUT_DIMENSION},
  error::{Error, Result},
};

fn inference_error<E: std::fmt::Debug>(stage: &str) -> impl Fn(E) -> Error + '_ {
  move |e| Error::Inference(format!("{stage}: {e:?}"))
}

/// An ONNX flow model specialized to a single `[1, 3]` f32 input row.
pub struct OnnxModel {
  plan: TypedRunnableModel<TypedModel>,
}

impl std::fmt::Debug for OnnxModel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OnnxModel")
      .field("input_shape", &[1, INPUT_DIMENSION])
      .finish()
  }
}

impl OnnxModel {
  #[tracing::instrument]
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(Error::io(
        path,
        std::io::Error::new(std::io::ErrorKind::NotFound, "model file not found"),
      ));
    }
    let plan = tract_onnx::onnx()
      .model_for_path(path)
      .map_err(inference_error("load"))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, INPUT_DIMENSION)),
      )
      .map_err(inference_error("input fact"))?
      .with_output_fact(0, InferenceFact::default())
      .map_err(inference_error("output fact"))?
      .into_optimized()
      .map_err(inference_error("optimize"))?
      .into_runnable()
      .map_err(inference_error("runnable"))?;
    Ok(Self { plan })
  }

  pub fn predict(&self, input: &[f32; INPUT_DIMENSION]) -> Result<[f32; OUTPUT_DIMENSION]> {
    let tensor = tract_ndarray::ArrayD::<f32>::from_shape_vec(
      tract_ndarray::IxDyn(&[1, INPUT_DIMENSION]),
      input.to_vec(),
    )
    .map_err(|e| Error::Inference(format!("input reshape: {e}")))?
    .into_tvalue();

    let outputs = self.plan.run(tvec!(tensor)).map_err(inference_error("run"))?;
    let output = outputs
      .first()
      .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(inference_error("output decode"))?;
    let values: Vec<f32> = view.iter().copied().collect();
    if values.len() != OUTPUT_DIMENSION {
      return Err(Error::Inference(format!(
        "expected {} outputs, got {}",
        OUTPUT_DIMENSION,
        values.len()
      )));
    }
    Ok([values[0], values[1]])
  }
}
