pub mod proto;

use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use prost::Message;
use tracing::info;

pub use proto::*;

use crate::{
  error::{Error, Result},
  model::{Activation, Network, MODEL_NAME},
};

pub const IR_VERSION: i64 = 7;
pub const OPSET_VERSION: i64 = 13;
pub const PRODUCER_NAME: &str = env!("CARGO_PKG_NAME");
pub const INPUT_NAME: &str = "dense_input";

fn float_tensor(name: String, dims: Vec<i64>, data: &[f32]) -> TensorProto {
  TensorProto {
    dims,
    data_type: ELEM_TYPE_FLOAT,
    float_data: data.to_vec(),
    name,
  }
}

fn node(op_type: &str, name: String, input: Vec<String>, output: String) -> NodeProto {
  NodeProto {
    input,
    output: vec![output],
    name,
    op_type: op_type.to_string(),
    domain: String::new(),
  }
}

/// Describes `network` as an ONNX graph.
///
/// Layer `k` (1-based) becomes a `Gemm` over `dense_k/kernel` and
/// `dense_k/bias`, followed by a `Sigmoid` or `Relu` node unless it is linear.
/// Every layer's final tensor is named `dense_k`.
pub fn to_model_proto<B: Backend>(network: &Network<B>) -> Result<ModelProto> {
  let mut nodes = Vec::new();
  let mut initializer = Vec::new();
  let mut previous = INPUT_NAME.to_string();

  let weights = network.weights()?;
  for (i, (layer, spec)) in weights.iter().zip(&network.topology().layers).enumerate() {
    let name = format!("dense_{}", i + 1);
    let kernel = format!("{name}/kernel");
    let bias = format!("{name}/bias");
    initializer.push(float_tensor(
      kernel.clone(),
      vec![layer.fan_in as i64, layer.units as i64],
      &layer.kernel,
    ));
    initializer.push(float_tensor(bias.clone(), vec![layer.units as i64], &layer.bias));

    let activation_op = match spec.activation {
      Activation::Linear => None,
      Activation::Sigmoid => Some("Sigmoid"),
      Activation::Relu => Some("Relu"),
    };
    let gemm_out = match activation_op {
      Some(_) => format!("{name}/BiasAdd"),
      None => name.clone(),
    };
    nodes.push(node(
      "Gemm",
      format!("{name}/Gemm"),
      vec![previous, kernel, bias],
      gemm_out.clone(),
    ));
    if let Some(op) = activation_op {
      nodes.push(node(op, format!("{name}/{op}"), vec![gemm_out], name.clone()));
    }
    previous = name;
  }

  let graph = GraphProto {
    node: nodes,
    name: MODEL_NAME.to_string(),
    initializer,
    doc_string: String::new(),
    input: vec![ValueInfoProto {
      name: INPUT_NAME.to_string(),
      r#type: Some(TypeProto::float_tensor(&[None, Some(network.input_width() as i64)])),
    }],
    output: vec![ValueInfoProto {
      name: previous,
      r#type: Some(TypeProto::float_tensor(&[None, Some(network.output_width() as i64)])),
    }],
  };

  Ok(ModelProto {
    ir_version: IR_VERSION,
    producer_name: PRODUCER_NAME.to_string(),
    producer_version: env!("CARGO_PKG_VERSION").to_string(),
    domain: String::new(),
    model_version: 1,
    doc_string: String::new(),
    graph: Some(graph),
    opset_import: vec![OperatorSetIdProto {
      domain: String::new(),
      version: OPSET_VERSION,
    }],
  })
}

/// `<model_name>.onnx`, keeping any directories in `model_name`.
pub fn model_path(model_name: &str) -> PathBuf {
  PathBuf::from(format!("{model_name}.onnx"))
}

pub fn save_model(model: &ModelProto, path: &Path) -> Result<()> {
  std::fs::write(path, model.encode_to_vec()).map_err(|e| Error::io(path, e))
}

pub fn load_model(path: &Path) -> Result<ModelProto> {
  let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
  ModelProto::decode(bytes.as_slice()).map_err(|e| Error::Inference(format!("{path:?}: {e}")))
}

/// Writes `network` to `<model_name>.onnx` and returns the path written.
#[tracing::instrument(skip(network))]
pub fn export<B: Backend>(network: &Network<B>, model_name: &str) -> Result<PathBuf> {
  let path = model_path(model_name);
  let model = to_model_proto(network)?;
  save_model(&model, &path)?;
  info!("Saved model to {:?}", path);
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{CpuBackend, Initializer, LayerSpec, Topology};

  fn network() -> Network<CpuBackend> {
    let t = Topology {
      input_width: 3,
      layers: vec![
        LayerSpec::new(4, Activation::Sigmoid, Initializer::GlorotUniform),
        LayerSpec::new(5, Activation::Relu, Initializer::HeUniform),
        LayerSpec::new(2, Activation::Linear, Initializer::GlorotUniform),
      ],
    };
    Network::new(t, 5, &Default::default()).unwrap()
  }

  #[test]
  fn graph_layout() {
    let model = to_model_proto(&network()).unwrap();
    assert_eq!(model.ir_version, IR_VERSION);
    assert_eq!(model.opset_import[0].version, OPSET_VERSION);
    let graph = model.graph.unwrap();
    assert_eq!(graph.name, MODEL_NAME);

    let ops: Vec<_> = graph.node.iter().map(|n| n.op_type.as_str()).collect();
    assert_eq!(ops, vec!["Gemm", "Sigmoid", "Gemm", "Relu", "Gemm"]);
    assert_eq!(
      graph.node[0].input,
      vec!["dense_input", "dense_1/kernel", "dense_1/bias"]
    );
    assert_eq!(graph.node[1].output, vec!["dense_1"]);
    assert_eq!(graph.node[4].output, vec!["dense_3"]);

    let dims: Vec<_> = graph.initializer.iter().map(|t| t.dims.clone()).collect();
    assert_eq!(
      dims,
      vec![vec![3, 4], vec![4], vec![4, 5], vec![5], vec![5, 2], vec![2]]
    );

    assert_eq!(graph.input[0].name, INPUT_NAME);
    assert_eq!(
      graph.input[0].r#type.as_ref().unwrap().tensor_dims(),
      Some(vec![None, Some(3)])
    );
    assert_eq!(graph.output[0].name, "dense_3");
    assert_eq!(
      graph.output[0].r#type.as_ref().unwrap().tensor_dims(),
      Some(vec![None, Some(2)])
    );
  }

  #[test]
  fn initializers_carry_weights() {
    let net = network();
    let weights = net.weights().unwrap();
    let graph = to_model_proto(&net).unwrap().graph.unwrap();
    assert_eq!(graph.initializer[2].name, "dense_2/kernel");
    assert_eq!(graph.initializer[2].float_data, weights[1].kernel);
    assert_eq!(graph.initializer[5].float_data, weights[2].bias);
  }

  #[test]
  fn model_path_appends_extension() {
    assert_eq!(model_path("testing"), PathBuf::from("testing.onnx"));
    assert_eq!(model_path("out/new_model"), PathBuf::from("out/new_model.onnx"));
  }

  #[test]
  fn saved_file_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("decoded");
    let net = network();
    let path = export(&net, name.to_str().unwrap()).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    assert_eq!(load_model(&path).unwrap(), to_model_proto(&net).unwrap());
  }

  #[test]
  fn unwritable_destination_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let name = dir.path().join("missing").join("model");
    let err = export(&network(), name.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }
}
