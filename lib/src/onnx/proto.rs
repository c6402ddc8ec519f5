//! The subset of `onnx.proto` needed to describe a dense network.
//!
//! Field tags follow the upstream schema so any ONNX reader can decode the
//! result; fields this crate never writes are simply absent.

/// `TensorProto.DataType.FLOAT`
pub const ELEM_TYPE_FLOAT: i32 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModelProto {
  #[prost(int64, tag = "1")]
  pub ir_version: i64,
  #[prost(string, tag = "2")]
  pub producer_name: String,
  #[prost(string, tag = "3")]
  pub producer_version: String,
  #[prost(string, tag = "4")]
  pub domain: String,
  #[prost(int64, tag = "5")]
  pub model_version: i64,
  #[prost(string, tag = "6")]
  pub doc_string: String,
  #[prost(message, optional, tag = "7")]
  pub graph: Option<GraphProto>,
  #[prost(message, repeated, tag = "8")]
  pub opset_import: Vec<OperatorSetIdProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OperatorSetIdProto {
  #[prost(string, tag = "1")]
  pub domain: String,
  #[prost(int64, tag = "2")]
  pub version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphProto {
  #[prost(message, repeated, tag = "1")]
  pub node: Vec<NodeProto>,
  #[prost(string, tag = "2")]
  pub name: String,
  #[prost(message, repeated, tag = "5")]
  pub initializer: Vec<TensorProto>,
  #[prost(string, tag = "10")]
  pub doc_string: String,
  #[prost(message, repeated, tag = "11")]
  pub input: Vec<ValueInfoProto>,
  #[prost(message, repeated, tag = "12")]
  pub output: Vec<ValueInfoProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeProto {
  #[prost(string, repeated, tag = "1")]
  pub input: Vec<String>,
  #[prost(string, repeated, tag = "2")]
  pub output: Vec<String>,
  #[prost(string, tag = "3")]
  pub name: String,
  #[prost(string, tag = "4")]
  pub op_type: String,
  #[prost(string, tag = "7")]
  pub domain: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorProto {
  #[prost(int64, repeated, tag = "1")]
  pub dims: Vec<i64>,
  #[prost(int32, tag = "2")]
  pub data_type: i32,
  #[prost(float, repeated, tag = "4")]
  pub float_data: Vec<f32>,
  #[prost(string, tag = "8")]
  pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValueInfoProto {
  #[prost(string, tag = "1")]
  pub name: String,
  #[prost(message, optional, tag = "2")]
  pub r#type: Option<TypeProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeProto {
  #[prost(oneof = "type_proto::Value", tags = "1")]
  pub value: Option<type_proto::Value>,
}

pub mod type_proto {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Tensor {
    #[prost(int32, tag = "1")]
    pub elem_type: i32,
    #[prost(message, optional, tag = "2")]
    pub shape: Option<super::TensorShapeProto>,
  }

  #[derive(Clone, PartialEq, ::prost::Oneof)]
  pub enum Value {
    #[prost(message, tag = "1")]
    TensorType(Tensor),
  }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorShapeProto {
  #[prost(message, repeated, tag = "1")]
  pub dim: Vec<tensor_shape_proto::Dimension>,
}

pub mod tensor_shape_proto {
  #[derive(Clone, PartialEq, ::prost::Message)]
  pub struct Dimension {
    #[prost(oneof = "dimension::Value", tags = "1, 2")]
    pub value: Option<dimension::Value>,
  }

  pub mod dimension {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
      #[prost(int64, tag = "1")]
      DimValue(i64),
      #[prost(string, tag = "2")]
      DimParam(String),
    }
  }
}

impl TypeProto {
  /// A float tensor type; `None` dims become the symbolic batch dimension `N`.
  pub fn float_tensor(dims: &[Option<i64>]) -> Self {
    use tensor_shape_proto::{dimension::Value, Dimension};
    let dim = dims
      .iter()
      .map(|d| Dimension {
        value: Some(match d {
          Some(n) => Value::DimValue(*n),
          None => Value::DimParam("N".to_string()),
        }),
      })
      .collect();
    TypeProto {
      value: Some(type_proto::Value::TensorType(type_proto::Tensor {
        elem_type: ELEM_TYPE_FLOAT,
        shape: Some(TensorShapeProto { dim }),
      })),
    }
  }

  /// Dimensions of a tensor type, `None` for symbolic ones.
  pub fn tensor_dims(&self) -> Option<Vec<Option<i64>>> {
    use tensor_shape_proto::dimension::Value;
    let type_proto::Value::TensorType(tensor) = self.value.as_ref()?;
    let shape = tensor.shape.as_ref()?;
    Some(
      shape
        .dim
        .iter()
        .map(|d| match &d.value {
          Some(Value::DimValue(n)) => Some(*n),
          _ => None,
        })
        .collect(),
    )
  }
}
