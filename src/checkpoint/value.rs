use serde_json::{Map, Number, Value};

use crate::error::InputError;
use crate::types::Code;

/// Flat, row-major tensor storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(values) => values.len(),
            Self::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scalar_json(&self, index: usize) -> Value {
        match self {
            Self::Int(values) => Value::from(values[index]),
            Self::Float(values) => float_json(values[index]),
        }
    }
}

/// Loosely typed checkpoint contents, before JSON normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<CheckpointValue>),
    Map(Vec<(String, CheckpointValue)>),
    Tensor { shape: Vec<usize>, data: TensorData },
}

impl CheckpointValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => Self::Float(number.as_f64().unwrap_or(0.0)),
            },
            Value::String(text) => Self::Str(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, inner)| (key, Self::from_json(inner)))
                    .collect(),
            ),
        }
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Tensor { .. } => "tensor",
        }
    }

    /// Looks up a key of a `Map` value.
    pub fn get(&self, key: &str) -> Option<&CheckpointValue> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Number of scalar leaves in a tensor or (nested) list.
    pub fn element_count(&self) -> usize {
        match self {
            Self::Tensor { data, .. } => data.len(),
            Self::List(items) => items.iter().map(Self::element_count).sum(),
            Self::Map(_) => 0,
            _ => 1,
        }
    }

    /// JSON form: tensors become nested arrays (0-d tensors become scalars)
    /// and NaN or infinite floats become `0.0`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Int(int) => Value::from(*int),
            Self::Float(float) => float_json(*float),
            Self::Str(text) => Value::String(text.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => {
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json());
                }
                Value::Object(object)
            }
            Self::Tensor { shape, data } => nest(shape, data, 0),
        }
    }

    /// Flattens a tensor or nested list into codec token ids.
    pub fn flatten_codes(&self) -> Result<Vec<Code>, InputError> {
        let mut codes = Vec::with_capacity(self.element_count());
        self.collect_codes(&mut codes)?;
        Ok(codes)
    }

    fn collect_codes(&self, codes: &mut Vec<Code>) -> Result<(), InputError> {
        match self {
            Self::Int(int) => codes.push(int_code(*int)?),
            Self::Float(float) => codes.push(float_code(*float)?),
            Self::List(items) => {
                for item in items {
                    item.collect_codes(codes)?;
                }
            }
            Self::Tensor {
                data: TensorData::Int(values),
                ..
            } => {
                for &value in values {
                    codes.push(int_code(value)?);
                }
            }
            Self::Tensor {
                data: TensorData::Float(values),
                ..
            } => {
                for &value in values {
                    codes.push(float_code(value)?);
                }
            }
            other => {
                return Err(InputError::new(format!(
                    "Unable to flatten codes of type '{}'.",
                    other.kind()
                )))
            }
        }
        Ok(())
    }
}

fn nest(shape: &[usize], data: &TensorData, offset: usize) -> Value {
    match shape.split_first() {
        None => data.scalar_json(offset),
        Some((&dim, rest)) => {
            let stride: usize = rest.iter().product();
            Value::Array(
                (0..dim)
                    .map(|index| nest(rest, data, offset + index * stride))
                    .collect(),
            )
        }
    }
}

fn float_json(value: f64) -> Value {
    let finite = if value.is_finite() { value } else { 0.0 };
    Number::from_f64(finite).map_or(Value::Null, Value::Number)
}

fn int_code(value: i64) -> Result<Code, InputError> {
    if value < 0 {
        return Err(InputError::new(format!(
            "codec tokens must be non-negative, found {value}"
        )));
    }
    Ok(value)
}

fn float_code(value: f64) -> Result<Code, InputError> {
    if !value.is_finite() {
        return Err(InputError::new(format!(
            "codec tokens must be finite numbers, found {value}"
        )));
    }
    int_code(value.trunc() as i64)
}
