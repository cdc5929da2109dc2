use std::fs;
use std::path::Path;

use ndarray::ArrayD;
use ndarray_npy::{read_npy, ReadableElement};

use super::value::{CheckpointValue, TensorData};
use crate::error::{ConvertError, Result};

/// Parse a JSON checkpoint (structured mapping or raw code array).
pub fn read_json(path: &Path) -> Result<CheckpointValue> {
    let text = fs::read_to_string(path).map_err(|err| ConvertError::io(path, err))?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
        ConvertError::input(format!(
            "failed to parse checkpoint JSON {}: {err}",
            path.display()
        ))
    })?;
    Ok(CheckpointValue::from_json(value))
}

/// Read a NumPy array of any integer or float dtype.
pub fn read_npy_tensor(path: &Path) -> Result<CheckpointValue> {
    let first_error = match read_npy::<_, ArrayD<i64>>(path) {
        Ok(array) => {
            return Ok(CheckpointValue::Tensor {
                shape: array.shape().to_vec(),
                data: TensorData::Int(array.iter().copied().collect()),
            })
        }
        Err(err) => err,
    };

    let tensor = read_int_array::<i32>(path)
        .or_else(|| read_int_array::<u64>(path))
        .or_else(|| read_int_array::<u32>(path))
        .or_else(|| read_int_array::<i16>(path))
        .or_else(|| read_int_array::<u16>(path))
        .or_else(|| read_int_array::<i8>(path))
        .or_else(|| read_int_array::<u8>(path))
        .or_else(|| read_float_array::<f64>(path).map(Ok))
        .or_else(|| read_float_array::<f32>(path).map(Ok));

    tensor.unwrap_or_else(|| {
        Err(ConvertError::input(format!(
            "failed to read NumPy checkpoint {}: {first_error}",
            path.display()
        )))
    })
}

/// `None` when the file holds another dtype.
fn read_int_array<A>(path: &Path) -> Option<Result<CheckpointValue>>
where
    A: ReadableElement + Copy + TryInto<i64> + std::fmt::Display,
{
    let array = read_npy::<_, ArrayD<A>>(path).ok()?;
    let values = array
        .iter()
        .map(|&value| {
            TryInto::<i64>::try_into(value).map_err(|_| {
                ConvertError::input(format!(
                    "NumPy checkpoint {} holds {value}, which does not fit a codec token",
                    path.display()
                ))
            })
        })
        .collect::<Result<Vec<i64>>>();
    Some(values.map(|values| CheckpointValue::Tensor {
        shape: array.shape().to_vec(),
        data: TensorData::Int(values),
    }))
}

fn read_float_array<A>(path: &Path) -> Option<CheckpointValue>
where
    A: ReadableElement + Copy + Into<f64>,
{
    let array = read_npy::<_, ArrayD<A>>(path).ok()?;
    Some(CheckpointValue::Tensor {
        shape: array.shape().to_vec(),
        data: TensorData::Float(array.iter().map(|&value| value.into()).collect()),
    })
}
