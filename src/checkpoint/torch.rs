//! PyTorch `torch.save` archives
//!
//! A `.pt` file is a zip holding `<dir>/data.pkl` plus one raw storage file
//! per tensor under `<dir>/data/`. The pickle is decoded with candle's
//! `Stack` and walked into a `CheckpointValue`, so a bare tensor, a list of
//! codes and a dict carrying aligned `words` all load the same way.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use candle_core::pickle::{Object, Stack, TensorInfo};
use candle_core::{DType, Device, Tensor};
use tracing::debug;
use zip::ZipArchive;

use super::value::{CheckpointValue, TensorData};
use crate::error::{ConvertError, Result};

/// Read a `torch.save` archive into a value tree.
pub fn read_torch(path: &Path) -> Result<CheckpointValue> {
    let file = File::open(path).map_err(|err| ConvertError::io(path, err))?;
    let archive = ZipArchive::new(BufReader::new(file)).map_err(|err| torch_error(path, err))?;
    let mut reader = TorchArchive::open(path, archive)?;
    let root = reader.unpickle()?;
    reader.value(root)
}

struct TorchArchive<'a, R> {
    path: &'a Path,
    archive: ZipArchive<R>,
    pickle_name: String,
    data_dir: PathBuf,
}

impl<'a, R: Read + Seek> TorchArchive<'a, R> {
    fn open(path: &'a Path, archive: ZipArchive<R>) -> Result<Self> {
        let pickle_name = archive
            .file_names()
            .find(|name| name.ends_with("data.pkl"))
            .map(str::to_owned)
            .ok_or_else(|| {
                ConvertError::input(format!(
                    "PyTorch checkpoint {} has no data.pkl entry",
                    path.display()
                ))
            })?;
        let data_dir = PathBuf::from(pickle_name.trim_end_matches(".pkl"));
        Ok(Self {
            path,
            archive,
            pickle_name,
            data_dir,
        })
    }

    fn unpickle(&mut self) -> Result<Object> {
        let entry = self
            .archive
            .by_name(&self.pickle_name)
            .map_err(|err| torch_error(self.path, err))?;
        let mut stack = Stack::empty();
        stack
            .read_loop(&mut BufReader::new(entry))
            .map_err(|err| torch_error(self.path, err))?;
        stack.finalize().map_err(|err| torch_error(self.path, err))
    }

    fn value(&mut self, object: Object) -> Result<CheckpointValue> {
        match object {
            Object::None => Ok(CheckpointValue::Null),
            Object::Bool(flag) => Ok(CheckpointValue::Bool(flag)),
            Object::Int(int) => Ok(CheckpointValue::Int(int.into())),
            Object::Float(float) => Ok(CheckpointValue::Float(float)),
            Object::Unicode(text) => Ok(CheckpointValue::Str(text)),
            Object::List(items) | Object::Tuple(items) => items
                .into_iter()
                .map(|item| self.value(item))
                .collect::<Result<Vec<_>>>()
                .map(CheckpointValue::List),
            Object::Dict(pairs) => self.mapping(pairs),
            Object::Reduce { .. } => self.tensor(object),
            other => Err(self.unsupported(&other)),
        }
    }

    fn mapping(&mut self, pairs: Vec<(Object, Object)>) -> Result<CheckpointValue> {
        let mut entries = Vec::with_capacity(pairs.len());
        // candle collects SETITEMS pairs last-first
        for (key, value) in pairs.into_iter().rev() {
            let key = match key {
                Object::Unicode(text) => text,
                Object::Int(int) => int.to_string(),
                other => {
                    return Err(ConvertError::input(format!(
                        "PyTorch checkpoint {} has a non-string dict key {}",
                        self.path.display(),
                        describe(&other)
                    )))
                }
            };
            entries.push((key, self.value(value)?));
        }
        Ok(CheckpointValue::Map(entries))
    }

    fn tensor(&mut self, object: Object) -> Result<CheckpointValue> {
        let kind = describe(&object);
        let info = object
            .into_tensor_info(Object::Unicode(String::new()), &self.data_dir)
            .map_err(|err| torch_error(self.path, err))?
            .ok_or_else(|| {
                ConvertError::input(format!(
                    "Unsupported object {kind} in PyTorch checkpoint {}",
                    self.path.display()
                ))
            })?;
        let tensor = self.load_storage(&info)?;
        tensor_value(&tensor).map_err(|err| torch_error(self.path, err))
    }

    fn load_storage(&mut self, info: &TensorInfo) -> Result<Tensor> {
        let layout = &info.layout;
        let contiguous = layout.is_contiguous();
        let fortran = !contiguous && layout.dims().len() > 1 && layout.is_fortran_contiguous();
        if !contiguous && !fortran {
            return Err(ConvertError::input(format!(
                "PyTorch checkpoint {} holds a non-contiguous tensor {:?}",
                self.path.display(),
                layout.dims()
            )));
        }

        let mut bytes = Vec::new();
        self.archive
            .by_name(&info.path)
            .map_err(|err| torch_error(self.path, err))?
            .read_to_end(&mut bytes)
            .map_err(|err| ConvertError::io(self.path, err))?;

        let width = info.dtype.size_in_bytes();
        let start = layout.start_offset() * width;
        let end = start + layout.shape().elem_count() * width;
        let data = bytes.get(start..end).ok_or_else(|| {
            ConvertError::input(format!(
                "tensor storage {} in {} is shorter than its shape {:?}",
                info.path,
                self.path.display(),
                layout.dims()
            ))
        })?;
        debug!(storage = %info.path, dtype = ?info.dtype, dims = ?layout.dims(), "read tensor storage");

        let build = || -> candle_core::Result<Tensor> {
            if fortran {
                let reversed: Vec<usize> = layout.dims().iter().rev().copied().collect();
                let axes: Vec<usize> = (0..reversed.len()).rev().collect();
                Tensor::from_raw_buffer(data, info.dtype, &reversed, &Device::Cpu)?
                    .permute(axes)?
                    .contiguous()
            } else {
                Tensor::from_raw_buffer(data, info.dtype, layout.dims(), &Device::Cpu)
            }
        };
        build().map_err(|err| torch_error(self.path, err))
    }

    fn unsupported(&self, object: &Object) -> ConvertError {
        ConvertError::input(format!(
            "Unsupported object {} in PyTorch checkpoint {}",
            describe(object),
            self.path.display()
        ))
    }
}

/// Tensor contents as a value, keeping integer dtypes integral.
fn tensor_value(tensor: &Tensor) -> candle_core::Result<CheckpointValue> {
    let shape = tensor.dims().to_vec();
    let flat = tensor.flatten_all()?;
    let data = if tensor.dtype().is_float() {
        TensorData::Float(flat.to_dtype(DType::F64)?.to_vec1::<f64>()?)
    } else {
        TensorData::Int(flat.to_dtype(DType::I64)?.to_vec1::<i64>()?)
    };
    Ok(CheckpointValue::Tensor { shape, data })
}

fn describe(object: &Object) -> String {
    match object {
        Object::Class {
            module_name,
            class_name,
        } => format!("'{module_name}.{class_name}'"),
        Object::Reduce { callable, .. } | Object::Build { callable, .. } => describe(callable),
        Object::PersistentLoad(_) => "'persistent storage'".to_string(),
        Object::Mark => "'mark'".to_string(),
        Object::None => "'None'".to_string(),
        Object::Bool(_) => "'bool'".to_string(),
        Object::Int(_) => "'int'".to_string(),
        Object::Float(_) => "'float'".to_string(),
        Object::Unicode(_) => "'str'".to_string(),
        Object::Tuple(_) => "'tuple'".to_string(),
        Object::List(_) => "'list'".to_string(),
        Object::Dict(_) => "'dict'".to_string(),
    }
}

fn torch_error(path: &Path, err: impl std::fmt::Display) -> ConvertError {
    ConvertError::input(format!(
        "failed to read PyTorch checkpoint {}: {err}",
        path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn bare_tensor_is_read_with_its_shape() {
        let value = read_torch(&fixture("bare_codes.pt")).unwrap();
        assert_eq!(
            value,
            CheckpointValue::Tensor {
                shape: vec![1, 10],
                data: TensorData::Int((100..110).collect()),
            }
        );
    }

    #[test]
    fn state_dict_stays_a_mapping() {
        let value = read_torch(&fixture("state_dict.pt")).unwrap();
        assert_eq!(
            value,
            CheckpointValue::Map(vec![(
                "codes".into(),
                CheckpointValue::Tensor {
                    shape: vec![6],
                    data: TensorData::Int(vec![10, 11, 12, 13, 14, 15]),
                }
            )])
        );
    }

    #[test]
    fn structured_archive_keeps_key_order_and_offsets() {
        let value = read_torch(&fixture("structured.pt")).unwrap();
        let CheckpointValue::Map(entries) = &value else {
            panic!("expected a mapping, got {value:?}");
        };
        let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["version", "speaker_id", "words", "metadata"]);

        let words = value.get("words").unwrap().to_json();
        assert_eq!(words[1]["word"], "world");
        assert_eq!(words[1]["codes"], serde_json::json!([6, 7, 8, 9, 10]));
        assert_eq!(value.get("metadata").unwrap().get("gain").unwrap().to_json(), 0.5);
    }

    #[test]
    fn garbage_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pt");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(matches!(read_torch(&path), Err(ConvertError::Input(_))));
    }

    #[test]
    fn describes_reduced_classes_by_name() {
        let object = Object::Reduce {
            callable: Box::new(Object::Class {
                module_name: "numpy".into(),
                class_name: "ndarray".into(),
            }),
            args: Box::new(Object::Tuple(vec![])),
        };
        assert_eq!(describe(&object), "'numpy.ndarray'");
    }
}
