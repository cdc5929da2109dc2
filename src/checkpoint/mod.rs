//! Speaker checkpoint loading
//!
//! A checkpoint is either structured (a mapping that already carries aligned
//! `words`) or a raw tensor/list of codec tokens that still needs aligning.

pub mod formats;
pub mod torch;
pub mod value;

use std::path::Path;

use tracing::info;

pub use value::{CheckpointValue, TensorData};

use crate::error::{ConvertError, Result};

/// On-disk container, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    Json,
    Npy,
    Torch,
}

impl CheckpointFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("npy") => Ok(Self::Npy),
            Some("pt") | Some("pth") => Ok(Self::Torch),
            _ => Err(ConvertError::input(format!(
                "unsupported checkpoint format {:?}; expected .pt, .pth, .npy or .json",
                path
            ))),
        }
    }
}

/// Classified checkpoint contents
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedCheckpoint {
    /// `CheckpointValue::Map` that contains a `words` entry
    Structured(CheckpointValue),
    /// Non-empty tensor or list of codec tokens
    Codes(CheckpointValue),
}

pub fn load_checkpoint(path: &Path) -> Result<LoadedCheckpoint> {
    let format = CheckpointFormat::from_path(path)?;
    info!(path = %path.display(), ?format, "loading speaker checkpoint");
    let value = match format {
        CheckpointFormat::Json => formats::read_json(path)?,
        CheckpointFormat::Npy => formats::read_npy_tensor(path)?,
        CheckpointFormat::Torch => torch::read_torch(path)?,
    };
    classify(value)
}

pub fn classify(value: CheckpointValue) -> Result<LoadedCheckpoint> {
    let empty = value.element_count() == 0;
    match value {
        CheckpointValue::Map(_) => {
            if value.get("words").is_some() {
                Ok(LoadedCheckpoint::Structured(value))
            } else {
                Err(ConvertError::input(
                    "Checkpoint does not contain required 'words' payload.",
                ))
            }
        }
        CheckpointValue::Tensor { .. } if empty => {
            Err(ConvertError::input("Speaker checkpoint tensor is empty."))
        }
        CheckpointValue::List(_) if empty => {
            Err(ConvertError::input("Speaker checkpoint list is empty."))
        }
        CheckpointValue::Tensor { .. } | CheckpointValue::List(_) => {
            Ok(LoadedCheckpoint::Codes(value))
        }
        other => Err(ConvertError::input(format!(
            "Unsupported checkpoint payload type '{}'.",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_follows_extension() {
        let cases = [
            ("dave.pt", CheckpointFormat::Torch),
            ("dave.PTH", CheckpointFormat::Torch),
            ("dave.npy", CheckpointFormat::Npy),
            ("dave.json", CheckpointFormat::Json),
        ];
        for (name, expected) in cases {
            assert_eq!(
                CheckpointFormat::from_path(&PathBuf::from(name)).unwrap(),
                expected
            );
        }
        assert!(CheckpointFormat::from_path(&PathBuf::from("dave.wav")).is_err());
        assert!(CheckpointFormat::from_path(&PathBuf::from("dave")).is_err());
    }

    #[test]
    fn mapping_requires_words() {
        let structured = CheckpointValue::Map(vec![
            ("version".into(), CheckpointValue::Str("0.2".into())),
            ("words".into(), CheckpointValue::List(vec![])),
        ]);
        assert!(matches!(
            classify(structured).unwrap(),
            LoadedCheckpoint::Structured(_)
        ));

        let missing = CheckpointValue::Map(vec![("codes".into(), CheckpointValue::List(vec![]))]);
        let err = classify(missing).unwrap_err();
        assert!(err.to_string().contains("'words'"));
    }

    #[test]
    fn empty_codes_are_rejected() {
        let tensor = CheckpointValue::Tensor {
            shape: vec![0],
            data: TensorData::Int(vec![]),
        };
        assert!(classify(tensor).unwrap_err().to_string().contains("tensor is empty"));
        let list = CheckpointValue::List(vec![]);
        assert!(classify(list).unwrap_err().to_string().contains("list is empty"));
    }

    #[test]
    fn scalars_are_unsupported() {
        let err = classify(CheckpointValue::Int(3)).unwrap_err();
        assert!(err.to_string().contains("'int'"));
    }

    #[test]
    fn lists_are_codes() {
        let list = CheckpointValue::List(vec![CheckpointValue::Int(1)]);
        assert_eq!(
            classify(list.clone()).unwrap(),
            LoadedCheckpoint::Codes(list)
        );
    }
}
