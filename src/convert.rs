//! Conversion pipeline: checkpoint + transcript -> speaker payload.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::alignment::align_codes;
use crate::checkpoint::{load_checkpoint, CheckpointValue, LoadedCheckpoint};
use crate::config::{ConversionRequest, ConvertConfig, DEFAULT_PAYLOAD_VERSION};
use crate::error::{ConvertError, Result};
use crate::payload::{
    write_payload, ConversionMetadata, PayloadMetadata, PayloadWords, SpeakerPayload,
    PROPORTIONAL_STRATEGY,
};
use crate::transcript::load_transcript;
use crate::types::{Code, Transcript};

/// Load, align and write one speaker checkpoint. Returns the payload written.
pub fn run_conversion(request: &ConversionRequest, config: &ConvertConfig) -> Result<SpeakerPayload> {
    let payload = convert(request, config)?;
    let output = request.output_path();
    write_payload(&output, &payload)?;
    info!(output = %output.display(), words = payload.words.len(), "wrote speaker payload");
    Ok(payload)
}

/// Build the payload for `request` without touching the output path.
pub fn convert(request: &ConversionRequest, config: &ConvertConfig) -> Result<SpeakerPayload> {
    match load_checkpoint(&request.checkpoint)? {
        LoadedCheckpoint::Structured(checkpoint) => {
            info!("checkpoint already carries aligned words; skipping apportionment");
            let mut payload = normalize_structured(&checkpoint);
            if let Some(speaker_id) = &request.speaker_id {
                payload.speaker_id = Some(Value::String(speaker_id.clone()));
            }
            Ok(payload)
        }
        LoadedCheckpoint::Codes(raw) => {
            let transcript_path = request.transcript.as_deref().ok_or_else(|| {
                ConvertError::input(
                    "Checkpoint contains raw codes. Provide --transcript to map codes to words.",
                )
            })?;
            let transcript = load_transcript(transcript_path)?;
            let codes = raw.flatten_codes()?;
            info!(
                codes = codes.len(),
                words = transcript.tokens.len(),
                "aligning codes to transcript words"
            );
            convert_codes(request, transcript_path, &transcript, &codes, config)
        }
    }
}

fn convert_codes(
    request: &ConversionRequest,
    transcript_path: &Path,
    transcript: &Transcript,
    codes: &[Code],
    config: &ConvertConfig,
) -> Result<SpeakerPayload> {
    let records = align_codes(codes, &transcript.tokens, config.frame_rate_hz)?;
    let speaker_id = request
        .speaker_id
        .clone()
        .unwrap_or_else(|| file_stem(transcript_path));
    let metadata = ConversionMetadata {
        source_pt: file_name(&request.checkpoint),
        transcript: file_name(transcript_path),
        strategy: PROPORTIONAL_STRATEGY.to_string(),
        transcript_excerpt: transcript.excerpt(config.excerpt_chars),
    };

    Ok(SpeakerPayload {
        version: config.version.clone(),
        words: PayloadWords::Aligned(records),
        speaker_id: Some(Value::String(speaker_id)),
        metadata: Some(PayloadMetadata::Conversion(metadata)),
    })
}

/// Echo the pre-aligned fields of a structured checkpoint as plain JSON.
/// Only `version` is coerced to a string.
pub fn normalize_structured(checkpoint: &CheckpointValue) -> SpeakerPayload {
    let version = checkpoint
        .get("version")
        .map(display_string)
        .unwrap_or_else(|| DEFAULT_PAYLOAD_VERSION.to_string());
    let words = checkpoint
        .get("words")
        .map(CheckpointValue::to_json)
        .unwrap_or(Value::Null);

    SpeakerPayload {
        version,
        words: PayloadWords::Passthrough(words),
        speaker_id: checkpoint.get("speaker_id").map(CheckpointValue::to_json),
        metadata: checkpoint
            .get("metadata")
            .map(|value| PayloadMetadata::Passthrough(value.to_json())),
    }
}

fn display_string(value: &CheckpointValue) -> String {
    match value {
        CheckpointValue::Str(text) => text.clone(),
        other => other.to_json().to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::TensorData;
    use serde_json::json;

    #[test]
    fn structured_version_defaults_and_stringifies() {
        let checkpoint = CheckpointValue::Map(vec![("words".into(), CheckpointValue::List(vec![]))]);
        assert_eq!(normalize_structured(&checkpoint).version, "0.2");

        let checkpoint = CheckpointValue::Map(vec![
            ("version".into(), CheckpointValue::Float(0.3)),
            ("words".into(), CheckpointValue::List(vec![])),
        ]);
        assert_eq!(normalize_structured(&checkpoint).version, "0.3");
    }

    #[test]
    fn structured_words_are_normalized() {
        let checkpoint = CheckpointValue::Map(vec![
            (
                "words".into(),
                CheckpointValue::List(vec![CheckpointValue::Map(vec![
                    ("word".into(), CheckpointValue::Str("hi".into())),
                    ("duration".into(), CheckpointValue::Float(f64::NAN)),
                    (
                        "codes".into(),
                        CheckpointValue::Tensor {
                            shape: vec![3],
                            data: TensorData::Int(vec![7, 8, 9]),
                        },
                    ),
                ])]),
            ),
            ("speaker_id".into(), CheckpointValue::Str("dave".into())),
        ]);

        let payload = normalize_structured(&checkpoint);
        assert_eq!(
            payload.words,
            PayloadWords::Passthrough(json!([{"word": "hi", "duration": 0.0, "codes": [7, 8, 9]}]))
        );
        assert_eq!(payload.speaker_id, Some(json!("dave")));
        assert!(payload.metadata.is_none());
    }

    #[test]
    fn structured_speaker_id_keeps_its_json_type() {
        let with_id = |id: CheckpointValue| {
            CheckpointValue::Map(vec![
                ("words".into(), CheckpointValue::List(vec![])),
                ("speaker_id".into(), id),
            ])
        };

        let payload = normalize_structured(&with_id(CheckpointValue::Null));
        assert_eq!(payload.speaker_id, Some(Value::Null));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"version": "0.2", "words": [], "speaker_id": null})
        );

        let payload = normalize_structured(&with_id(CheckpointValue::Int(7)));
        assert_eq!(payload.speaker_id, Some(json!(7)));

        let payload = normalize_structured(&with_id(CheckpointValue::Tensor {
            shape: vec![],
            data: TensorData::Int(vec![12]),
        }));
        assert_eq!(payload.speaker_id, Some(json!(12)));
    }

    #[test]
    fn file_helpers_use_last_component() {
        let path = Path::new("/data/voices/dave.txt");
        assert_eq!(file_name(path), "dave.txt");
        assert_eq!(file_stem(path), "dave");
    }
}
