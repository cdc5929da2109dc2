//! Speaker payload: the JSON artifact consumed by the synthesis engine.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::Value;

use crate::error::{ConvertError, Result};
use crate::types::WordRecord;

/// Alignment strategy recorded in the metadata of raw-code conversions.
pub const PROPORTIONAL_STRATEGY: &str = "proportional-length";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerPayload {
    pub version: String,
    pub words: PayloadWords,
    /// A string for converted codes; echoed as-is from structured checkpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PayloadMetadata>,
}

/// Freshly aligned records, or words echoed from a structured checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadWords {
    Aligned(Vec<WordRecord>),
    Passthrough(Value),
}

impl PayloadWords {
    pub fn len(&self) -> usize {
        match self {
            Self::Aligned(records) => records.len(),
            Self::Passthrough(Value::Array(items)) => items.len(),
            Self::Passthrough(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_json(&self) -> Option<Value> {
        match self {
            Self::Aligned(records) => records
                .first()
                .and_then(|record| serde_json::to_value(record).ok()),
            Self::Passthrough(Value::Array(items)) => items.first().cloned(),
            Self::Passthrough(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadMetadata {
    Conversion(ConversionMetadata),
    Passthrough(Value),
}

/// Provenance of a raw-code conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionMetadata {
    pub source_pt: String,
    pub transcript: String,
    pub strategy: String,
    pub transcript_excerpt: String,
}

/// Short summary printed by `--preview`.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadPreview {
    pub version: String,
    pub words: usize,
    pub first_word: Option<Value>,
    pub output: String,
}

impl PayloadPreview {
    pub fn new(payload: &SpeakerPayload, output: &Path) -> Self {
        Self {
            version: payload.version.clone(),
            words: payload.words.len(),
            first_word: payload.words.first_json(),
            output: output.display().to_string(),
        }
    }
}

/// Pretty-printed JSON with two-space indentation and every non-ASCII
/// character written as a `\uXXXX` escape.
pub fn to_ascii_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, AsciiFormatter::new());
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|err| ConvertError::input(err.to_string()))
}

/// Write the payload, creating parent directories as needed.
pub fn write_payload(path: &Path, payload: &SpeakerPayload) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| ConvertError::io(parent, err))?;
    }
    let text = to_ascii_json(payload)?;
    fs::write(path, text).map_err(|err| ConvertError::io(path, err))
}

struct AsciiFormatter {
    pretty: PrettyFormatter<'static>,
}

impl AsciiFormatter {
    fn new() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..index].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
