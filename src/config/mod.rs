use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};

/// Codec tokens per second emitted by the reference audio tokenizer.
pub const DEFAULT_FRAME_RATE_HZ: f64 = 50.0;
/// Payload version written for raw-code conversions and assumed for
/// structured checkpoints that carry none.
pub const DEFAULT_PAYLOAD_VERSION: &str = "0.2";
/// Maximum number of transcript characters echoed into the metadata.
pub const DEFAULT_EXCERPT_CHARS: usize = 256;

/// Knobs shared by every conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    pub frame_rate_hz: f64,
    pub version: String,
    pub excerpt_chars: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            version: DEFAULT_PAYLOAD_VERSION.to_string(),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl ConvertConfig {
    pub fn with_frame_rate(mut self, frame_rate_hz: f64) -> Self {
        self.frame_rate_hz = frame_rate_hz;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frame_rate_hz.is_finite() && self.frame_rate_hz > 0.0,
            "frame rate must be a positive number of codes per second, got {}",
            self.frame_rate_hz
        );
        ensure!(
            !self.version.trim().is_empty(),
            "payload version must not be empty"
        );
        Ok(())
    }
}

/// Inputs and output location of a single conversion.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub checkpoint: PathBuf,
    pub transcript: Option<PathBuf>,
    pub speaker_id: Option<String>,
    pub output: Option<PathBuf>,
}

impl ConversionRequest {
    pub fn new(checkpoint: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint: checkpoint.into(),
            transcript: None,
            speaker_id: None,
            output: None,
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<PathBuf>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    pub fn with_speaker_id(mut self, speaker_id: impl Into<String>) -> Self {
        self.speaker_id = Some(speaker_id.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Explicit output path, or the checkpoint path with a `.json` extension.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.checkpoint))
    }
}

fn default_output_path(checkpoint: &Path) -> PathBuf {
    checkpoint.with_extension("json")
}
