use anyhow::{bail, Context, Result};
use clap::Parser;
use speaker2json::config::DEFAULT_FRAME_RATE_HZ;
use speaker2json::payload::to_ascii_json;
use speaker2json::{run_conversion, ConversionRequest, ConvertConfig, PayloadPreview};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// speaker2json - Speaker checkpoint to JSON converter
///
/// Turns a speaker reference checkpoint into a word-aligned JSON payload.
/// Raw codec token tensors are split across the words of a matching
/// transcript; checkpoints that already hold aligned words are passed through.
#[derive(Parser, Debug)]
#[command(name = "speaker2json")]
#[command(about = "Convert speaker checkpoints into word-aligned JSON", long_about = None)]
struct Args {
    /// Speaker checkpoint (.pt, .pth, .npy or .json)
    #[arg(value_name = "CHECKPOINT")]
    checkpoint: PathBuf,

    /// Output JSON path (defaults to the checkpoint path with a .json extension)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Transcript of the reference audio; required for raw code tensors
    #[arg(short, long, value_name = "PATH")]
    transcript: Option<PathBuf>,

    /// Speaker identifier to embed in the payload
    #[arg(long)]
    speaker_id: Option<String>,

    /// Payload version to emit when converting raw codes
    #[arg(long = "version", value_name = "VERSION", default_value = "0.2")]
    payload_version: String,

    /// Codec tokens per second of reference audio
    #[arg(long, value_name = "HZ", default_value_t = DEFAULT_FRAME_RATE_HZ)]
    frame_rate: f64,

    /// Print a short summary of the converted payload to stdout
    #[arg(long)]
    preview: bool,
}

impl Args {
    /// Validate CLI arguments
    fn validate(&self) -> Result<()> {
        if !self.checkpoint.exists() {
            bail!("Checkpoint not found: {:?}", self.checkpoint);
        }
        if !self.checkpoint.is_file() {
            bail!("Checkpoint path is not a file: {:?}", self.checkpoint);
        }

        if let Some(transcript) = &self.transcript {
            if !transcript.is_file() {
                bail!("Transcript not found: {:?}", transcript);
            }
        }

        if self.request().output_path() == self.checkpoint {
            bail!(
                "Output path {:?} would overwrite the checkpoint; pass --output",
                self.checkpoint
            );
        }

        Ok(())
    }

    fn config(&self) -> Result<ConvertConfig> {
        let config = ConvertConfig::default()
            .with_frame_rate(self.frame_rate)
            .with_version(self.payload_version.clone());
        config.validate()?;
        Ok(config)
    }

    fn request(&self) -> ConversionRequest {
        ConversionRequest {
            checkpoint: self.checkpoint.clone(),
            transcript: self.transcript.clone(),
            speaker_id: self.speaker_id.clone(),
            output: self.output.clone(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    args.validate()
        .context("Failed to validate command-line arguments")?;
    let config = args.config().context("Invalid conversion settings")?;
    let request = args.request();
    let output = request.output_path();

    info!(checkpoint = ?request.checkpoint, output = ?output, "converting speaker checkpoint");
    let payload = run_conversion(&request, &config)
        .with_context(|| format!("Failed to convert {:?}", request.checkpoint))?;

    if args.preview {
        let preview = PayloadPreview::new(&payload, &output);
        println!("{}", to_ascii_json(&preview)?);
    }

    Ok(())
}
