//! Convert speaker reference checkpoints into word-aligned JSON payloads.
//!
//! Raw codec token sequences are split across transcript words in proportion
//! to word length; structured checkpoints that already hold aligned words are
//! normalized and passed through.

pub mod alignment;
pub mod checkpoint;
pub mod config;
pub mod convert;
pub mod error;
pub mod payload;
pub mod transcript;
pub mod types;

pub use alignment::{align_codes, apportion, build_word_records};
pub use config::{ConversionRequest, ConvertConfig};
pub use convert::{convert, run_conversion};
pub use error::{ApportionmentError, ConvertError, InputError, Result};
pub use payload::{write_payload, PayloadPreview, SpeakerPayload};
