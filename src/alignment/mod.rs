//! Word-code alignment: splits a reference code sequence across transcript
//! words in proportion to each word's character length.

pub mod apportion;
pub mod segments;

#[cfg(test)]
mod tests;

pub use apportion::apportion;
pub use segments::{build_word_records, segment_duration};

use tracing::debug;

use crate::error::ApportionmentError;
use crate::types::{Code, WordRecord};

/// Apportionment weight of a token: its character length, at least 1.
pub fn word_weight(token: &str) -> usize {
    token.chars().count().max(1)
}

/// Assign a contiguous, non-empty run of `codes` to every token.
pub fn align_codes(
    codes: &[Code],
    tokens: &[String],
    frame_rate_hz: f64,
) -> Result<Vec<WordRecord>, ApportionmentError> {
    let weights: Vec<usize> = tokens.iter().map(|token| word_weight(token)).collect();
    let lengths = apportion(codes.len(), &weights)?;
    debug!(codes = codes.len(), words = tokens.len(), "apportioned codes");
    build_word_records(codes, tokens, &lengths, frame_rate_hz)
}
