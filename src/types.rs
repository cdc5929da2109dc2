//! Core types for the speaker conversion pipeline

use serde::Serialize;

/// A single audio codec token id.
pub type Code = i64;

/// Per-word slice of the reference codes, as written to the speaker payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordRecord {
    pub word: String,
    pub duration: f64, // seconds, rounded to 2 decimals
    pub codes: Vec<Code>,
}

/// Transcript matching the reference audio
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Raw text with surrounding whitespace trimmed
    pub raw: String,
    /// Normalized word tokens, never empty
    pub tokens: Vec<String>,
}

impl Transcript {
    /// First `max_chars` characters of the raw text on a single line.
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.raw
            .chars()
            .take(max_chars)
            .collect::<String>()
            .replace('\n', " ")
    }
}
