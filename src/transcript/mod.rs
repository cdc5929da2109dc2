//! Transcript module - turns reference text into normalized word tokens
//!
//! Tokens are ASCII-folded, lowercased and stripped of apostrophes so that
//! "Don't" and "dont" weigh the same during alignment.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ConvertError, InputError, Result};
use crate::types::Transcript;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9']+").expect("valid regex"));

/// Split transcript text into lowercase word tokens.
pub fn tokenize(text: &str) -> std::result::Result<Vec<String>, InputError> {
    let folded: String = text.nfkd().filter(char::is_ascii).collect();
    let words: Vec<String> = WORD_RE
        .find_iter(&folded)
        .filter_map(|token| normalize_word(token.as_str()))
        .collect();

    if words.is_empty() {
        return Err(InputError::new(
            "Transcript does not contain any parsable word tokens.",
        ));
    }
    Ok(words)
}

/// Drop apostrophes and lowercase; `None` if nothing is left.
pub fn normalize_word(token: &str) -> Option<String> {
    let cleaned: String = token
        .chars()
        .filter(|&ch| ch != '\'')
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Read and tokenize a UTF-8 transcript file. `\r\n` and lone `\r` line
/// endings are read as `\n`.
pub fn load_transcript(path: &Path) -> Result<Transcript> {
    let text = fs::read_to_string(path).map_err(|err| ConvertError::io(path, err))?;
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let raw = text.trim().to_string();
    let tokens = tokenize(&raw)?;
    Ok(Transcript { raw, tokens })
}
