use crate::error::ApportionmentError;
use crate::types::{Code, WordRecord};

/// Slice `codes` into consecutive per-word records.
///
/// `lengths` must hold one entry per token and sum to `codes.len()`.
pub fn build_word_records(
    codes: &[Code],
    tokens: &[String],
    lengths: &[usize],
    frame_rate_hz: f64,
) -> Result<Vec<WordRecord>, ApportionmentError> {
    if tokens.len() != lengths.len() {
        return Err(ApportionmentError::LengthMismatch {
            words: tokens.len(),
            lengths: lengths.len(),
        });
    }
    let covered: usize = lengths.iter().sum();
    if covered != codes.len() {
        return Err(ApportionmentError::SumMismatch {
            expected: codes.len(),
            actual: covered,
        });
    }

    let mut offset = 0;
    let records = tokens
        .iter()
        .zip(lengths)
        .map(|(token, &count)| {
            let segment = codes[offset..offset + count].to_vec();
            offset += count;
            WordRecord {
                word: token.clone(),
                duration: segment_duration(count, frame_rate_hz),
                codes: segment,
            }
        })
        .collect();
    Ok(records)
}

/// Duration of `count` frames, never below one frame.
pub fn segment_duration(count: usize, frame_rate_hz: f64) -> f64 {
    let duration = round_centis(count as f64 / frame_rate_hz);
    if duration <= 0.0 {
        round_centis(1.0 / frame_rate_hz)
    } else {
        duration
    }
}

fn round_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}
