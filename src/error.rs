//! Error types shared by the conversion pipeline.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Convenient alias for results returned by library modules.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Rejected user input: unreadable or malformed checkpoints, missing
/// transcripts, transcripts without any usable words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    message: Arc<str>,
}

impl InputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for InputError {}

/// Failures of the code-to-word apportionment. None of these are recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApportionmentError {
    /// The code sequence was empty.
    NoCodes,
    /// The word weight list was empty.
    NoWeights,
    /// Every weight was zero.
    ZeroWeightSum { words: usize },
    /// More words than codes: some word would receive zero codes.
    Infeasible { words: usize, codes: usize },
    /// A segment ended up with a non-positive length.
    NonPositiveSegment { index: usize, count: i64 },
    /// Segment lengths do not add up to the code count.
    SumMismatch { expected: usize, actual: usize },
    /// Segment lengths and word tokens differ in number.
    LengthMismatch { words: usize, lengths: usize },
}

impl Display for ApportionmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCodes => write!(f, "no codes to distribute"),
            Self::NoWeights => write!(f, "transcript token list is empty"),
            Self::ZeroWeightSum { words } => {
                write!(f, "weights of all {words} transcript tokens are zero")
            }
            Self::Infeasible { words, codes } => write!(
                f,
                "cannot assign at least one code to each of {words} words with only {codes} codes"
            ),
            Self::NonPositiveSegment { index, count } => write!(
                f,
                "code distribution gave word {index} a non-positive segment length ({count})"
            ),
            Self::SumMismatch { expected, actual } => write!(
                f,
                "segment lengths sum to {actual}, expected {expected} codes"
            ),
            Self::LengthMismatch { words, lengths } => write!(
                f,
                "{lengths} segment lengths supplied for {words} words"
            ),
        }
    }
}

impl Error for ApportionmentError {}

/// Top-level error for a conversion run.
#[derive(Debug)]
pub enum ConvertError {
    Input(InputError),
    Apportionment(ApportionmentError),
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
}

impl ConvertError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(InputError::new(message))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input(err) => write!(f, "invalid input: {err}"),
            Self::Apportionment(err) => write!(f, "apportionment failed: {err}"),
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
            Self::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl Error for ConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(err) => Some(err),
            Self::Apportionment(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<InputError> for ConvertError {
    fn from(err: InputError) -> Self {
        Self::Input(err)
    }
}

impl From<ApportionmentError> for ConvertError {
    fn from(err: ApportionmentError) -> Self {
        Self::Apportionment(err)
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_message_names_counts() {
        let err = ConvertError::from(ApportionmentError::Infeasible { words: 5, codes: 3 });
        let text = err.to_string();
        assert!(text.contains("5 words"), "{text}");
        assert!(text.contains("3 codes"), "{text}");
    }

    #[test]
    fn input_error_keeps_message() {
        let err = ConvertError::input("Speaker checkpoint tensor is empty.");
        assert!(matches!(&err, ConvertError::Input(inner) if inner.message().contains("empty")));
        assert!(err.source().is_some());
    }
}
