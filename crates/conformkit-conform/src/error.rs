//! Error types for the conforming transforms.

use thiserror::Error;

/// Errors raised while loading surface samples.
#[derive(Error, Debug)]
pub enum ConformError {
    /// A surface sample line was not a decimal "X Y Z" triple.
    #[error("line {line_no}: malformed surface sample (text: '{text}')")]
    MalformedSample {
        /// 1-based line number within the sample source.
        line_no: usize,
        /// Raw text of the offending line.
        text: String,
    },

    /// I/O error while reading or writing surface samples.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for conforming operations.
pub type Result<T> = std::result::Result<T, ConformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_sample_display() {
        let err = ConformError::MalformedSample {
            line_no: 3,
            text: "1.0 two 3.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "line 3: malformed surface sample (text: '1.0 two 3.0')"
        );
    }
}
