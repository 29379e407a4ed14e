//! Error types for the core document model.
//!
//! Parsing knows exactly one fatal condition: the command switching units to
//! inches. Everything else recoverable is reported as a warning in the
//! parser's diagnostic stream and processing continues.

use thiserror::Error;

/// Errors raised while building the document model.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Inch-based input is unsupported; only millimeter-space math exists.
    #[error("line {line_no}: unsupported unit system G20 (inches) (text: '{text}')")]
    UnsupportedUnits {
        /// 1-based line number of the offending command.
        line_no: usize,
        /// Raw text of the offending line.
        text: String,
    },

    /// I/O error while reading a G-code source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_units_display() {
        let err = ParseError::UnsupportedUnits {
            line_no: 12,
            text: "G20".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "line 12: unsupported unit system G20 (inches) (text: 'G20')"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ParseError = io_err.into();
        assert!(matches!(err, ParseError::Io(_)));
    }
}
