// Decode error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Decode error code constants
///
/// Error code range: 2001-2004
pub struct DecodeErrorCodes;

impl DecodeErrorCodes {
    /// Encoded bytes could not be parsed
    pub const MALFORMED: i32 = 2001;

    /// Container parsed but sample format is not supported
    pub const UNSUPPORTED_FORMAT: i32 = 2002;

    /// Nothing was captured
    pub const EMPTY: i32 = 2003;

    /// Decoded samples violate buffer invariants
    pub const INVALID_BUFFER: i32 = 2004;
}

/// Log a decode error with structured context
pub fn log_decode_error(err: &DecodeError, context: &str) {
    error!(
        "Decode error in {}: code={}, component=AudioDecoder, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Malformed or unsupported encoded audio
///
/// Extraction is skipped when decoding fails.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Bytes are not a readable container
    Malformed { reason: String },

    /// Sample format/bit depth not handled
    UnsupportedFormat { format: String },

    /// Zero bytes or zero frames
    Empty,

    /// Channel layout or sample rate invalid
    InvalidBuffer { reason: String },
}

impl ErrorCode for DecodeError {
    fn code(&self) -> i32 {
        match self {
            DecodeError::Malformed { .. } => DecodeErrorCodes::MALFORMED,
            DecodeError::UnsupportedFormat { .. } => DecodeErrorCodes::UNSUPPORTED_FORMAT,
            DecodeError::Empty => DecodeErrorCodes::EMPTY,
            DecodeError::InvalidBuffer { .. } => DecodeErrorCodes::INVALID_BUFFER,
        }
    }

    fn message(&self) -> String {
        match self {
            DecodeError::Malformed { reason } => format!("Malformed audio data: {}", reason),
            DecodeError::UnsupportedFormat { format } => {
                format!("Unsupported sample format: {}", format)
            }
            DecodeError::Empty => "No audio was captured".to_string(),
            DecodeError::InvalidBuffer { reason } => format!("Invalid audio buffer: {}", reason),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecodeError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DecodeError {}

impl From<hound::Error> for DecodeError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::Unsupported => DecodeError::UnsupportedFormat {
                format: "unsupported WAV layout".to_string(),
            },
            other => DecodeError::Malformed {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_codes() {
        assert_eq!(
            DecodeError::Malformed {
                reason: "x".to_string()
            }
            .code(),
            DecodeErrorCodes::MALFORMED
        );
        assert_eq!(
            DecodeError::UnsupportedFormat {
                format: "x".to_string()
            }
            .code(),
            DecodeErrorCodes::UNSUPPORTED_FORMAT
        );
        assert_eq!(DecodeError::Empty.code(), DecodeErrorCodes::EMPTY);
    }

    #[test]
    fn test_from_hound_unsupported() {
        let err: DecodeError = hound::Error::Unsupported.into();
        assert!(matches!(err, DecodeError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_from_hound_format_error() {
        let err: DecodeError = hound::Error::FormatError("no RIFF tag found").into();
        match err {
            DecodeError::Malformed { reason } => assert!(reason.contains("RIFF")),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }
}
