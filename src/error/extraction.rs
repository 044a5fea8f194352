// Extraction error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Extraction error code constants
///
/// Error code range: 3001-3004
pub struct ExtractionErrorCodes;

impl ExtractionErrorCodes {
    /// FFT input length is not a power of two
    pub const INVALID_WINDOW_LENGTH: i32 = 3001;

    /// Buffer contains NaN or infinite samples
    pub const NON_FINITE_SAMPLE: i32 = 3002;

    /// Offloaded pitch worker panicked
    pub const WORKER_PANICKED: i32 = 3003;

    /// Analysis parameters are inconsistent
    pub const INVALID_CONFIG: i32 = 3004;
}

/// Log an extraction error with structured context
pub fn log_extraction_error(err: &ExtractionError, context: &str) {
    error!(
        "Extraction error in {}: code={}, component=FeatureExtractor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Unexpected failures inside FFT, pitch or classification
///
/// Partial results are discarded; the session stays usable.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Window length unusable for the radix-2 transform
    InvalidWindowLength { length: usize },

    /// Sample at `index` is NaN or infinite
    NonFiniteSample { index: usize },

    /// A pitch worker thread panicked
    WorkerPanicked,

    /// Configuration rejected
    InvalidConfig { reason: String },
}

impl ErrorCode for ExtractionError {
    fn code(&self) -> i32 {
        match self {
            ExtractionError::InvalidWindowLength { .. } => {
                ExtractionErrorCodes::INVALID_WINDOW_LENGTH
            }
            ExtractionError::NonFiniteSample { .. } => ExtractionErrorCodes::NON_FINITE_SAMPLE,
            ExtractionError::WorkerPanicked => ExtractionErrorCodes::WORKER_PANICKED,
            ExtractionError::InvalidConfig { .. } => ExtractionErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            ExtractionError::InvalidWindowLength { length } => {
                format!("FFT window length must be a power of two (got {})", length)
            }
            ExtractionError::NonFiniteSample { index } => {
                format!("Non-finite sample at index {}", index)
            }
            ExtractionError::WorkerPanicked => "Pitch worker thread panicked".to_string(),
            ExtractionError::InvalidConfig { reason } => {
                format!("Invalid analysis configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtractionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ExtractionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_codes() {
        assert_eq!(
            ExtractionError::InvalidWindowLength { length: 1000 }.code(),
            ExtractionErrorCodes::INVALID_WINDOW_LENGTH
        );
        assert_eq!(
            ExtractionError::NonFiniteSample { index: 3 }.code(),
            ExtractionErrorCodes::NON_FINITE_SAMPLE
        );
        assert_eq!(
            ExtractionError::WorkerPanicked.code(),
            ExtractionErrorCodes::WORKER_PANICKED
        );
    }

    #[test]
    fn test_extraction_error_messages() {
        let err = ExtractionError::InvalidWindowLength { length: 1000 };
        assert_eq!(
            err.message(),
            "FFT window length must be a power of two (got 1000)"
        );

        let err = ExtractionError::NonFiniteSample { index: 7 };
        assert!(err.message().contains("index 7"));
    }
}
