// Error types for the hum-to-music pipeline
//
// This module defines one error enum per stage of the pipeline (capture,
// decode, extraction, playback) plus the session-level error that wraps them.
// Every error carries a stable numeric code for programmatic handling.

mod decode;
mod device;
mod extraction;
mod playback;
mod session;

pub use decode::{log_decode_error, DecodeError, DecodeErrorCodes};
pub use device::{log_device_error, DeviceAccessError, DeviceErrorCodes};
pub use extraction::{log_extraction_error, ExtractionError, ExtractionErrorCodes};
pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and library callers.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
