// Recording session error types and constants

use crate::error::{DecodeError, DeviceAccessError, ErrorCode, ExtractionError};
use log::error;
use std::fmt;

/// Session error code constants
///
/// Error code range: 5001-5002. Wrapped errors keep their own codes.
pub struct SessionErrorCodes;

impl SessionErrorCodes {
    /// A recording is already active
    pub const ALREADY_RECORDING: i32 = 5001;

    /// stop() called without an active recording
    pub const NOT_RECORDING: i32 = 5002;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=RecordingSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by the recording session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Recording already in progress
    AlreadyRecording,

    /// No recording to stop
    NotRecording,

    /// Capture device could not be acquired or failed
    Device(DeviceAccessError),

    /// Captured bytes could not be decoded
    Decode(DecodeError),

    /// Analysis failed on the decoded buffer
    Extraction(ExtractionError),
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::AlreadyRecording => SessionErrorCodes::ALREADY_RECORDING,
            SessionError::NotRecording => SessionErrorCodes::NOT_RECORDING,
            SessionError::Device(err) => err.code(),
            SessionError::Decode(err) => err.code(),
            SessionError::Extraction(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::AlreadyRecording => {
                "Recording already in progress. Call stop() first.".to_string()
            }
            SessionError::NotRecording => {
                "No recording in progress. Call start() first.".to_string()
            }
            SessionError::Device(err) => err.message(),
            SessionError::Decode(err) => err.message(),
            SessionError::Extraction(err) => err.message(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Device(err) => Some(err),
            SessionError::Decode(err) => Some(err),
            SessionError::Extraction(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceAccessError> for SessionError {
    fn from(err: DeviceAccessError) -> Self {
        SessionError::Device(err)
    }
}

impl From<DecodeError> for SessionError {
    fn from(err: DecodeError) -> Self {
        SessionError::Decode(err)
    }
}

impl From<ExtractionError> for SessionError {
    fn from(err: ExtractionError) -> Self {
        SessionError::Extraction(err)
    }
}
