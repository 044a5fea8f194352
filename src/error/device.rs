// Capture device error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Capture device error code constants
///
/// Error code range: 1001-1006
pub struct DeviceErrorCodes;

impl DeviceErrorCodes {
    /// Microphone permission denied
    pub const PERMISSION_DENIED: i32 = 1001;

    /// No input device available on this host
    pub const NO_INPUT_DEVICE: i32 = 1002;

    /// Another stream already holds the capture device
    pub const DEVICE_BUSY: i32 = 1003;

    /// Failed to open the capture stream
    pub const STREAM_OPEN_FAILED: i32 = 1004;

    /// Capture stream failed or its channel closed unexpectedly
    pub const STREAM_FAILURE: i32 = 1005;

    /// Operation requires an open device
    pub const NOT_OPEN: i32 = 1006;
}

/// Log a capture device error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_device_error(err: &DeviceAccessError, context: &str) {
    error!(
        "Device error in {}: code={}, component=CaptureDevice, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Microphone permission or hardware failures
///
/// Reported to the caller; the recording is aborted and the session state
/// is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAccessError {
    /// Microphone permission denied
    PermissionDenied,

    /// No input device available
    NoInputDevice,

    /// Capture device already claimed by another stream
    DeviceBusy,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Stream broke while capturing
    StreamFailure { reason: String },

    /// Device must be opened first
    NotOpen,
}

impl ErrorCode for DeviceAccessError {
    fn code(&self) -> i32 {
        match self {
            DeviceAccessError::PermissionDenied => DeviceErrorCodes::PERMISSION_DENIED,
            DeviceAccessError::NoInputDevice => DeviceErrorCodes::NO_INPUT_DEVICE,
            DeviceAccessError::DeviceBusy => DeviceErrorCodes::DEVICE_BUSY,
            DeviceAccessError::StreamOpenFailed { .. } => DeviceErrorCodes::STREAM_OPEN_FAILED,
            DeviceAccessError::StreamFailure { .. } => DeviceErrorCodes::STREAM_FAILURE,
            DeviceAccessError::NotOpen => DeviceErrorCodes::NOT_OPEN,
        }
    }

    fn message(&self) -> String {
        match self {
            DeviceAccessError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            DeviceAccessError::NoInputDevice => "No default input device found".to_string(),
            DeviceAccessError::DeviceBusy => {
                "Capture device is already in use by another recording".to_string()
            }
            DeviceAccessError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            DeviceAccessError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            DeviceAccessError::NotOpen => {
                "Capture device not open. Call open() first.".to_string()
            }
        }
    }
}

impl fmt::Display for DeviceAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeviceAccessError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DeviceAccessError {}

impl From<std::io::Error> for DeviceAccessError {
    fn from(err: std::io::Error) -> Self {
        DeviceAccessError::StreamFailure {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_codes() {
        assert_eq!(
            DeviceAccessError::PermissionDenied.code(),
            DeviceErrorCodes::PERMISSION_DENIED
        );
        assert_eq!(
            DeviceAccessError::NoInputDevice.code(),
            DeviceErrorCodes::NO_INPUT_DEVICE
        );
        assert_eq!(DeviceAccessError::DeviceBusy.code(), DeviceErrorCodes::DEVICE_BUSY);
        assert_eq!(
            DeviceAccessError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            DeviceErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(DeviceAccessError::NotOpen.code(), 1006);
    }

    #[test]
    fn test_device_error_messages() {
        let err = DeviceAccessError::PermissionDenied;
        assert!(err.message().contains("permission denied"));

        let err = DeviceAccessError::StreamOpenFailed {
            reason: "no config".to_string(),
        };
        assert_eq!(err.message(), "Failed to open audio stream: no config");
    }

    #[test]
    fn test_device_error_display() {
        let err = DeviceAccessError::DeviceBusy;
        let display = format!("{}", err);
        assert!(display.contains("DeviceAccessError"));
        assert!(display.contains("1003"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("pipe closed");
        let err: DeviceAccessError = io_err.into();
        match err {
            DeviceAccessError::StreamFailure { reason } => assert!(reason.contains("pipe closed")),
            _ => panic!("Expected StreamFailure"),
        }
    }
}
