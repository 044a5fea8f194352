// Playback error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Playback error code constants
///
/// Error code range: 4001-4005
pub struct PlaybackErrorCodes;

impl PlaybackErrorCodes {
    /// Result holds no notes and no percussion
    pub const NOTHING_TO_PLAY: i32 = 4001;

    /// Tempo must be > 0
    pub const INVALID_TEMPO: i32 = 4002;

    /// Synth backend rejected a trigger
    pub const BACKEND_FAILURE: i32 = 4003;

    /// No output device could be opened
    pub const OUTPUT_UNAVAILABLE: i32 = 4004;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 4005;
}

/// Log a playback error with structured context
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    error!(
        "Playback error in {}: code={}, component=PlaybackEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Synth or transport failures
///
/// Playback is stopped whenever one of these is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// No extraction result, or an empty one
    NothingToPlay,

    /// Tempo value is invalid
    InvalidTempo { bpm: u32 },

    /// Backend failed while triggering or starting the transport
    BackendFailure { reason: String },

    /// Output device unavailable
    OutputUnavailable { reason: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::NothingToPlay => PlaybackErrorCodes::NOTHING_TO_PLAY,
            PlaybackError::InvalidTempo { .. } => PlaybackErrorCodes::INVALID_TEMPO,
            PlaybackError::BackendFailure { .. } => PlaybackErrorCodes::BACKEND_FAILURE,
            PlaybackError::OutputUnavailable { .. } => PlaybackErrorCodes::OUTPUT_UNAVAILABLE,
            PlaybackError::LockPoisoned { .. } => PlaybackErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::NothingToPlay => {
                "No musical elements detected. Please try recording again.".to_string()
            }
            PlaybackError::InvalidTempo { bpm } => {
                format!("Tempo must be greater than 0 (got {})", bpm)
            }
            PlaybackError::BackendFailure { reason } => {
                format!("Synth backend failure: {}", reason)
            }
            PlaybackError::OutputUnavailable { reason } => {
                format!("Audio output unavailable: {}", reason)
            }
            PlaybackError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}
