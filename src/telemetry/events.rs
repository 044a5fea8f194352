//! Telemetry event types published by the session, extractor and playback
//! engine.

use serde::{Deserialize, Serialize};

use crate::engine::session::SessionState;

/// Which stage reported an error event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Capture,
    Decode,
    Extraction,
    Playback,
}

/// Metric events covering session lifecycle, analysis and playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    SessionState {
        from: SessionState,
        to: SessionState,
        timestamp_ms: u64,
    },
    Capture {
        frames: usize,
        channels: usize,
        sample_rate: u32,
    },
    Extraction {
        samples: usize,
        notes: usize,
        percussion: usize,
        elapsed_ms: u64,
    },
    PlaybackStarted {
        events: usize,
        tempo_bpm: u32,
        length_seconds: f32,
    },
    PlaybackStopped {
        timestamp_ms: u64,
    },
    Error {
        source: ErrorSource,
        code: i32,
        context: String,
    },
}
