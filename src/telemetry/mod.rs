//! Telemetry collector and helpers.
//!
//! Each engine owns one collector. Events land in a bounded history (for
//! CLI snapshots) and are fanned out over a tokio broadcast channel to any
//! live subscribers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use crate::analysis::types::{AudioBuffer, DetectionResult};
use crate::engine::session::SessionState;
use crate::error::ErrorCode;

pub mod events;

pub use events::{ErrorSource, MetricEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity: history_capacity.max(1),
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            // A panic while holding the lock leaves the history intact
            let mut history = self.history.lock().unwrap_or_else(|p| p.into_inner());
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history.lock().unwrap_or_else(|p| p.into_inner());
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    pub fn record_state_change(&self, from: SessionState, to: SessionState) {
        self.publish(MetricEvent::SessionState {
            from,
            to,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_capture(&self, buffer: &AudioBuffer) {
        self.publish(MetricEvent::Capture {
            frames: buffer.len(),
            channels: buffer.channel_count(),
            sample_rate: buffer.sample_rate(),
        });
    }

    pub fn record_extraction(&self, samples: usize, result: &DetectionResult, elapsed_ms: u64) {
        self.publish(MetricEvent::Extraction {
            samples,
            notes: result.notes.len(),
            percussion: result.percussion.len(),
            elapsed_ms,
        });
    }

    pub fn record_playback_started(&self, events: usize, tempo_bpm: u32, length_seconds: f32) {
        self.publish(MetricEvent::PlaybackStarted {
            events,
            tempo_bpm,
            length_seconds,
        });
    }

    pub fn record_playback_stopped(&self) {
        self.publish(MetricEvent::PlaybackStopped {
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_error(&self, source: ErrorSource, err: &dyn ErrorCode, context: impl Into<String>) {
        self.publish(MetricEvent::Error {
            source,
            code: err.code(),
            context: context.into(),
        });
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
