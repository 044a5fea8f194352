use std::sync::Mutex;

use crate::error::PlaybackError;

use super::schedule::ScheduledEvent;

/// Sink for scheduled voice triggers.
///
/// The scheduler thread calls `begin` once per `play`, then `trigger` at
/// each event's transport time. `silence` cuts every sounding voice; it is
/// called on `stop` and must be idempotent.
pub trait SynthBackend: Send + Sync {
    fn begin(&self) -> Result<(), PlaybackError>;

    fn trigger(&self, event: &ScheduledEvent) -> Result<(), PlaybackError>;

    fn silence(&self);
}

#[derive(Debug, Default)]
struct Recorded {
    begins: usize,
    silences: usize,
    events: Vec<ScheduledEvent>,
}

/// Backend that only records what it was asked to do.
///
/// Tests inspect the triggered events; a failure can be injected after a
/// number of successful triggers.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    state: Mutex<Recorded>,
    fail_after: Option<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every trigger after the first `triggers` succeed
    pub fn failing_after(triggers: usize) -> Self {
        Self {
            state: Mutex::new(Recorded::default()),
            fail_after: Some(triggers),
        }
    }

    pub fn events(&self) -> Vec<ScheduledEvent> {
        self.lock().events.clone()
    }

    pub fn begin_count(&self) -> usize {
        self.lock().begins
    }

    pub fn silence_count(&self) -> usize {
        self.lock().silences
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SynthBackend for RecordingBackend {
    fn begin(&self) -> Result<(), PlaybackError> {
        self.lock().begins += 1;
        Ok(())
    }

    fn trigger(&self, event: &ScheduledEvent) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        if let Some(limit) = self.fail_after {
            if state.events.len() >= limit {
                return Err(PlaybackError::BackendFailure {
                    reason: format!("trigger rejected after {} events", limit),
                });
            }
        }
        state.events.push(*event);
        Ok(())
    }

    fn silence(&self) {
        self.lock().silences += 1;
    }
}
