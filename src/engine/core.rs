//! EngineHandle: caller-owned facade over one recording session and one
//! playback engine.
//!
//! The handle shares a single `TelemetryCollector` between both halves, so a
//! subscriber sees the whole hum → result → playback flow in order. It is
//! the entry point the CLI uses; library callers may also drive
//! `RecordingSession` and `PlaybackEngine` directly.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::analysis::types::DetectionResult;
use crate::config::AppConfig;
use crate::engine::backend::CaptureDevice;
use crate::engine::session::{RecordingSession, SessionState};
use crate::error::{log_playback_error, ExtractionError, PlaybackError, SessionError};
use crate::playback::{
    PlaybackConfig, PlaybackEngine, PlaybackSummary, SynthBackend, SystemClock, TransportClock,
};
use crate::telemetry::{ErrorSource, MetricEvent, TelemetryCollector, TelemetrySnapshot};

/// Recording session, playback engine and telemetry behind one handle
pub struct EngineHandle {
    config: AppConfig,
    session: RecordingSession,
    playback: PlaybackEngine,
    telemetry: Arc<TelemetryCollector>,
}

impl EngineHandle {
    /// Create a handle driven by the wall clock
    ///
    /// # Errors
    /// `ExtractionError::InvalidConfig`/`InvalidWindowLength` if `config`
    /// fails validation
    pub fn new(
        device: Box<dyn CaptureDevice>,
        backend: Arc<dyn SynthBackend>,
        config: AppConfig,
    ) -> Result<Self, ExtractionError> {
        Self::with_clock(device, backend, Arc::new(SystemClock::new()), config)
    }

    /// Create a handle with an explicit transport clock
    pub fn with_clock(
        device: Box<dyn CaptureDevice>,
        backend: Arc<dyn SynthBackend>,
        clock: Arc<dyn TransportClock>,
        config: AppConfig,
    ) -> Result<Self, ExtractionError> {
        let telemetry = Arc::new(TelemetryCollector::default());
        let session =
            RecordingSession::new(device, &config)?.with_telemetry(Arc::clone(&telemetry));
        let playback =
            PlaybackEngine::new(backend, clock).with_telemetry(Arc::clone(&telemetry));

        log::info!(
            "[EngineHandle] Ready (pitch window {}, percussion window {}, tempo {} BPM)",
            config.pitch.window_size,
            config.percussion.window_size,
            config.playback.tempo_bpm
        );

        Ok(Self {
            config,
            session,
            playback,
            telemetry,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Playback parameters seeded from the configured defaults
    pub fn default_playback_config(&self) -> PlaybackConfig {
        PlaybackConfig::from(&self.config.playback)
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn last_result(&self) -> Option<&DetectionResult> {
        self.session.last_result()
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn start_recording(&mut self) -> Result<(), SessionError> {
        self.session.start()
    }

    pub fn stop_recording(&mut self) -> Result<DetectionResult, SessionError> {
        self.session.stop()
    }

    pub fn cancel_recording(&mut self) -> Result<(), SessionError> {
        self.session.cancel()
    }

    /// Play the last successful recording
    ///
    /// # Errors
    /// `NothingToPlay` when no recording has completed yet, otherwise as
    /// `PlaybackEngine::play`
    pub fn play_last(&self, config: &PlaybackConfig) -> Result<PlaybackSummary, PlaybackError> {
        match self.session.last_result() {
            Some(result) => self.playback.play(result, config),
            None => {
                let err = PlaybackError::NothingToPlay;
                log_playback_error(&err, "play_last");
                self.telemetry
                    .record_error(ErrorSource::Playback, &err, "play_last");
                Err(err)
            }
        }
    }

    /// Play an arbitrary result (e.g. one loaded from disk)
    pub fn play(
        &self,
        result: &DetectionResult,
        config: &PlaybackConfig,
    ) -> Result<PlaybackSummary, PlaybackError> {
        self.playback.play(result, config)
    }

    pub fn stop_playback(&self) -> Result<(), PlaybackError> {
        self.playback.stop()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    /// Block until the current playback has triggered every event
    ///
    /// Returns at once for looping playback, which only `stop_playback` ends.
    pub fn wait_for_playback(&self) -> Result<(), PlaybackError> {
        self.playback.wait()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<MetricEvent> {
        self.telemetry.subscribe()
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }
}

#[cfg(test)]
mod tests;
