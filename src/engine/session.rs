//! RecordingSession: microphone take → decoded buffer → detection result.
//!
//! ```text
//!            start()              stop()                 ok
//!   Idle ─────────────→ Recording ──────→ Processing ─────────→ Completed
//!    ↑                     │                  │                     │
//!    │      cancel()       │     decode /     │                     │ start()
//!    ├─────────────────────┘  extraction err  │                     ↓
//!    └────────────────────────────────────────┘                 Recording
//! ```
//!
//! The session owns its capture device. Every path out of `Recording`
//! releases the device, and so does dropping the session.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::extractor::FeatureExtractor;
use crate::analysis::types::{AudioBuffer, DetectionResult};
use crate::audio::codec::{AudioDecoder, WavDecoder};
use crate::config::{AppConfig, CaptureConfig};
use crate::engine::backend::CaptureDevice;
use crate::error::{log_session_error, ExtractionError, SessionError};
use crate::telemetry::{ErrorSource, TelemetryCollector};

/// Lifecycle states of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Processing,
    Completed,
}

/// Caller-owned recording state machine
pub struct RecordingSession {
    device: Box<dyn CaptureDevice>,
    decoder: Box<dyn AudioDecoder>,
    extractor: FeatureExtractor,
    capture: CaptureConfig,
    state: SessionState,
    /// State to fall back to when a recording is cancelled
    resting_state: SessionState,
    last_result: Option<DetectionResult>,
    last_buffer: Option<AudioBuffer>,
    telemetry: Option<Arc<TelemetryCollector>>,
}

impl RecordingSession {
    /// Create an idle session around a capture device
    ///
    /// # Errors
    /// `ExtractionError` if the analysis configuration is invalid
    pub fn new(device: Box<dyn CaptureDevice>, config: &AppConfig) -> Result<Self, ExtractionError> {
        Ok(Self {
            device,
            decoder: Box::new(WavDecoder),
            extractor: FeatureExtractor::new(config)?,
            capture: config.capture.clone(),
            state: SessionState::Idle,
            resting_state: SessionState::Idle,
            last_result: None,
            last_buffer: None,
            telemetry: None,
        })
    }

    /// Replace the WAV decoder
    pub fn with_decoder(mut self, decoder: Box<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryCollector>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Result of the last successful recording
    pub fn last_result(&self) -> Option<&DetectionResult> {
        self.last_result.as_ref()
    }

    /// Decoded audio of the last successful recording
    pub fn last_buffer(&self) -> Option<&AudioBuffer> {
        self.last_buffer.as_ref()
    }

    pub fn is_device_open(&self) -> bool {
        self.device.is_open()
    }

    /// Begin a new recording
    ///
    /// # Errors
    /// - `SessionError::AlreadyRecording` while recording or processing
    /// - `SessionError::Device` if the device cannot be acquired; the state
    ///   is left unchanged
    pub fn start(&mut self) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Recording | SessionState::Processing) {
            let err = SessionError::AlreadyRecording;
            log_session_error(&err, "start");
            return Err(err);
        }

        if let Err(err) = self.device.open(&self.capture) {
            self.report_error(ErrorSource::Capture, &err.clone().into(), "start");
            return Err(err.into());
        }

        self.resting_state = self.state;
        self.transition(SessionState::Recording);
        tracing::info!(
            chunk_interval_ms = self.capture.chunk_interval_ms,
            "Recording started"
        );
        Ok(())
    }

    /// Finish the recording, decode it and run extraction
    ///
    /// On any failure the session returns to `Idle` with no stored result
    /// and the device released.
    ///
    /// # Errors
    /// - `SessionError::NotRecording` if no recording is active
    /// - `SessionError::Device`/`Decode`/`Extraction` from the pipeline
    pub fn stop(&mut self) -> Result<DetectionResult, SessionError> {
        if self.state != SessionState::Recording {
            let err = SessionError::NotRecording;
            log_session_error(&err, "stop");
            return Err(err);
        }

        self.transition(SessionState::Processing);

        match self.process() {
            Ok((buffer, result)) => {
                self.last_buffer = Some(buffer);
                self.last_result = Some(result.clone());
                self.transition(SessionState::Completed);
                Ok(result)
            }
            Err(err) => {
                self.device.release();
                self.last_result = None;
                self.last_buffer = None;
                self.transition(SessionState::Idle);
                Err(err)
            }
        }
    }

    /// Abort the active recording without running extraction
    ///
    /// The session returns to the state it was in before `start`, keeping
    /// any earlier result.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Recording {
            return Err(SessionError::NotRecording);
        }

        self.device.release();
        let resting = self.resting_state;
        self.transition(resting);
        tracing::info!("Recording cancelled");
        Ok(())
    }

    fn process(&mut self) -> Result<(AudioBuffer, DetectionResult), SessionError> {
        let bytes = self.device.finish().map_err(|err| {
            let err = SessionError::from(err);
            self.report_error(ErrorSource::Capture, &err, "stop");
            err
        })?;

        let buffer = self.decoder.decode(&bytes).map_err(|err| {
            let err = SessionError::from(err);
            self.report_error(ErrorSource::Decode, &err, "stop");
            err
        })?;

        tracing::debug!(
            frames = buffer.len(),
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            "Recording decoded"
        );
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_capture(&buffer);
        }

        let started = Instant::now();
        let result = self.extractor.extract(&buffer).map_err(|err| {
            let err = SessionError::from(err);
            self.report_error(ErrorSource::Extraction, &err, "stop");
            err
        })?;

        if let Some(telemetry) = &self.telemetry {
            telemetry.record_extraction(
                buffer.len(),
                &result,
                started.elapsed().as_millis() as u64,
            );
        }

        Ok((buffer, result))
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        self.state = to;
        tracing::debug!(?from, ?to, "Session state changed");
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_state_change(from, to);
        }
    }

    fn report_error(&self, source: ErrorSource, err: &SessionError, context: &str) {
        log_session_error(err, context);
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_error(source, err, context);
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.device.release();
    }
}
