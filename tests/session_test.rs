//! Integration tests for the recording session lifecycle
//!
//! Covers the state machine end to end with a buffered capture device:
//! - Idle → Recording → Processing → Completed
//! - Re-recording from Completed
//! - Device, decode and extraction failures
//! - Telemetry ordering

use std::f32::consts::PI;
use std::sync::Arc;

use hum_to_music::engine::{BufferedCaptureDevice, RecordingSession, SessionState};
use hum_to_music::error::{DeviceAccessError, ErrorCode, ExtractionError, SessionError};
use hum_to_music::telemetry::{ErrorSource, MetricEvent, TelemetryCollector};
use hum_to_music::AppConfig;

const SR: u32 = 44_100;

fn hum(freq: f32, secs: f32) -> Vec<f32> {
    let mut samples = vec![0.0; SR as usize / 5];
    samples.extend(
        (0..(secs * SR as f32) as usize)
            .map(|i| 0.1 * (2.0 * PI * freq * i as f32 / SR as f32).sin()),
    );
    samples.extend(vec![0.0; SR as usize / 5]);
    samples
}

fn session(device: BufferedCaptureDevice) -> RecordingSession {
    RecordingSession::new(Box::new(device), &AppConfig::default()).unwrap()
}

/// Test the happy path: stop() on a recording session completes with notes
#[test]
fn test_recording_completes_with_notes() {
    let mut session = session(BufferedCaptureDevice::from_mono(hum(220.0, 0.6), SR));
    assert_eq!(session.state(), SessionState::Idle);

    session.start().unwrap();
    assert_eq!(session.state(), SessionState::Recording);
    assert!(session.is_device_open());

    let result = session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert!(!session.is_device_open());
    assert_eq!(result.notes.len(), 1);
    assert!((result.notes[0].frequency_hz - 220.0).abs() < 220.0 * 0.02);
    assert_eq!(session.last_result(), Some(&result));
}

/// Test that a completed session can record again
#[test]
fn test_completed_session_can_rerecord() {
    let mut session = session(BufferedCaptureDevice::from_mono(hum(330.0, 0.4), SR));

    session.start().unwrap();
    let first = session.stop().unwrap();

    session.start().unwrap();
    assert_eq!(session.state(), SessionState::Recording);
    let second = session.stop().unwrap();

    assert_eq!(first, second);
    assert_eq!(session.state(), SessionState::Completed);
}

/// Test that a denied microphone leaves the session idle
#[test]
fn test_permission_denied_keeps_idle() {
    let mut session = session(
        BufferedCaptureDevice::from_mono(hum(330.0, 0.4), SR)
            .with_open_failure(DeviceAccessError::PermissionDenied),
    );

    let err = session.start().unwrap_err();
    assert_eq!(err, SessionError::Device(DeviceAccessError::PermissionDenied));
    assert_eq!(err.code(), 1001);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.stop(), Err(SessionError::NotRecording));
}

/// Test that an extraction failure resets to idle and clears the old result
#[test]
fn test_extraction_failure_clears_previous_result() {
    let mut samples = hum(330.0, 0.4);
    samples[1000] = f32::NAN;
    let mut broken = session(BufferedCaptureDevice::from_mono(samples, SR));

    broken.start().unwrap();
    let err = broken.stop().unwrap_err();
    assert_eq!(
        err,
        SessionError::Extraction(ExtractionError::NonFiniteSample { index: 1000 })
    );
    assert_eq!(broken.state(), SessionState::Idle);
    assert!(broken.last_result().is_none());
    assert!(!broken.is_device_open());

    // the session is usable again after the failure
    broken.start().unwrap();
    assert_eq!(broken.state(), SessionState::Recording);
}

/// Test that telemetry sees transitions, capture and extraction in order
#[test]
fn test_session_publishes_telemetry() {
    let telemetry = Arc::new(TelemetryCollector::default());
    let mut rx = telemetry.subscribe();
    let mut session = session(BufferedCaptureDevice::from_encoded(b"not a wav".to_vec()))
        .with_telemetry(Arc::clone(&telemetry));

    session.start().unwrap();
    assert!(session.stop().is_err());

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(match event {
            MetricEvent::SessionState { to, .. } => format!("state:{:?}", to),
            MetricEvent::Error { source, code, .. } => {
                assert_eq!(source, ErrorSource::Decode);
                format!("error:{}", code)
            }
            other => format!("{:?}", other),
        });
    }

    assert_eq!(
        kinds,
        vec![
            "state:Recording".to_string(),
            "state:Processing".to_string(),
            "error:2001".to_string(),
            "state:Idle".to_string(),
        ]
    );
}
