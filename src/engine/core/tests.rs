use std::f32::consts::TAU;
use std::time::Duration;

use super::*;
use crate::engine::backend::BufferedCaptureDevice;
use crate::error::DeviceAccessError;
use crate::playback::{ManualClock, RecordingBackend};

const SR: u32 = 44_100;

// Quiet enough (mean |x| ≈ 0.032) to stay under the percussion gate
fn hummed_take() -> Vec<f32> {
    let mut samples = vec![0.0; SR as usize / 4];
    samples.extend((0..SR as usize / 2).map(|i| 0.05 * (TAU * 330.0 * i as f32 / SR as f32).sin()));
    samples.extend(vec![0.0; SR as usize / 4]);
    samples
}

fn handle(
    device: BufferedCaptureDevice,
) -> (EngineHandle, Arc<RecordingBackend>, Arc<ManualClock>) {
    let backend = Arc::new(RecordingBackend::new());
    let clock = Arc::new(ManualClock::new());
    let handle = EngineHandle::with_clock(
        Box::new(device),
        backend.clone(),
        clock.clone(),
        AppConfig::default(),
    )
    .unwrap();
    (handle, backend, clock)
}

#[test]
fn test_play_before_any_recording_is_rejected() {
    let (handle, backend, _clock) = handle(BufferedCaptureDevice::from_mono(hummed_take(), SR));

    assert_eq!(
        handle.play_last(&PlaybackConfig::default()),
        Err(PlaybackError::NothingToPlay)
    );
    assert_eq!(backend.begin_count(), 0);
    assert!(!handle.is_playing());
}

#[test]
fn test_record_then_play_last() {
    let (mut handle, backend, clock) =
        handle(BufferedCaptureDevice::from_mono(hummed_take(), SR));

    handle.start_recording().unwrap();
    let result = handle.stop_recording().unwrap();
    assert_eq!(handle.session_state(), SessionState::Completed);
    assert_eq!(result.notes.len(), 1);
    assert!(result.percussion.is_empty(), "hits: {:?}", result.percussion);
    assert!((result.notes[0].frequency_hz - 330.0).abs() < 330.0 * 0.02);

    let summary = handle.play_last(&handle.default_playback_config()).unwrap();
    assert_eq!(summary.events, result.notes.len() + result.percussion.len());
    assert_eq!(summary.events, 1);

    clock.advance(Duration::from_secs(5));
    handle.wait_for_playback().unwrap();
    assert_eq!(backend.events().len(), 1);
}

#[test]
fn test_device_failure_surfaces_through_the_handle() {
    let (mut handle, _backend, _clock) = handle(
        BufferedCaptureDevice::from_mono(hummed_take(), SR)
            .with_open_failure(DeviceAccessError::DeviceBusy),
    );

    assert_eq!(
        handle.start_recording(),
        Err(SessionError::Device(DeviceAccessError::DeviceBusy))
    );
    assert_eq!(handle.session_state(), SessionState::Idle);

    let errors: Vec<i32> = handle
        .telemetry_snapshot()
        .recent
        .iter()
        .filter_map(|event| match event {
            MetricEvent::Error { code, .. } => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![1003]);
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let mut config = AppConfig::default();
    config.pitch.window_size = 1500;

    let result = EngineHandle::new(
        Box::new(BufferedCaptureDevice::from_mono(vec![0.0; 10], SR)),
        Arc::new(RecordingBackend::new()),
        config,
    );
    assert!(matches!(
        result.err(),
        Some(ExtractionError::InvalidWindowLength { length: 1500 })
    ));
}
