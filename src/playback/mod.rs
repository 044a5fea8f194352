// Playback module - plays a detection result back through a synth
//
// Module organization:
// - instruments: melody instruments and drum kits resolved to voice parameters
// - schedule: detection result → time-ordered voice triggers
// - voice: allocation-free oscillators, noise and ADSR envelopes
// - clock: transport time base (system clock / manual clock for tests)
// - backend: SynthBackend trait and a recording backend
// - render: offline renderer (PCM / WAV)
// - output_cpal: real-time speaker output (feature `live_audio`)
//
// PlaybackEngine owns one scheduler thread per `play`. The thread waits on
// the transport clock and hands each event to the backend at its time.

pub mod backend;
pub mod clock;
pub mod instruments;
#[cfg(feature = "live_audio")]
pub mod output_cpal;
pub mod render;
pub mod schedule;
pub mod voice;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::types::DetectionResult;
use crate::config::PlaybackDefaults;
use crate::error::{log_playback_error, PlaybackError};
use crate::telemetry::{ErrorSource, TelemetryCollector};

pub use backend::{RecordingBackend, SynthBackend};
pub use clock::{ManualClock, SystemClock, TransportClock};
pub use instruments::{DrumKit, MelodyInstrument};
#[cfg(feature = "live_audio")]
pub use output_cpal::CpalOutput;
pub use render::{render_result, OfflineRenderer};
pub use schedule::{build_schedule, Schedule, ScheduleTiming, ScheduledEvent};

/// Caller-selected playback parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub melody_instrument: MelodyInstrument,
    pub drum_kit: DrumKit,
    pub tempo_bpm: u32,
    pub timing: ScheduleTiming,
    /// Repeat each track until `stop`; a looping transport never ends on its own
    pub looping: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            melody_instrument: MelodyInstrument::Piano,
            drum_kit: DrumKit::Acoustic,
            tempo_bpm: 120,
            timing: ScheduleTiming::Sequenced,
            looping: false,
        }
    }
}

impl From<&PlaybackDefaults> for PlaybackConfig {
    fn from(defaults: &PlaybackDefaults) -> Self {
        Self {
            tempo_bpm: defaults.tempo_bpm,
            ..Self::default()
        }
    }
}

/// What a successful `play` scheduled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    pub events: usize,
    pub tempo_bpm: u32,
    pub length_seconds: f32,
}

struct ActivePlayback {
    looping: bool,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Schedules detection results against a synth backend
pub struct PlaybackEngine {
    backend: Arc<dyn SynthBackend>,
    clock: Arc<dyn TransportClock>,
    telemetry: Option<Arc<TelemetryCollector>>,
    active: Mutex<Option<ActivePlayback>>,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn SynthBackend>, clock: Arc<dyn TransportClock>) -> Self {
        Self {
            backend,
            clock,
            telemetry: None,
            active: Mutex::new(None),
        }
    }

    /// Engine on the wall clock
    pub fn with_system_clock(backend: Arc<dyn SynthBackend>) -> Self {
        Self::new(backend, Arc::new(SystemClock::new()))
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryCollector>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Start playing `result`, stopping any current playback first
    ///
    /// The result and tempo are validated before anything already playing
    /// is touched.
    ///
    /// # Errors
    /// - `NothingToPlay` for an empty result
    /// - `InvalidTempo` for `tempo_bpm == 0`
    /// - `BackendFailure` if the backend cannot start
    /// - `LockPoisoned` if the engine state lock is poisoned
    pub fn play(
        &self,
        result: &DetectionResult,
        config: &PlaybackConfig,
    ) -> Result<PlaybackSummary, PlaybackError> {
        let schedule = build_schedule(result, config).map_err(|err| self.report(err, "play"))?;

        let mut active = self.lock_active()?;
        if let Some(previous) = active.take() {
            self.halt(previous);
        }

        self.backend.begin().map_err(|err| self.report(err, "play"))?;

        let summary = PlaybackSummary {
            events: schedule.events.len(),
            tempo_bpm: config.tempo_bpm,
            length_seconds: schedule.length_seconds,
        };

        // Transport time zero is fixed before the caller can move the clock
        let origin = self.clock.now();
        let looping = config.looping;
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let handle = {
            let backend = Arc::clone(&self.backend);
            let clock = Arc::clone(&self.clock);
            let telemetry = self.telemetry.clone();
            let stop = Arc::clone(&stop);
            let finished = Arc::clone(&finished);
            thread::Builder::new()
                .name("hum-playback".to_string())
                .spawn(move || {
                    let transport = Transport {
                        clock: clock.as_ref(),
                        origin,
                        looping,
                        stop: &stop,
                    };
                    run_schedule(&schedule, backend.as_ref(), &transport, telemetry);
                    finished.store(true, Ordering::Release);
                })
                .map_err(|err| {
                    self.report(
                        PlaybackError::BackendFailure {
                            reason: format!("Failed to spawn scheduler thread: {}", err),
                        },
                        "play",
                    )
                })?
        };

        *active = Some(ActivePlayback {
            looping,
            stop,
            finished,
            handle,
        });

        tracing::info!(
            events = summary.events,
            tempo_bpm = summary.tempo_bpm,
            length_seconds = summary.length_seconds,
            looping,
            melody = %config.melody_instrument,
            drums = %config.drum_kit,
            "Playback started"
        );
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_playback_started(
                summary.events,
                summary.tempo_bpm,
                summary.length_seconds,
            );
        }

        Ok(summary)
    }

    /// Halt the transport and silence the backend; no-op when idle
    pub fn stop(&self) -> Result<(), PlaybackError> {
        let mut active = self.lock_active()?;
        if let Some(current) = active.take() {
            self.halt(current);
        }
        Ok(())
    }

    /// True while the scheduler still has events to fire
    pub fn is_playing(&self) -> bool {
        match self.active.lock() {
            Ok(active) => active
                .as_ref()
                .is_some_and(|current| !current.finished.load(Ordering::Acquire)),
            Err(_) => false,
        }
    }

    /// Block until every event has been triggered
    ///
    /// Does not wait for release tails. Returns immediately when idle or
    /// looping; a looping transport only ends through `stop`.
    pub fn wait(&self) -> Result<(), PlaybackError> {
        let mut active = self.lock_active()?;
        if active.as_ref().is_some_and(|current| current.looping) {
            return Ok(());
        }
        let current = active.take();
        drop(active);

        if let Some(current) = current {
            if current.handle.join().is_err() {
                log::error!("[PlaybackEngine] Scheduler thread panicked");
            }
        }
        Ok(())
    }

    fn halt(&self, current: ActivePlayback) {
        current.stop.store(true, Ordering::Release);
        self.clock.wake();
        if current.handle.join().is_err() {
            log::error!("[PlaybackEngine] Scheduler thread panicked");
        }
        self.backend.silence();

        tracing::info!("Playback stopped");
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_playback_stopped();
        }
    }

    fn lock_active(&self) -> Result<std::sync::MutexGuard<'_, Option<ActivePlayback>>, PlaybackError> {
        self.active.lock().map_err(|_| {
            self.report(
                PlaybackError::LockPoisoned {
                    component: "playback state".to_string(),
                },
                "lock",
            )
        })
    }

    fn report(&self, err: PlaybackError, context: &str) -> PlaybackError {
        log_playback_error(&err, context);
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_error(ErrorSource::Playback, &err, context);
        }
        err
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let current = match self.active.get_mut() {
            Ok(active) => active.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(current) = current {
            self.halt(current);
        }
    }
}

struct Transport<'a> {
    clock: &'a dyn TransportClock,
    origin: Duration,
    looping: bool,
    stop: &'a AtomicBool,
}

/// Fire events in time order; when looping, each fired event is re-armed
/// one cycle of its track later
fn run_schedule(
    schedule: &Schedule,
    backend: &dyn SynthBackend,
    transport: &Transport<'_>,
    telemetry: Option<Arc<TelemetryCollector>>,
) {
    let mut next_at: Vec<f64> = schedule
        .events
        .iter()
        .map(|event| f64::from(event.at_seconds.max(0.0)))
        .collect();

    loop {
        // min_by keeps the first of equal times, so melody stays ahead of drums
        let Some((index, at)) = next_at
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, at)| at.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
        else {
            return;
        };

        let deadline = transport.origin + Duration::from_secs_f64(at);
        if !transport.clock.wait_until(deadline, transport.stop) {
            return;
        }

        let event = ScheduledEvent {
            at_seconds: at as f32,
            ..schedule.events[index]
        };
        let cycle = schedule.cycle_seconds(&event);
        next_at[index] = if transport.looping && cycle > 0.0 {
            at + f64::from(cycle)
        } else {
            f64::INFINITY
        };

        if let Err(err) = backend.trigger(&event) {
            log_playback_error(&err, "trigger");
            if let Some(telemetry) = &telemetry {
                telemetry.record_error(ErrorSource::Playback, &err, "trigger");
            }
            backend.silence();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{Note, PercussionHit, PercussionKind};

    fn result(notes: usize) -> DetectionResult {
        DetectionResult {
            notes: (0..notes)
                .map(|i| Note {
                    midi_note: 60.0 + i as f32,
                    frequency_hz: 0.0,
                    start_time_seconds: i as f32 * 0.5,
                    duration_seconds: 0.25,
                    velocity: 0.5,
                })
                .collect(),
            percussion: vec![PercussionHit {
                kind: PercussionKind::Kick,
                start_time_seconds: 0.0,
                velocity: 0.9,
            }],
        }
    }

    fn engine() -> (PlaybackEngine, Arc<RecordingBackend>, Arc<ManualClock>) {
        let backend = Arc::new(RecordingBackend::new());
        let clock = Arc::new(ManualClock::new());
        let engine = PlaybackEngine::new(backend.clone(), clock.clone());
        (engine, backend, clock)
    }

    #[test]
    fn test_plays_every_event_once_the_clock_runs() {
        let (engine, backend, clock) = engine();
        let summary = engine.play(&result(4), &PlaybackConfig::default()).unwrap();
        assert_eq!(summary.events, 5);

        clock.advance(Duration::from_secs(10));
        engine.wait().unwrap();

        assert_eq!(backend.events().len(), 5);
        assert!(!engine.is_playing());
        assert_eq!(backend.silence_count(), 0);
    }

    #[test]
    fn test_transport_origin_is_fixed_when_play_returns() {
        let (engine, backend, clock) = engine();
        engine.play(&result(2), &PlaybackConfig::default()).unwrap();
        // moving the clock straight away must not push deadlines out
        clock.advance(Duration::from_secs(10));
        engine.wait().unwrap();

        let times: Vec<f32> = backend.events().iter().map(|e| e.at_seconds).collect();
        assert_eq!(times, vec![0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_looping_repeats_each_track_on_its_own_cycle() {
        let (engine, backend, clock) = engine();
        let config = PlaybackConfig {
            looping: true,
            ..PlaybackConfig::default()
        };
        engine.play(&result(2), &config).unwrap();

        // 120 BPM: melody cycles every 1.0 s, the single drum hit every 0.5 s
        clock.advance(Duration::from_millis(2750));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while backend.events().len() < 12 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(engine.is_playing());
        // a looping transport is only ended by stop
        engine.wait().unwrap();
        assert!(engine.is_playing());
        engine.stop().unwrap();
        assert!(!engine.is_playing());

        let events = backend.events();
        assert_eq!(events.len(), 12);
        let tones: Vec<f32> = events
            .iter()
            .filter(|e| matches!(e.sound, schedule::Sound::Tone { .. }))
            .map(|e| e.at_seconds)
            .collect();
        assert_eq!(tones, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
        assert_eq!(backend.silence_count(), 1);
    }

    #[test]
    fn test_nothing_to_play_does_not_touch_current_playback() {
        let (engine, backend, _clock) = engine();
        engine.play(&result(4), &PlaybackConfig::default()).unwrap();

        assert_eq!(
            engine.play(&DetectionResult::default(), &PlaybackConfig::default()),
            Err(PlaybackError::NothingToPlay)
        );
        let zero_tempo = PlaybackConfig {
            tempo_bpm: 0,
            ..PlaybackConfig::default()
        };
        assert_eq!(
            engine.play(&result(1), &zero_tempo),
            Err(PlaybackError::InvalidTempo { bpm: 0 })
        );

        assert_eq!(backend.begin_count(), 1);
        assert_eq!(backend.silence_count(), 0);
        assert!(engine.is_playing());
    }

    #[test]
    fn test_replay_stops_the_previous_transport() {
        let (engine, backend, clock) = engine();
        engine.play(&result(4), &PlaybackConfig::default()).unwrap();
        engine.play(&result(2), &PlaybackConfig::default()).unwrap();

        assert_eq!(backend.begin_count(), 2);
        assert_eq!(backend.silence_count(), 1);

        clock.advance(Duration::from_secs(10));
        engine.wait().unwrap();

        // first run fired at most its two beat-zero events before it was
        // stopped; the second run fired all three of its events
        let total = backend.events().len();
        assert!((3..=5).contains(&total), "fired {}", total);
        let last = backend.events()[total - 1];
        assert_eq!(last.at_seconds, 0.5);
    }

    #[test]
    fn test_stop_prevents_later_events() {
        let (engine, backend, clock) = engine();
        engine.play(&result(4), &PlaybackConfig::default()).unwrap();
        engine.stop().unwrap();
        assert!(!engine.is_playing());

        let fired = backend.events().len();
        clock.advance(Duration::from_secs(10));
        assert_eq!(backend.events().len(), fired);
        assert_eq!(backend.silence_count(), 1);

        // stopping an idle engine is harmless
        engine.stop().unwrap();
        assert_eq!(backend.silence_count(), 1);
    }

    #[test]
    fn test_backend_failure_ends_the_run() {
        let backend = Arc::new(RecordingBackend::failing_after(2));
        let clock = Arc::new(ManualClock::new());
        let engine = PlaybackEngine::new(backend.clone(), clock.clone());

        engine.play(&result(4), &PlaybackConfig::default()).unwrap();
        clock.advance(Duration::from_secs(10));
        engine.wait().unwrap();

        assert_eq!(backend.events().len(), 2);
        assert_eq!(backend.silence_count(), 1);
    }

    #[test]
    fn test_telemetry_sees_start_and_stop() {
        let telemetry = Arc::new(TelemetryCollector::default());
        let (engine, _backend, _clock) = engine();
        let engine = engine.with_telemetry(Arc::clone(&telemetry));

        engine.play(&result(1), &PlaybackConfig::default()).unwrap();
        engine.stop().unwrap();

        let recent = telemetry.snapshot().recent;
        assert!(matches!(
            recent[0],
            crate::telemetry::MetricEvent::PlaybackStarted { events: 2, .. }
        ));
        assert!(matches!(
            recent[1],
            crate::telemetry::MetricEvent::PlaybackStopped { .. }
        ));
    }

    #[test]
    fn test_config_defaults_follow_app_config() {
        let defaults = PlaybackDefaults {
            tempo_bpm: 90,
            output_sample_rate: 48_000,
        };
        let config = PlaybackConfig::from(&defaults);
        assert_eq!(config.tempo_bpm, 90);
        assert_eq!(config.melody_instrument, MelodyInstrument::Piano);
        assert_eq!(config.timing, ScheduleTiming::Sequenced);
    }
}
