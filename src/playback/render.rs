//! Offline rendering of a playback schedule into PCM.

use std::path::Path;
use std::sync::Mutex;

use crate::analysis::types::DetectionResult;
use crate::audio::codec::write_wav_file;
use crate::error::PlaybackError;

use super::backend::SynthBackend;
use super::schedule::{build_schedule, Schedule, ScheduledEvent};
use super::voice::Voice;
use super::PlaybackConfig;

#[derive(Debug, Default)]
struct Mix {
    samples: Vec<f32>,
    voices: u64,
}

/// Mixes every triggered voice, tail included, into one mono buffer.
///
/// Works both as a `SynthBackend` behind the scheduler and standalone via
/// `render_schedule`. Rendering is not tied to wall-clock time, so `silence`
/// has nothing to cut.
pub struct OfflineRenderer {
    sample_rate: u32,
    mix: Mutex<Mix>,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            mix: Mutex::new(Mix::default()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render every event of `schedule` immediately
    pub fn render_schedule(&self, schedule: &Schedule) {
        for event in &schedule.events {
            self.mix_event(event);
        }
    }

    /// Mixed output so far, clamped to [-1, 1]
    pub fn samples(&self) -> Vec<f32> {
        let mix = self.mix.lock().unwrap_or_else(|p| p.into_inner());
        mix.samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect()
    }

    pub fn duration_seconds(&self) -> f32 {
        let mix = self.mix.lock().unwrap_or_else(|p| p.into_inner());
        mix.samples.len() as f32 / self.sample_rate as f32
    }

    /// Write the mix as 16-bit mono WAV
    pub fn export_wav<P: AsRef<Path>>(&self, path: P) -> Result<(), PlaybackError> {
        let samples = self.samples();
        write_wav_file(&path, &samples, self.sample_rate).map_err(|err| {
            PlaybackError::BackendFailure {
                reason: format!("Failed to write {:?}: {}", path.as_ref(), err),
            }
        })?;
        log::info!(
            "[OfflineRenderer] Wrote {} samples to {:?}",
            samples.len(),
            path.as_ref()
        );
        Ok(())
    }

    fn mix_event(&self, event: &ScheduledEvent) {
        let mut mix = self.mix.lock().unwrap_or_else(|p| p.into_inner());
        let seed = mix.voices;
        mix.voices += 1;

        let mut voice = Voice::new(event, self.sample_rate, seed);
        let offset = (event.at_seconds.max(0.0) * self.sample_rate as f32).round() as usize;

        let mut index = offset;
        while !voice.is_finished() {
            let sample = voice.next_sample();
            if index >= mix.samples.len() {
                mix.samples.resize(index + 1, 0.0);
            }
            mix.samples[index] += sample;
            index += 1;
        }
    }
}

impl SynthBackend for OfflineRenderer {
    fn begin(&self) -> Result<(), PlaybackError> {
        let mut mix = self.mix.lock().unwrap_or_else(|p| p.into_inner());
        mix.samples.clear();
        mix.voices = 0;
        Ok(())
    }

    fn trigger(&self, event: &ScheduledEvent) -> Result<(), PlaybackError> {
        self.mix_event(event);
        Ok(())
    }

    fn silence(&self) {}
}

/// Render `result` with `config` straight to PCM
///
/// # Errors
/// Same as `build_schedule`: `NothingToPlay` or `InvalidTempo`.
pub fn render_result(
    result: &DetectionResult,
    config: &PlaybackConfig,
    sample_rate: u32,
) -> Result<Vec<f32>, PlaybackError> {
    let schedule = build_schedule(result, config)?;
    let renderer = OfflineRenderer::new(sample_rate);
    renderer.render_schedule(&schedule);
    Ok(renderer.samples())
}
