// FeatureExtractor - slides analysis windows across a decoded recording
//
// Two independent passes run over channel 0:
//
// - Pitch pass: 2048-sample windows every 512 samples. Windows louder than
//   the RMS gate go through YIN; voiced frequencies become note candidates
//   whose length is found by scanning forward until the signal goes quiet.
// - Percussion pass: 1024-sample windows every 256 samples. Windows above the
//   energy gate are classified; Unknown windows are dropped.
//
// Candidates are then smoothed (notes) and spaced (hits). Long recordings
// split the pitch pass across scoped worker threads; every worker runs the
// same per-window function on a contiguous range of window starts and the
// results are concatenated in order, so the output does not depend on the
// path taken.

use std::num::NonZeroUsize;
use std::thread;
use std::time::Instant;

use crate::analysis::classifier::PercussionClassifier;
use crate::analysis::features::{mean_abs_energy, rms};
use crate::analysis::pitch::{frequency_to_midi, PitchDetector};
use crate::analysis::postprocess::{filter_percussion, smooth_notes};
use crate::analysis::types::{
    clamp_velocity, AudioBuffer, DetectionResult, Note, PercussionHit, PercussionKind,
};
use crate::config::{AppConfig, ExtractionConfig, PercussionConfig, PitchConfig};
use crate::error::{log_extraction_error, ExtractionError};

/// How a pitch candidate's length is determined
#[derive(Debug, Clone, Copy, PartialEq)]
enum NoteLength {
    /// Forward RMS scan from the window start
    Scan,
    /// Fixed length in seconds
    Fixed(f32),
}

/// Which path the pitch pass took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchPassMode {
    Synchronous,
    Offloaded { workers: usize },
}

/// FeatureExtractor turns an AudioBuffer into notes and percussion hits
///
/// Cheap to share across threads: the detector and classifier hold only
/// immutable FFT plans.
#[derive(Clone)]
pub struct FeatureExtractor {
    pitch: PitchConfig,
    percussion: PercussionConfig,
    extraction: ExtractionConfig,
    detector: PitchDetector,
    classifier: PercussionClassifier,
}

impl FeatureExtractor {
    /// Create an extractor from validated configuration
    ///
    /// # Errors
    /// Any `ExtractionError` reported by `AppConfig::validate`
    pub fn new(config: &AppConfig) -> Result<Self, ExtractionError> {
        config.validate()?;
        Ok(Self {
            pitch: config.pitch.clone(),
            percussion: config.percussion.clone(),
            extraction: config.extraction.clone(),
            detector: PitchDetector::new(&config.pitch),
            classifier: PercussionClassifier::new(config.percussion.clone())?,
        })
    }

    /// Pitch pass mode that `extract` would use for `sample_count` samples
    pub fn pitch_pass_mode(&self, sample_count: usize) -> PitchPassMode {
        if sample_count > self.extraction.offload_threshold_samples {
            PitchPassMode::Offloaded {
                workers: self.worker_count(),
            }
        } else {
            PitchPassMode::Synchronous
        }
    }

    /// Run both passes and post-processing over channel 0
    ///
    /// # Errors
    /// - `ExtractionError::NonFiniteSample` if the buffer holds NaN/inf
    /// - `ExtractionError::WorkerPanicked` if an offloaded worker dies
    pub fn extract(&self, buffer: &AudioBuffer) -> Result<DetectionResult, ExtractionError> {
        let started = Instant::now();
        let samples = buffer.samples();
        let sample_rate = buffer.sample_rate();

        tracing::info!(
            samples = samples.len(),
            sample_rate,
            duration_seconds = buffer.duration_seconds(),
            "Extraction started"
        );

        let result = self.run_passes(samples, sample_rate);

        match &result {
            Ok(detection) => tracing::info!(
                notes = detection.notes.len(),
                percussion = detection.percussion.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Extraction finished"
            ),
            Err(err) => log_extraction_error(err, "extract"),
        }

        result
    }

    fn run_passes(&self, samples: &[f32], sample_rate: u32) -> Result<DetectionResult, ExtractionError> {
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(ExtractionError::NonFiniteSample { index });
        }

        let candidates = match self.pitch_pass_mode(samples.len()) {
            PitchPassMode::Synchronous => self.pitch_candidates(samples, sample_rate),
            PitchPassMode::Offloaded { workers } => {
                let length = match self.extraction.offload_note_duration_seconds {
                    Some(seconds) => NoteLength::Fixed(seconds),
                    None => NoteLength::Scan,
                };
                self.offloaded_candidates(samples, sample_rate, workers, length)?
            }
        };
        let notes = smooth_notes(&candidates);

        let hits = self.percussion_candidates(samples, sample_rate)?;
        let percussion = filter_percussion(&hits, self.percussion.min_hit_interval_seconds);

        tracing::debug!(
            pitch_candidates = candidates.len(),
            percussion_candidates = hits.len(),
            "Candidates collapsed"
        );

        Ok(DetectionResult { notes, percussion })
    }

    /// Raw note candidates from the pitch pass, computed on the calling thread
    pub fn pitch_candidates(&self, samples: &[f32], sample_rate: u32) -> Vec<Note> {
        window_starts(samples.len(), self.pitch.window_size, self.pitch.hop_size)
            .filter_map(|start| self.pitch_window(samples, start, sample_rate, NoteLength::Scan))
            .collect()
    }

    /// Raw note candidates from the pitch pass, split across worker threads
    ///
    /// Produces exactly what `pitch_candidates` produces.
    pub fn pitch_candidates_offloaded(
        &self,
        samples: &[f32],
        sample_rate: u32,
        workers: usize,
    ) -> Result<Vec<Note>, ExtractionError> {
        self.offloaded_candidates(samples, sample_rate, workers, NoteLength::Scan)
    }

    fn offloaded_candidates(
        &self,
        samples: &[f32],
        sample_rate: u32,
        workers: usize,
        length: NoteLength,
    ) -> Result<Vec<Note>, ExtractionError> {
        let starts: Vec<usize> =
            window_starts(samples.len(), self.pitch.window_size, self.pitch.hop_size).collect();
        if starts.is_empty() {
            return Ok(Vec::new());
        }

        let workers = workers.clamp(1, starts.len());
        let per_worker = starts.len().div_ceil(workers);

        tracing::debug!(
            windows = starts.len(),
            workers,
            "Pitch pass offloaded to worker threads"
        );

        thread::scope(|scope| {
            let handles: Vec<_> = starts
                .chunks(per_worker)
                .map(|range| {
                    scope.spawn(move || {
                        range
                            .iter()
                            .filter_map(|&start| self.pitch_window(samples, start, sample_rate, length))
                            .collect::<Vec<Note>>()
                    })
                })
                .collect();

            // Join every worker before inspecting results; an unjoined panic
            // would re-raise when the scope ends
            let parts: Vec<_> = handles.into_iter().map(|h| h.join()).collect();

            let mut candidates = Vec::new();
            for part in parts {
                match part {
                    Ok(notes) => candidates.extend(notes),
                    Err(_) => return Err(ExtractionError::WorkerPanicked),
                }
            }
            Ok(candidates)
        })
    }

    /// Analyse one pitch window; None when gated out or unvoiced
    fn pitch_window(
        &self,
        samples: &[f32],
        start: usize,
        sample_rate: u32,
        length: NoteLength,
    ) -> Option<Note> {
        let window = &samples[start..start + self.pitch.window_size];
        let level = rms(window);
        if level <= self.pitch.onset_rms_threshold {
            return None;
        }

        let frequency = self.detector.detect_frequency(window, sample_rate);
        if !(frequency > self.pitch.min_frequency_hz && frequency < self.pitch.max_frequency_hz) {
            return None;
        }

        let duration_seconds = match length {
            NoteLength::Scan => self.estimate_note_duration(samples, start, sample_rate),
            NoteLength::Fixed(seconds) => seconds,
        };

        Some(Note {
            midi_note: frequency_to_midi(frequency),
            frequency_hz: frequency,
            start_time_seconds: start as f32 / sample_rate as f32,
            duration_seconds,
            velocity: clamp_velocity(level * 10.0),
        })
    }

    /// Length of the sound starting at `start`
    ///
    /// Walks forward in `duration_scan_block` steps until a block's RMS falls
    /// below the onset gate. A sound still going at the end of the buffer
    /// has no measured end and gets the minimum length. Never shorter than
    /// `min_note_duration_seconds`.
    pub fn estimate_note_duration(&self, samples: &[f32], start: usize, sample_rate: u32) -> f32 {
        let block = self.pitch.duration_scan_block;
        let mut end = start;

        let mut i = start;
        while i < samples.len() {
            let stop = (i + block).min(samples.len());
            if rms(&samples[i..stop]) < self.pitch.onset_rms_threshold {
                end = i;
                break;
            }
            i += block;
        }

        let seconds = end.saturating_sub(start) as f32 / sample_rate as f32;
        seconds.max(self.pitch.min_note_duration_seconds)
    }

    /// Raw, classified hits from the percussion pass (Unknown already dropped)
    pub fn percussion_candidates(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<PercussionHit>, ExtractionError> {
        let window_size = self.percussion.window_size;
        let mut hits = Vec::new();

        for start in window_starts(samples.len(), window_size, self.percussion.hop_size) {
            let window = &samples[start..start + window_size];
            let energy = mean_abs_energy(window);
            if energy <= self.percussion.onset_energy_threshold {
                continue;
            }

            let kind = self.classifier.classify(window, sample_rate)?;
            if kind == PercussionKind::Unknown {
                continue;
            }

            hits.push(PercussionHit {
                kind,
                start_time_seconds: start as f32 / sample_rate as f32,
                velocity: clamp_velocity(energy * 5.0),
            });
        }

        Ok(hits)
    }

    fn worker_count(&self) -> usize {
        if self.extraction.worker_threads > 0 {
            return self.extraction.worker_threads;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

/// Start indices of every full window; never reads past the end
fn window_starts(len: usize, window_size: usize, hop_size: usize) -> impl Iterator<Item = usize> {
    let last = len.checked_sub(window_size);
    (0..)
        .step_by(hop_size)
        .take_while(move |&start| last.map_or(false, |last| start <= last))
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
