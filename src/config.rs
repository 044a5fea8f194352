//! Configuration management for analysis and playback tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling threshold experiments without recompilation. Every field has a
//! default, so a partial JSON file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ExtractionError;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pitch: PitchConfig,
    pub percussion: PercussionConfig,
    pub extraction: ExtractionConfig,
    pub capture: CaptureConfig,
    pub playback: PlaybackDefaults,
}

/// Pitch pass parameters (YIN over overlapping windows)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// Analysis window in samples (power of two)
    pub window_size: usize,
    /// Hop between windows in samples
    pub hop_size: usize,
    /// RMS below which a window is treated as silence
    pub onset_rms_threshold: f32,
    /// Cumulative-mean-normalized difference threshold
    pub yin_threshold: f32,
    /// Lowest accepted fundamental in Hz
    pub min_frequency_hz: f32,
    /// Highest accepted fundamental in Hz
    pub max_frequency_hz: f32,
    /// Refine the YIN minimum with a parabola through its neighbours
    pub parabolic_refinement: bool,
    /// Block size of the forward scan used to estimate note length
    pub duration_scan_block: usize,
    /// Shortest note the scan may report, in seconds
    pub min_note_duration_seconds: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: 512,
            onset_rms_threshold: 0.01,
            yin_threshold: 0.1,
            min_frequency_hz: 80.0,
            max_frequency_hz: 2000.0,
            parabolic_refinement: true,
            duration_scan_block: 256,
            min_note_duration_seconds: 0.1,
        }
    }
}

/// Percussion pass parameters (energy + spectral centroid rules)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercussionConfig {
    /// Analysis window in samples (power of two)
    pub window_size: usize,
    /// Hop between windows in samples
    pub hop_size: usize,
    /// Mean absolute energy that opens the onset gate
    pub onset_energy_threshold: f32,
    /// Kick needs energy above this ...
    pub kick_energy: f32,
    /// ... and a centroid below this (Hz)
    pub kick_max_centroid_hz: f32,
    /// Hi-hat needs energy above this ...
    pub hihat_energy: f32,
    /// ... and a centroid above this (Hz)
    pub hihat_min_centroid_hz: f32,
    /// Anything louder than this that is neither kick nor hi-hat
    pub snare_energy: f32,
    /// Minimum spacing between kept hits, in seconds
    pub min_hit_interval_seconds: f32,
}

impl Default for PercussionConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            hop_size: 256,
            onset_energy_threshold: 0.05,
            kick_energy: 0.1,
            kick_max_centroid_hz: 1000.0,
            hihat_energy: 0.05,
            hihat_min_centroid_hz: 2000.0,
            snare_energy: 0.08,
            min_hit_interval_seconds: 0.1,
        }
    }
}

/// Extraction scheduling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Sample count above which the pitch pass runs on worker threads
    pub offload_threshold_samples: usize,
    /// Worker count for the offloaded pass (0 = available parallelism)
    pub worker_threads: usize,
    /// Fixed note length for offloaded candidates instead of the forward scan
    pub offload_note_duration_seconds: Option<f32>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            offload_threshold_samples: 100_000,
            worker_threads: 0,
            offload_note_duration_seconds: None,
        }
    }
}

/// Capture parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interval between buffered chunks in milliseconds
    pub chunk_interval_ms: u32,
    /// Number of pre-allocated chunks in the capture pool
    pub chunk_pool_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_interval_ms: 100,
            chunk_pool_size: 64,
        }
    }
}

/// Playback defaults used when the caller does not override them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Transport tempo
    pub tempo_bpm: u32,
    /// Sample rate of rendered/streamed output
    pub output_sample_rate: u32,
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            tempo_bpm: 120,
            output_sample_rate: 44_100,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration; if the file doesn't exist or the JSON is invalid,
    /// logs a warning and returns the defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/hum_config.json")
    }

    /// Check the analysis parameters before they reach the extractor
    pub fn validate(&self) -> Result<(), ExtractionError> {
        validate_window("pitch", self.pitch.window_size, self.pitch.hop_size)?;
        validate_window(
            "percussion",
            self.percussion.window_size,
            self.percussion.hop_size,
        )?;

        if self.pitch.duration_scan_block == 0 {
            return Err(ExtractionError::InvalidConfig {
                reason: "pitch.duration_scan_block must be > 0".to_string(),
            });
        }

        if !(self.pitch.min_frequency_hz > 0.0
            && self.pitch.min_frequency_hz < self.pitch.max_frequency_hz)
        {
            return Err(ExtractionError::InvalidConfig {
                reason: format!(
                    "pitch frequency range [{}, {}] is empty",
                    self.pitch.min_frequency_hz, self.pitch.max_frequency_hz
                ),
            });
        }

        if let Some(duration) = self.extraction.offload_note_duration_seconds {
            if duration <= 0.0 {
                return Err(ExtractionError::InvalidConfig {
                    reason: "extraction.offload_note_duration_seconds must be > 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn validate_window(pass: &str, window_size: usize, hop_size: usize) -> Result<(), ExtractionError> {
    if !window_size.is_power_of_two() {
        return Err(ExtractionError::InvalidWindowLength {
            length: window_size,
        });
    }
    if hop_size == 0 {
        return Err(ExtractionError::InvalidConfig {
            reason: format!("{}.hop_size must be > 0", pass),
        });
    }
    Ok(())
}
