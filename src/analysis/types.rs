// Types module - data model shared by extraction, session and playback
//
// AudioBuffer is produced once per recording by the decoder and is read-only
// afterward. Note/PercussionHit/DetectionResult are immutable values handed
// from the extractor to the caller and on to playback.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Decoded linear PCM, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// `DecodeError::InvalidBuffer` when the sample rate is zero, there are no
    /// channels, or channels differ in length
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::InvalidBuffer {
                reason: "sample rate must be > 0".to_string(),
            });
        }

        let Some(first) = channels.first() else {
            return Err(DecodeError::InvalidBuffer {
                reason: "buffer must have at least one channel".to_string(),
            });
        };

        let frames = first.len();
        if channels.iter().any(|ch| ch.len() != frames) {
            return Err(DecodeError::InvalidBuffer {
                reason: "channels have different lengths".to_string(),
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Single-channel convenience constructor
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, DecodeError> {
        Self::new(vec![samples], sample_rate)
    }

    /// De-interleave frames of `channel_count` samples
    pub fn from_interleaved(
        samples: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Self, DecodeError> {
        if channel_count == 0 {
            return Err(DecodeError::InvalidBuffer {
                reason: "buffer must have at least one channel".to_string(),
            });
        }
        if samples.len() % channel_count != 0 {
            return Err(DecodeError::InvalidBuffer {
                reason: format!(
                    "{} samples do not divide into {} channels",
                    samples.len(),
                    channel_count
                ),
            });
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_seconds(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Channel 0, the one analysed by the extractor
    pub fn samples(&self) -> &[f32] {
        &self.channels[0]
    }
}

/// A pitched note detected from a run of voiced windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Continuous MIDI pitch (69 = A4)
    pub midi_note: f32,
    pub frequency_hz: f32,
    pub start_time_seconds: f32,
    pub duration_seconds: f32,
    /// Loudness in [0, 1]
    pub velocity: f32,
}

/// Percussion classes produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercussionKind {
    /// Loud, dark onset
    Kick,
    /// Loud onset that is neither kick nor hi-hat
    Snare,
    /// Bright onset
    HiHat,
    /// Below every rule; never kept in results
    Unknown,
}

impl PercussionKind {
    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            PercussionKind::Kick => "KICK",
            PercussionKind::Snare => "SNARE",
            PercussionKind::HiHat => "HI-HAT",
            PercussionKind::Unknown => "UNKNOWN",
        }
    }
}

/// A classified percussion onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercussionHit {
    pub kind: PercussionKind,
    pub start_time_seconds: f32,
    /// Loudness in [0, 1]
    pub velocity: f32,
}

/// Output of one extraction run, both sequences ordered by start time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub notes: Vec<Note>,
    pub percussion: Vec<PercussionHit>,
}

impl DetectionResult {
    /// True when there is nothing to play back
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.percussion.is_empty()
    }

    /// End of the last note or hit, in seconds
    pub fn span_seconds(&self) -> f32 {
        let notes_end = self
            .notes
            .iter()
            .map(|n| n.start_time_seconds + n.duration_seconds)
            .fold(0.0_f32, f32::max);
        let hits_end = self
            .percussion
            .iter()
            .map(|h| h.start_time_seconds)
            .fold(0.0_f32, f32::max);
        notes_end.max(hits_end)
    }
}

/// Clamp a loudness estimate into [0, 1]; NaN maps to 0
pub fn clamp_velocity(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
