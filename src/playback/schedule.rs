//! Turns a detection result into a time-ordered list of voice triggers.
//!
//! All timing here is pure arithmetic on the tempo, so the scheduler
//! thread and the offline renderer see exactly the same plan.

use serde::{Deserialize, Serialize};

use crate::analysis::pitch::midi_to_frequency;
use crate::analysis::types::{DetectionResult, PercussionKind};
use crate::error::PlaybackError;

use super::instruments::{DrumVoice, ToneVoice};
use super::PlaybackConfig;

/// Tempo at which `Recorded` timing reproduces the take unchanged
pub const REFERENCE_TEMPO_BPM: u32 = 120;

/// How detected events are placed on the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleTiming {
    /// One event per beat, notes and drums each starting on beat zero
    #[default]
    Sequenced,
    /// Detected start times, stretched by `REFERENCE_TEMPO_BPM / tempo`
    Recorded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sound {
    Tone {
        frequency_hz: f32,
        voice: ToneVoice,
    },
    Drum {
        kind: PercussionKind,
        voice: DrumVoice,
    },
}

/// One voice trigger on the transport timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    /// Offset from transport start
    pub at_seconds: f32,
    /// Gate length; the envelope release follows it
    pub duration_seconds: f32,
    pub velocity: f32,
    pub sound: Sound,
}

impl ScheduledEvent {
    pub fn end_seconds(&self) -> f32 {
        self.at_seconds + self.duration_seconds
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    /// Sorted by `at_seconds`; melody before drums at equal times
    pub events: Vec<ScheduledEvent>,
    /// End of the last gate
    pub length_seconds: f32,
    /// Period of the melody track when looping
    pub melody_cycle_seconds: f32,
    /// Period of the drum track when looping
    pub drum_cycle_seconds: f32,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Loop period of the track `event` belongs to
    pub fn cycle_seconds(&self, event: &ScheduledEvent) -> f32 {
        match event.sound {
            Sound::Tone { .. } => self.melody_cycle_seconds,
            Sound::Drum { .. } => self.drum_cycle_seconds,
        }
    }
}

/// Length of one beat in seconds
///
/// # Panics
/// Never; a zero tempo yields `f32::INFINITY`, callers validate first.
#[inline]
pub fn seconds_per_beat(bpm: u32) -> f32 {
    60.0 / bpm as f32
}

/// Build the trigger list for `result`
///
/// # Errors
/// - `NothingToPlay` when the result holds no notes and no hits
/// - `InvalidTempo` when `tempo_bpm == 0`
pub fn build_schedule(
    result: &DetectionResult,
    config: &PlaybackConfig,
) -> Result<Schedule, PlaybackError> {
    if result.is_empty() {
        return Err(PlaybackError::NothingToPlay);
    }
    if config.tempo_bpm == 0 {
        return Err(PlaybackError::InvalidTempo {
            bpm: config.tempo_bpm,
        });
    }

    let beat = seconds_per_beat(config.tempo_bpm);
    let stretch = REFERENCE_TEMPO_BPM as f32 / config.tempo_bpm as f32;
    let tone = config.melody_instrument.voice();

    let mut events = Vec::with_capacity(result.notes.len() + result.percussion.len());

    for (step, note) in result.notes.iter().enumerate() {
        let (at_seconds, duration_seconds) = match config.timing {
            ScheduleTiming::Sequenced => (step as f32 * beat, note.duration_seconds),
            ScheduleTiming::Recorded => (
                note.start_time_seconds * stretch,
                note.duration_seconds * stretch,
            ),
        };
        events.push(ScheduledEvent {
            at_seconds,
            duration_seconds,
            velocity: note.velocity,
            sound: Sound::Tone {
                frequency_hz: midi_to_frequency(note.midi_note),
                voice: tone,
            },
        });
    }

    // Hits without a kit voice still occupy their step
    for (step, hit) in result.percussion.iter().enumerate() {
        let Some(voice) = config.drum_kit.voice(hit.kind) else {
            continue;
        };
        let at_seconds = match config.timing {
            ScheduleTiming::Sequenced => step as f32 * beat,
            ScheduleTiming::Recorded => hit.start_time_seconds * stretch,
        };
        events.push(ScheduledEvent {
            at_seconds,
            duration_seconds: beat / 2.0,
            velocity: hit.velocity,
            sound: Sound::Drum {
                kind: hit.kind,
                voice,
            },
        });
    }

    events.sort_by(|a, b| a.at_seconds.total_cmp(&b.at_seconds));
    let length_seconds = events
        .iter()
        .map(ScheduledEvent::end_seconds)
        .fold(0.0_f32, f32::max);

    // Sequenced tracks repeat after one beat per step, Unknown hits included;
    // recorded timing repeats the whole take
    let (melody_cycle_seconds, drum_cycle_seconds) = match config.timing {
        ScheduleTiming::Sequenced => (
            result.notes.len() as f32 * beat,
            result.percussion.len() as f32 * beat,
        ),
        ScheduleTiming::Recorded => (length_seconds, length_seconds),
    };

    Ok(Schedule {
        events,
        length_seconds,
        melody_cycle_seconds,
        drum_cycle_seconds,
    })
}
