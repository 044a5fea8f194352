//! Melody instruments and drum kits.
//!
//! Both are closed sets. Each variant resolves to concrete voice parameters
//! through one exhaustive match, so adding a variant forces a decision about
//! its sound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::types::PercussionKind;

/// Weight of the bright partial in the piano blend
const PIANO_BRIGHT_MIX: f32 = 0.8;

/// Base pitch of every membrane kick (C1)
const KICK_BASE_HZ: f32 = 32.703;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MelodyInstrument {
    #[default]
    Piano,
    Synth,
    Guitar,
    Violin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrumKit {
    #[default]
    Acoustic,
    Electronic,
    HipHop,
}

/// Oscillator shape of a pitched voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Triangle,
    /// Sine blended with a brighter partial; `mix` is the bright weight
    Bright { mix: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseColor {
    White,
    Pink,
}

/// ADSR envelope in seconds (sustain is a level in [0, 1])
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Envelope {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }
}

/// Pitched melody voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneVoice {
    pub waveform: Waveform,
    pub envelope: Envelope,
}

/// Pitch-swept oscillator used for kicks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembraneVoice {
    pub waveform: Waveform,
    pub base_frequency_hz: f32,
    /// Time for the sweep to fall back to the base frequency
    pub pitch_decay_seconds: f32,
    /// Sweep starts at `base_frequency_hz * octaves`
    pub octaves: f32,
    pub envelope: Envelope,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseVoice {
    pub color: NoiseColor,
    pub envelope: Envelope,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrumVoice {
    Membrane(MembraneVoice),
    Noise(NoiseVoice),
}

impl MelodyInstrument {
    pub const ALL: [MelodyInstrument; 4] = [
        MelodyInstrument::Piano,
        MelodyInstrument::Synth,
        MelodyInstrument::Guitar,
        MelodyInstrument::Violin,
    ];

    pub fn voice(self) -> ToneVoice {
        match self {
            MelodyInstrument::Piano => ToneVoice {
                waveform: Waveform::Bright {
                    mix: PIANO_BRIGHT_MIX,
                },
                envelope: Envelope::new(0.005, 0.15, 0.6, 1.0),
            },
            MelodyInstrument::Synth => ToneVoice {
                waveform: Waveform::Sawtooth,
                envelope: Envelope::new(0.1, 0.2, 0.3, 1.0),
            },
            MelodyInstrument::Guitar => ToneVoice {
                waveform: Waveform::Triangle,
                envelope: Envelope::new(0.01, 0.1, 0.5, 0.8),
            },
            MelodyInstrument::Violin => ToneVoice {
                waveform: Waveform::Sine,
                envelope: Envelope::new(0.3, 0.1, 0.7, 1.5),
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MelodyInstrument::Piano => "piano",
            MelodyInstrument::Synth => "synth",
            MelodyInstrument::Guitar => "guitar",
            MelodyInstrument::Violin => "violin",
        }
    }
}

impl DrumKit {
    pub const ALL: [DrumKit; 3] = [DrumKit::Acoustic, DrumKit::Electronic, DrumKit::HipHop];

    /// Voice for a detected hit; `Unknown` hits have no voice
    pub fn voice(self, kind: PercussionKind) -> Option<DrumVoice> {
        let membrane = |waveform, envelope| {
            DrumVoice::Membrane(MembraneVoice {
                waveform,
                base_frequency_hz: KICK_BASE_HZ,
                pitch_decay_seconds: 0.05,
                octaves: 10.0,
                envelope,
            })
        };
        let noise = |color, envelope| DrumVoice::Noise(NoiseVoice { color, envelope });
        let membrane_envelope = Envelope::new(0.001, 0.4, 0.01, 1.4);

        let voice = match (self, kind) {
            (_, PercussionKind::Unknown) => return None,

            (DrumKit::Acoustic, PercussionKind::Kick) => membrane(Waveform::Sine, membrane_envelope),
            (DrumKit::Acoustic, PercussionKind::Snare) => {
                noise(NoiseColor::White, Envelope::new(0.001, 0.2, 0.0, 0.1))
            }
            (DrumKit::Acoustic, PercussionKind::HiHat) => {
                noise(NoiseColor::White, Envelope::new(0.001, 0.05, 0.0, 0.03))
            }

            (DrumKit::Electronic, PercussionKind::Kick) => {
                membrane(Waveform::Sine, membrane_envelope)
            }
            (DrumKit::Electronic, PercussionKind::Snare) => {
                noise(NoiseColor::White, Envelope::new(0.01, 0.1, 0.1, 0.1))
            }
            (DrumKit::Electronic, PercussionKind::HiHat) => {
                noise(NoiseColor::White, Envelope::new(0.01, 0.1, 0.01, 0.1))
            }

            (DrumKit::HipHop, PercussionKind::Kick) => {
                membrane(Waveform::Triangle, membrane_envelope)
            }
            (DrumKit::HipHop, PercussionKind::Snare) => {
                noise(NoiseColor::Pink, Envelope::new(0.01, 0.1, 0.1, 0.1))
            }
            (DrumKit::HipHop, PercussionKind::HiHat) => {
                noise(NoiseColor::White, Envelope::new(0.01, 0.1, 0.01, 0.1))
            }
        };
        Some(voice)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrumKit::Acoustic => "acoustic",
            DrumKit::Electronic => "electronic",
            DrumKit::HipHop => "hip_hop",
        }
    }
}

impl fmt::Display for MelodyInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DrumKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MelodyInstrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MelodyInstrument::ALL
            .into_iter()
            .find(|instrument| instrument.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown melody instrument '{}'", s))
    }
}

impl FromStr for DrumKit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "hiphop" => Ok(DrumKit::HipHop),
            other => DrumKit::ALL
                .into_iter()
                .find(|kit| kit.as_str() == other)
                .ok_or_else(|| format!("unknown drum kit '{}'", s)),
        }
    }
}
