//! Sample-by-sample voice synthesis.
//!
//! A `Voice` is built once per trigger and then pulled one sample at a
//! time. `next_sample` does no allocation and no locking, so voices can be
//! rendered inside a real-time output callback.

use std::f32::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::instruments::{DrumVoice, Envelope, NoiseColor, Waveform};
use super::schedule::{ScheduledEvent, Sound};

/// Per-voice output gain, leaves headroom for a handful of overlaps
const VOICE_GAIN: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

/// Linear ADSR driven by a gate measured in samples
#[derive(Debug, Clone)]
pub struct Adsr {
    params: Envelope,
    sample_period: f32,
    stage: Stage,
    level: f32,
    gate_remaining: u64,
    release_step: f32,
}

impl Adsr {
    pub fn new(params: Envelope, gate_seconds: f32, sample_rate: u32) -> Self {
        let gate_remaining = (gate_seconds.max(0.0) * sample_rate as f32).round() as u64;
        Self {
            params,
            sample_period: 1.0 / sample_rate as f32,
            stage: Stage::Attack,
            level: 0.0,
            gate_remaining,
            release_step: 0.0,
        }
    }

    /// Current level, then advance one sample
    pub fn next_level(&mut self) -> f32 {
        let level = self.level;

        if self.gate_remaining > 0 {
            self.gate_remaining -= 1;
        } else if !matches!(self.stage, Stage::Release | Stage::Finished) {
            self.release();
        }

        match self.stage {
            Stage::Attack => {
                self.level += self.sample_period / self.params.attack.max(0.001);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                let sustain = self.params.sustain.clamp(0.0, 1.0);
                self.level -= (1.0 - sustain) * self.sample_period / self.params.decay.max(0.001);
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Finished;
                }
            }
            Stage::Finished => {}
        }

        level
    }

    /// Close the gate now; the level falls to zero over the release time
    pub fn release(&mut self) {
        if matches!(self.stage, Stage::Release | Stage::Finished) {
            return;
        }
        self.gate_remaining = 0;
        if self.level <= 0.0 {
            self.stage = Stage::Finished;
            return;
        }
        self.release_step = self.level * self.sample_period / self.params.release.max(0.001);
        self.stage = Stage::Release;
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }
}

#[derive(Debug, Clone)]
enum Source {
    Tone {
        waveform: Waveform,
        phase: f32,
        increment: f32,
    },
    Membrane {
        waveform: Waveform,
        phase: f32,
        base_hz: f32,
        octaves: f32,
        sweep_samples: f32,
        elapsed: f32,
        sample_period: f32,
    },
    Noise {
        color: NoiseColor,
        rng: StdRng,
        pink: [f32; 3],
    },
}

impl Source {
    fn next(&mut self) -> f32 {
        match self {
            Source::Tone {
                waveform,
                phase,
                increment,
            } => {
                let out = oscillate(*waveform, *phase);
                *phase = (*phase + *increment).fract();
                out
            }
            Source::Membrane {
                waveform,
                phase,
                base_hz,
                octaves,
                sweep_samples,
                elapsed,
                sample_period,
            } => {
                let out = oscillate(*waveform, *phase);
                // Exponential glide from base * octaves down to base
                let progress = (*elapsed / *sweep_samples).min(1.0);
                let frequency = *base_hz * octaves.powf(1.0 - progress);
                *phase = (*phase + frequency * *sample_period).fract();
                *elapsed += 1.0;
                out
            }
            Source::Noise { color, rng, pink } => {
                let white: f32 = rng.gen_range(-1.0..1.0);
                match color {
                    NoiseColor::White => white,
                    NoiseColor::Pink => {
                        pink[0] = 0.99765 * pink[0] + white * 0.099_046;
                        pink[1] = 0.963 * pink[1] + white * 0.296_516_4;
                        pink[2] = 0.57 * pink[2] + white * 1.052_691_3;
                        (pink[0] + pink[1] + pink[2] + white * 0.1848) * 0.25
                    }
                }
            }
        }
    }
}

/// Oscillator value at `phase` in [0, 1)
fn oscillate(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Bright { mix } => {
            let radians = phase * TAU;
            let bright = ((radians * 2.0).sin() + radians / PI - 1.0) * 0.5;
            radians.sin() * (1.0 - mix) + bright * mix
        }
    }
}

/// One sounding trigger
#[derive(Debug, Clone)]
pub struct Voice {
    source: Source,
    envelope: Adsr,
    gain: f32,
}

impl Voice {
    /// Build the voice for `event`; `seed` feeds noise sources
    pub fn new(event: &ScheduledEvent, sample_rate: u32, seed: u64) -> Self {
        let sample_rate = sample_rate.max(1);
        let sample_period = 1.0 / sample_rate as f32;

        let (source, params) = match event.sound {
            Sound::Tone {
                frequency_hz,
                voice,
            } => (
                Source::Tone {
                    waveform: voice.waveform,
                    phase: 0.0,
                    increment: frequency_hz * sample_period,
                },
                voice.envelope,
            ),
            Sound::Drum {
                voice: DrumVoice::Membrane(membrane),
                ..
            } => (
                Source::Membrane {
                    waveform: membrane.waveform,
                    phase: 0.0,
                    base_hz: membrane.base_frequency_hz,
                    octaves: membrane.octaves.max(1.0),
                    sweep_samples: (membrane.pitch_decay_seconds * sample_rate as f32).max(1.0),
                    elapsed: 0.0,
                    sample_period,
                },
                membrane.envelope,
            ),
            Sound::Drum {
                voice: DrumVoice::Noise(noise),
                ..
            } => (
                Source::Noise {
                    color: noise.color,
                    rng: StdRng::seed_from_u64(seed),
                    pink: [0.0; 3],
                },
                noise.envelope,
            ),
        };

        Self {
            source,
            envelope: Adsr::new(params, event.duration_seconds, sample_rate),
            gain: event.velocity.clamp(0.0, 1.0) * VOICE_GAIN,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.envelope.is_finished() {
            return 0.0;
        }
        let level = self.envelope.next_level();
        self.source.next() * level * self.gain
    }

    /// Start the release tail immediately
    pub fn release(&mut self) {
        self.envelope.release();
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }
}
