// Pitch module - YIN fundamental frequency estimation
//
// The difference function d(tau) = Σ (x[i] - x[i+tau])² is expanded into
// two energy terms and an autocorrelation term. The energies come from a
// prefix sum of squares, the autocorrelation from a zero-padded FFT, so a
// 2048-sample window costs two transforms instead of a quadratic loop.
//
// References:
// - de Cheveigné, A. & Kawahara, H. (2002). YIN, a fundamental frequency
//   estimator for speech and music

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::config::PitchConfig;

/// Smallest lag examined; lags 0 and 1 never describe a musical pitch
const MIN_TAU: usize = 2;

/// Differences below this fraction of the window energy are FFT rounding
/// residue and count as exactly zero
const RESIDUE_TOLERANCE: f64 = 1e-10;

/// Forward/inverse plans for one window length
#[derive(Clone)]
struct DifferencePlan {
    window_size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl DifferencePlan {
    fn new(window_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let padded = window_size * 2;
        Self {
            window_size,
            forward: planner.plan_fft_forward(padded),
            inverse: planner.plan_fft_inverse(padded),
        }
    }

    /// d(tau) for tau in 0..N/2
    fn difference(&self, window: &[f32]) -> Vec<f64> {
        let n = self.window_size;
        let half = n / 2;
        let padded = n * 2;

        let mut prefix_energy = Vec::with_capacity(n + 1);
        prefix_energy.push(0.0_f64);
        let mut acc = 0.0_f64;
        for &s in window {
            acc += f64::from(s) * f64::from(s);
            prefix_energy.push(acc);
        }

        let mut buffer: Vec<Complex<f64>> = window
            .iter()
            .map(|&s| Complex::new(f64::from(s), 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(padded)
            .collect();
        self.forward.process(&mut buffer);
        for bin in buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut buffer);

        let scale = 1.0 / padded as f64;
        let residue = prefix_energy[n] * RESIDUE_TOLERANCE;
        (0..half)
            .map(|tau| {
                let head = prefix_energy[n - tau];
                let tail = prefix_energy[n] - prefix_energy[tau];
                let autocorrelation = buffer[tau].re * scale;
                let d = head + tail - 2.0 * autocorrelation;
                if d <= residue {
                    0.0
                } else {
                    d
                }
            })
            .collect()
    }
}

/// YIN pitch detector for windows of a fixed size
///
/// Plans are shared via `Arc`, so a detector can be cloned cheaply into
/// worker threads.
#[derive(Clone)]
pub struct PitchDetector {
    yin_threshold: f32,
    parabolic_refinement: bool,
    plan: DifferencePlan,
}

impl PitchDetector {
    /// Create a detector for `config.window_size` sample windows
    pub fn new(config: &PitchConfig) -> Self {
        Self {
            yin_threshold: config.yin_threshold,
            parabolic_refinement: config.parabolic_refinement,
            plan: DifferencePlan::new(config.window_size),
        }
    }

    /// Detector with default thresholds for the given window size
    pub fn with_window_size(window_size: usize) -> Self {
        Self::new(&PitchConfig {
            window_size,
            ..PitchConfig::default()
        })
    }

    pub fn window_size(&self) -> usize {
        self.plan.window_size
    }

    /// Estimate the fundamental frequency of a window
    ///
    /// # Returns
    /// Frequency in Hz, or 0.0 when no lag dips below the YIN threshold
    /// (silence, noise, windows shorter than 8 samples)
    pub fn detect_frequency(&self, window: &[f32], sample_rate: u32) -> f32 {
        if window.len() / 2 <= MIN_TAU + 1 {
            return 0.0;
        }

        let diff = if window.len() == self.plan.window_size {
            self.plan.difference(window)
        } else {
            DifferencePlan::new(window.len()).difference(window)
        };

        let normalized = cumulative_mean_normalized(&diff);
        match self.find_minimum(&normalized) {
            Some(tau) if tau > 0.0 => sample_rate as f32 / tau,
            _ => 0.0,
        }
    }

    /// First dip below threshold, followed down to its local minimum
    fn find_minimum(&self, normalized: &[f64]) -> Option<f32> {
        let threshold = f64::from(self.yin_threshold);
        let len = normalized.len();

        let mut tau = MIN_TAU;
        while tau < len {
            if normalized[tau] < threshold {
                while tau + 1 < len && normalized[tau + 1] < normalized[tau] {
                    tau += 1;
                }
                if self.parabolic_refinement && tau + 1 < len {
                    return Some(parabolic_vertex(normalized, tau));
                }
                return Some(tau as f32);
            }
            tau += 1;
        }
        None
    }
}

/// d'(tau) = d(tau) * tau / Σ_{j=1..tau} d(j), with d'(0) = 1
fn cumulative_mean_normalized(diff: &[f64]) -> Vec<f64> {
    let mut normalized = Vec::with_capacity(diff.len());
    if diff.is_empty() {
        return normalized;
    }
    normalized.push(1.0);

    let mut running_sum = 0.0_f64;
    for (tau, &d) in diff.iter().enumerate().skip(1) {
        running_sum += d;
        if running_sum > 0.0 {
            normalized.push(d * tau as f64 / running_sum);
        } else {
            normalized.push(1.0);
        }
    }
    normalized
}

/// Vertex of the parabola through (tau-1, tau, tau+1)
fn parabolic_vertex(values: &[f64], tau: usize) -> f32 {
    let a = values[tau - 1];
    let b = values[tau];
    let c = values[tau + 1];
    let denominator = a - 2.0 * b + c;
    if denominator.abs() < f64::EPSILON {
        return tau as f32;
    }
    let shift = 0.5 * (a - c) / denominator;
    (tau as f64 + shift.clamp(-1.0, 1.0)) as f32
}

/// Continuous MIDI pitch of a frequency (69 = A4 = 440 Hz)
pub fn frequency_to_midi(frequency_hz: f32) -> f32 {
    12.0 * (frequency_hz / 440.0).log2() + 69.0
}

/// Frequency of a (possibly fractional) MIDI pitch
pub fn midi_to_frequency(midi_note: f32) -> f32 {
    440.0 * 2.0_f32.powf((midi_note - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::PI;

    const SR: u32 = 44100;

    fn sine(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    #[test]
    fn test_sines_within_two_percent() {
        let detector = PitchDetector::with_window_size(2048);
        for freq in [
            80.0, 100.0, 146.8, 220.0, 261.6, 440.0, 523.3, 880.0, 1244.5, 1567.0, 1960.0, 2000.0,
        ] {
            let detected = detector.detect_frequency(&sine(freq, 2048, 0.5), SR);
            let error = (detected - freq).abs() / freq;
            assert!(
                error < 0.02,
                "freq {} detected {} ({:.2}% off)",
                freq,
                detected,
                error * 100.0
            );
        }
    }

    #[test]
    fn test_integer_lag_without_refinement() {
        let detector = PitchDetector::new(&PitchConfig {
            parabolic_refinement: false,
            ..PitchConfig::default()
        });
        // 441 Hz has an exact 100-sample period at 44.1 kHz
        let detected = detector.detect_frequency(&sine(441.0, 2048, 0.5), SR);
        assert_eq!(detected, 441.0);
    }

    #[test]
    fn test_silence_is_undetected() {
        let detector = PitchDetector::with_window_size(2048);
        assert_eq!(detector.detect_frequency(&[0.0; 2048], SR), 0.0);
    }

    #[test]
    fn test_constant_windows_are_undetected() {
        let detector = PitchDetector::with_window_size(2048);
        for step in -49..=50 {
            let level = step as f32 / 100.0;
            let detected = detector.detect_frequency(&[level; 2048], SR);
            assert_eq!(detected, 0.0, "DC {} detected as {} Hz", level, detected);
        }
    }

    #[test]
    fn test_constant_difference_is_exactly_zero() {
        let plan = DifferencePlan::new(2048);
        let diff = plan.difference(&[0.25; 2048]);
        assert!(diff.iter().all(|&d| d == 0.0));
        assert!(cumulative_mean_normalized(&diff).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_white_noise_is_undetected() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..2048).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let detector = PitchDetector::with_window_size(2048);
        assert_eq!(detector.detect_frequency(&noise, SR), 0.0);
    }

    #[test]
    fn test_other_window_lengths_are_planned_on_demand() {
        let detector = PitchDetector::with_window_size(2048);
        let detected = detector.detect_frequency(&sine(440.0, 1024, 0.5), SR);
        assert!((detected - 440.0).abs() / 440.0 < 0.02);
        assert_eq!(detector.detect_frequency(&[0.3; 4], SR), 0.0);
    }

    #[test]
    fn test_amplitude_does_not_change_pitch() {
        let detector = PitchDetector::with_window_size(2048);
        let quiet = detector.detect_frequency(&sine(330.0, 2048, 0.05), SR);
        let loud = detector.detect_frequency(&sine(330.0, 2048, 0.9), SR);
        assert!((quiet - loud).abs() < 0.5);
    }

    #[test]
    fn test_midi_reference_points_are_exact() {
        assert_eq!(frequency_to_midi(440.0), 69.0);
        assert_eq!(midi_to_frequency(69.0), 440.0);
        assert!((frequency_to_midi(880.0) - 81.0).abs() < 1e-4);
        assert!((midi_to_frequency(57.0) - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_midi_round_trip_over_voiced_range() {
        let mut freq = 80.0_f32;
        while freq <= 2000.0 {
            let back = midi_to_frequency(frequency_to_midi(freq));
            assert!((back - freq).abs() / freq < 1e-4, "{} -> {}", freq, back);
            freq *= 1.07;
        }
    }

    #[test]
    fn test_normalization_guards_zero_sum() {
        let normalized = cumulative_mean_normalized(&[0.0, 0.0, 0.0, 4.0]);
        assert_eq!(normalized, vec![1.0, 1.0, 1.0, 3.0]);
    }
}
