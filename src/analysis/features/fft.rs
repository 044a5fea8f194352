// FFT module - radix-2 Fourier transform over analysis windows
//
// Windows are transformed without tapering so the magnitude spectrum matches
// the raw frame. Only power-of-two lengths are accepted; anything else is an
// extraction error rather than a silently truncated transform.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::ExtractionError;

/// Planned forward FFT for one window length
///
/// The plan is built once and shared across windows (and threads, since
/// rustfft plans are `Send + Sync`).
#[derive(Clone)]
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
}

impl FftProcessor {
    /// Plan a forward transform of `fft_size` points
    ///
    /// # Errors
    /// `ExtractionError::InvalidWindowLength` unless `fft_size` is a power of two
    pub fn new(fft_size: usize) -> Result<Self, ExtractionError> {
        validate_length(fft_size)?;
        let mut planner = FftPlanner::new();
        Ok(Self {
            fft: planner.plan_fft_forward(fft_size),
            fft_size,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Transform a real window into its full complex spectrum
    ///
    /// # Errors
    /// `ExtractionError::InvalidWindowLength` if `samples` is not exactly
    /// `fft_size` long
    pub fn transform(&self, samples: &[f32]) -> Result<Vec<Complex<f32>>, ExtractionError> {
        if samples.len() != self.fft_size {
            return Err(ExtractionError::InvalidWindowLength {
                length: samples.len(),
            });
        }

        let mut buffer: Vec<Complex<f32>> =
            samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        self.fft.process(&mut buffer);
        Ok(buffer)
    }

    /// Magnitudes of bins `0..fft_size/2`
    pub fn magnitude_spectrum(&self, samples: &[f32]) -> Result<Vec<f32>, ExtractionError> {
        let spectrum = self.transform(samples)?;
        Ok(spectrum[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm())
            .collect())
    }
}

/// One-shot FFT of a real sequence whose length is a power of two
///
/// Output has the same length as the input; bin `k` corresponds to
/// `k * sample_rate / N` Hz.
pub fn fft(samples: &[f32]) -> Result<Vec<Complex<f32>>, ExtractionError> {
    FftProcessor::new(samples.len())?.transform(samples)
}

fn validate_length(length: usize) -> Result<(), ExtractionError> {
    if length.is_power_of_two() {
        Ok(())
    } else {
        Err(ExtractionError::InvalidWindowLength { length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_fft_rejects_non_power_of_two() {
        assert_eq!(
            fft(&[0.0; 1000]).unwrap_err(),
            ExtractionError::InvalidWindowLength { length: 1000 }
        );
        assert!(fft(&[]).is_err());
    }

    #[test]
    fn test_fft_single_sample_is_identity() {
        let out = fft(&[0.75]).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].re - 0.75).abs() < 1e-6);
        assert!(out[0].im.abs() < 1e-6);
    }

    #[test]
    fn test_fft_dc_lands_in_bin_zero() {
        let out = fft(&[1.0; 8]).unwrap();
        assert!((out[0].re - 8.0).abs() < 1e-4);
        for bin in &out[1..] {
            assert!(bin.norm() < 1e-4);
        }
    }

    #[test]
    fn test_fft_sine_peaks_at_its_bin() {
        let n = 64;
        let k = 5;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * k as f32 * i as f32 / n as f32).sin())
            .collect();

        let processor = FftProcessor::new(n).unwrap();
        let mags = processor.magnitude_spectrum(&samples).unwrap();
        assert_eq!(mags.len(), n / 2);

        let peak = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, k);
        assert!((mags[k] - n as f32 / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_processor_rejects_mismatched_window() {
        let processor = FftProcessor::new(16).unwrap();
        assert!(matches!(
            processor.transform(&[0.0; 8]),
            Err(ExtractionError::InvalidWindowLength { length: 8 })
        ));
    }
}
