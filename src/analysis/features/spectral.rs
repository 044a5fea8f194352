// Spectral module - frequency-domain features
//
// The centroid is the only spectral feature the percussion rules use. It is
// computed over the lower half of the spectrum of the raw window.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description

use super::fft::FftProcessor;
use crate::error::ExtractionError;

/// Compute spectral centroid (weighted mean frequency)
///
/// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]| for i in 0..N/2,
/// with f_i = i × sample_rate / N.
///
/// # Returns
/// Centroid in Hz, or 0.0 when the spectrum carries no energy
///
/// # Errors
/// `ExtractionError::InvalidWindowLength` if the window is not a power of two
pub fn spectral_centroid(samples: &[f32], sample_rate: u32) -> Result<f32, ExtractionError> {
    let processor = FftProcessor::new(samples.len())?;
    centroid_with(&processor, samples, sample_rate)
}

/// Centroid using a pre-planned transform
pub fn centroid_with(
    processor: &FftProcessor,
    samples: &[f32],
    sample_rate: u32,
) -> Result<f32, ExtractionError> {
    let spectrum = processor.magnitude_spectrum(samples)?;
    Ok(centroid_from_magnitudes(
        &spectrum,
        sample_rate,
        processor.fft_size(),
    ))
}

/// Centroid of an already computed half spectrum
pub fn centroid_from_magnitudes(spectrum: &[f32], sample_rate: u32, fft_size: usize) -> f32 {
    let freq_bin_width = sample_rate as f32 / fft_size as f32;

    let mut weighted_sum = 0.0_f32;
    let mut magnitude_sum = 0.0_f32;
    for (i, &mag) in spectrum.iter().enumerate() {
        weighted_sum += i as f32 * freq_bin_width * mag;
        magnitude_sum += mag;
    }

    if magnitude_sum > 0.0 {
        weighted_sum / magnitude_sum
    } else {
        0.0
    }
}
