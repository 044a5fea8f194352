// Sample window math - the DSP primitives shared by both analysis passes
//
// Module organization:
// - fft: radix-2 transform (power-of-two lengths only)
// - spectral: spectral centroid
// - temporal: rms and mean absolute energy
//
// All functions are pure and operate on borrowed windows; no allocation
// escapes except the returned spectra.

mod fft;
mod spectral;
mod temporal;

pub use fft::{fft, FftProcessor};
pub use rustfft::num_complex::Complex;
pub use spectral::{centroid_from_magnitudes, centroid_with, spectral_centroid};
pub use temporal::{mean_abs_energy, rms};
