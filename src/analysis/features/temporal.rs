// Temporal module - time-domain loudness measures
//
// Both measures return 0.0 for an empty slice so callers can feed trailing
// partial blocks without special-casing them.

/// Root mean square of a window
///
/// Formula: sqrt(Σx² / N)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Mean absolute amplitude of a window
///
/// Formula: Σ|x| / N
pub fn mean_abs_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_abs: f32 = samples.iter().map(|s| s.abs()).sum();
    sum_abs / samples.len() as f32
}
