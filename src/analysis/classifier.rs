// Classifier - rule-based percussion labelling
//
// Each window is reduced to two features: mean absolute energy (loudness)
// and spectral centroid (brightness). A short decision list maps them to a
// drum class:
//
// 1. energy > KICK_ENERGY  AND centroid < KICK_MAX_CENTROID  → Kick
// 2. energy > HIHAT_ENERGY AND centroid > HIHAT_MIN_CENTROID → HiHat
// 3. energy > SNARE_ENERGY                                   → Snare
// 4. otherwise                                               → Unknown
//
// The first matching rule wins. Thresholds come from PercussionConfig.

use crate::analysis::features::{centroid_with, mean_abs_energy, FftProcessor};
use crate::analysis::types::PercussionKind;
use crate::config::PercussionConfig;
use crate::error::ExtractionError;

/// Features the decision list looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercussionFeatures {
    /// Mean absolute amplitude
    pub energy: f32,
    /// Spectral centroid in Hz
    pub centroid: f32,
}

/// PercussionClassifier applies the decision list to analysis windows
///
/// Holds a planned FFT for the configured window size; windows of any other
/// power-of-two length are planned on demand.
#[derive(Clone)]
pub struct PercussionClassifier {
    config: PercussionConfig,
    fft: FftProcessor,
}

impl PercussionClassifier {
    /// Create a classifier from percussion thresholds
    ///
    /// # Errors
    /// `ExtractionError::InvalidWindowLength` if `config.window_size` is not a
    /// power of two
    pub fn new(config: PercussionConfig) -> Result<Self, ExtractionError> {
        let fft = FftProcessor::new(config.window_size)?;
        Ok(Self { config, fft })
    }

    /// Measure energy and centroid of a window
    pub fn features(
        &self,
        window: &[f32],
        sample_rate: u32,
    ) -> Result<PercussionFeatures, ExtractionError> {
        let energy = mean_abs_energy(window);
        let centroid = if window.len() == self.fft.fft_size() {
            centroid_with(&self.fft, window, sample_rate)?
        } else {
            centroid_with(&FftProcessor::new(window.len())?, window, sample_rate)?
        };
        Ok(PercussionFeatures { energy, centroid })
    }

    /// Classify a window
    ///
    /// # Errors
    /// `ExtractionError::InvalidWindowLength` if the window length is not a
    /// power of two
    pub fn classify(
        &self,
        window: &[f32],
        sample_rate: u32,
    ) -> Result<PercussionKind, ExtractionError> {
        let features = self.features(window, sample_rate)?;
        Ok(self.classify_features(&features))
    }

    /// Apply the decision list to pre-computed features
    pub fn classify_features(&self, features: &PercussionFeatures) -> PercussionKind {
        let cfg = &self.config;
        let PercussionFeatures { energy, centroid } = *features;

        if energy > cfg.kick_energy && centroid < cfg.kick_max_centroid_hz {
            PercussionKind::Kick
        } else if energy > cfg.hihat_energy && centroid > cfg.hihat_min_centroid_hz {
            PercussionKind::HiHat
        } else if energy > cfg.snare_energy {
            PercussionKind::Snare
        } else {
            PercussionKind::Unknown
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
