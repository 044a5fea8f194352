use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

const SR: u32 = 44100;

fn create_classifier() -> PercussionClassifier {
    PercussionClassifier::new(PercussionConfig::default()).unwrap()
}

fn features(energy: f32, centroid: f32) -> PercussionFeatures {
    PercussionFeatures { energy, centroid }
}

#[test]
fn test_loud_dark_window_is_kick() {
    let classifier = create_classifier();
    assert_eq!(
        classifier.classify_features(&features(0.2, 400.0)),
        PercussionKind::Kick
    );
}

#[test]
fn test_bright_window_is_hihat() {
    let classifier = create_classifier();
    assert_eq!(
        classifier.classify_features(&features(0.06, 5000.0)),
        PercussionKind::HiHat
    );
    // Loud and bright is still a hi-hat, kick needs a dark centroid
    assert_eq!(
        classifier.classify_features(&features(0.5, 5000.0)),
        PercussionKind::HiHat
    );
}

#[test]
fn test_loud_midrange_window_is_snare() {
    let classifier = create_classifier();
    assert_eq!(
        classifier.classify_features(&features(0.09, 1500.0)),
        PercussionKind::Snare
    );
    // Quiet dark windows miss the kick rule but still clear the snare rule
    assert_eq!(
        classifier.classify_features(&features(0.09, 500.0)),
        PercussionKind::Snare
    );
}

#[test]
fn test_quiet_window_is_unknown() {
    let classifier = create_classifier();
    assert_eq!(
        classifier.classify_features(&features(0.06, 1500.0)),
        PercussionKind::Unknown
    );
    assert_eq!(
        classifier.classify_features(&features(0.0, 0.0)),
        PercussionKind::Unknown
    );
}

#[test]
fn test_thresholds_are_strict() {
    let classifier = create_classifier();
    // energy == kick threshold does not count as "above"
    assert_eq!(
        classifier.classify_features(&features(0.1, 400.0)),
        PercussionKind::Snare
    );
    assert_eq!(
        classifier.classify_features(&features(0.08, 1500.0)),
        PercussionKind::Unknown
    );
}

#[test]
fn test_custom_thresholds_are_honoured() {
    let classifier = PercussionClassifier::new(PercussionConfig {
        kick_max_centroid_hz: 200.0,
        ..PercussionConfig::default()
    })
    .unwrap();
    assert_eq!(
        classifier.classify_features(&features(0.2, 400.0)),
        PercussionKind::Snare
    );
}

#[test]
fn test_low_sine_window_classifies_as_kick() {
    let classifier = create_classifier();
    let window: Vec<f32> = (0..1024)
        .map(|i| 0.8 * (2.0 * PI * 86.13 * i as f32 / SR as f32).sin())
        .collect();
    assert_eq!(
        classifier.classify(&window, SR).unwrap(),
        PercussionKind::Kick
    );
}

#[test]
fn test_white_noise_window_classifies_as_hihat() {
    let classifier = create_classifier();
    let mut rng = StdRng::seed_from_u64(42);
    let window: Vec<f32> = (0..1024).map(|_| rng.gen_range(-0.3..0.3)).collect();

    let measured = classifier.features(&window, SR).unwrap();
    assert!(measured.centroid > 2000.0, "centroid {}", measured.centroid);
    assert_eq!(
        classifier.classify(&window, SR).unwrap(),
        PercussionKind::HiHat
    );
}

#[test]
fn test_non_power_of_two_window_is_rejected() {
    let classifier = create_classifier();
    assert!(matches!(
        classifier.classify(&[0.2; 1000], SR),
        Err(ExtractionError::InvalidWindowLength { length: 1000 })
    ));
    assert!(PercussionClassifier::new(PercussionConfig {
        window_size: 1000,
        ..PercussionConfig::default()
    })
    .is_err());
}
