use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

const SR: u32 = 44100;

fn seconds(s: f32) -> usize {
    (s * SR as f32) as usize
}

fn write_sine(samples: &mut [f32], start: usize, len: usize, freq: f32, amplitude: f32) {
    for i in 0..len {
        samples[start + i] = amplitude * (2.0 * PI * freq * i as f32 / SR as f32).sin();
    }
}

fn write_noise(samples: &mut [f32], start: usize, len: usize, amplitude: f32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..len {
        samples[start + i] = rng.gen_range(-amplitude..amplitude);
    }
}

/// 0.25 s lead-in, then four 0.5 s bursts of A4 each followed by 0.5 s silence
fn four_bursts() -> Vec<f32> {
    let mut samples = vec![0.0; seconds(4.25)];
    for burst in 0..4 {
        let start = seconds(0.25 + burst as f32);
        write_sine(&mut samples, start, seconds(0.5), 440.0, 0.1);
    }
    samples
}

fn create_extractor() -> FeatureExtractor {
    FeatureExtractor::new(&AppConfig::default()).unwrap()
}

fn extractor_with(edit: impl FnOnce(&mut AppConfig)) -> FeatureExtractor {
    let mut config = AppConfig::default();
    edit(&mut config);
    FeatureExtractor::new(&config).unwrap()
}

#[test]
fn test_silent_buffer_yields_nothing() {
    let buffer = AudioBuffer::from_mono(vec![0.0; seconds(1.0)], SR).unwrap();
    let result = create_extractor().extract(&buffer).unwrap();
    assert!(result.notes.is_empty());
    assert!(result.percussion.is_empty());
}

#[test]
fn test_constant_offset_yields_no_notes() {
    for level in [-0.5, 0.05, 0.25] {
        let buffer = AudioBuffer::from_mono(vec![level; seconds(1.0)], SR).unwrap();
        let result = create_extractor().extract(&buffer).unwrap();
        assert!(result.notes.is_empty(), "DC {}: {:?}", level, result.notes);
    }
}

#[test]
fn test_buffer_shorter_than_window_yields_nothing() {
    let buffer = AudioBuffer::from_mono(vec![0.5; 1000], SR).unwrap();
    let result = create_extractor().extract(&buffer).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_four_bursts_yield_four_notes() {
    let samples = four_bursts();
    assert!(samples.len() > 100_000, "fixture should exercise the offload path");

    let extractor = create_extractor();
    assert!(matches!(
        extractor.pitch_pass_mode(samples.len()),
        PitchPassMode::Offloaded { .. }
    ));

    let buffer = AudioBuffer::from_mono(samples, SR).unwrap();
    let result = extractor.extract(&buffer).unwrap();

    assert_eq!(result.notes.len(), 4, "notes: {:?}", result.notes);
    for (i, note) in result.notes.iter().enumerate() {
        let burst_start = 0.25 + i as f32;
        assert!(note.duration_seconds >= 0.1);
        assert!(
            (note.start_time_seconds - burst_start).abs() < 0.06,
            "note {} starts at {}",
            i,
            note.start_time_seconds
        );
        assert!(
            (note.midi_note - 69.0).abs() < 0.3,
            "note {} pitch {}",
            i,
            note.midi_note
        );
        assert!((0.0..=1.0).contains(&note.velocity));
    }
    assert!(result
        .notes
        .windows(2)
        .all(|w| w[0].start_time_seconds <= w[1].start_time_seconds));
}

#[test]
fn test_offloaded_pass_matches_synchronous_pass() {
    let samples = four_bursts();
    let extractor = create_extractor();

    let sync = extractor.pitch_candidates(&samples, SR);
    for workers in [1, 3, 8] {
        let offloaded = extractor
            .pitch_candidates_offloaded(&samples, SR, workers)
            .unwrap();
        assert_eq!(sync, offloaded, "{} workers", workers);
    }
    assert!(!sync.is_empty());
}

#[test]
fn test_extract_is_path_independent() {
    let buffer = AudioBuffer::from_mono(four_bursts(), SR).unwrap();

    let sync = extractor_with(|c| c.extraction.offload_threshold_samples = usize::MAX);
    let offloaded = extractor_with(|c| {
        c.extraction.offload_threshold_samples = 0;
        c.extraction.worker_threads = 4;
    });

    assert_eq!(sync.pitch_pass_mode(buffer.len()), PitchPassMode::Synchronous);
    assert_eq!(
        sync.extract(&buffer).unwrap(),
        offloaded.extract(&buffer).unwrap()
    );
}

#[test]
fn test_fixed_offload_duration_is_opt_in() {
    let samples = four_bursts();
    let extractor = extractor_with(|c| {
        c.extraction.offload_threshold_samples = 0;
        c.extraction.offload_note_duration_seconds = Some(0.2);
    });

    let buffer = AudioBuffer::from_mono(samples, SR).unwrap();
    let result = extractor.extract(&buffer).unwrap();
    assert_eq!(result.notes.len(), 4);
    for note in &result.notes {
        // Candidates are 0.2 s long; merging only ever extends them
        assert!(note.duration_seconds >= 0.2);
    }
}

#[test]
fn test_close_percussion_onsets_collapse_to_one_hit() {
    let mut samples = vec![0.0; seconds(1.0)];
    write_noise(&mut samples, seconds(0.5), seconds(0.01), 0.8, 1);
    write_noise(&mut samples, seconds(0.55), seconds(0.01), 0.8, 2);

    let buffer = AudioBuffer::from_mono(samples, SR).unwrap();
    let result = create_extractor().extract(&buffer).unwrap();

    assert_eq!(result.percussion.len(), 1, "hits: {:?}", result.percussion);
    let hit = result.percussion[0];
    assert_eq!(hit.kind, PercussionKind::HiHat);
    assert!(hit.start_time_seconds < 0.5 && hit.start_time_seconds > 0.45);
}

#[test]
fn test_separated_percussion_onsets_are_kept() {
    let mut samples = vec![0.0; seconds(1.0)];
    write_noise(&mut samples, seconds(0.2), seconds(0.01), 0.8, 3);
    write_noise(&mut samples, seconds(0.6), seconds(0.01), 0.8, 4);

    let buffer = AudioBuffer::from_mono(samples, SR).unwrap();
    let result = create_extractor().extract(&buffer).unwrap();

    assert_eq!(result.percussion.len(), 2);
    assert!(result.percussion[0].start_time_seconds < result.percussion[1].start_time_seconds);
    for hit in &result.percussion {
        assert!((0.0..=1.0).contains(&hit.velocity));
        assert_ne!(hit.kind, PercussionKind::Unknown);
    }
}

#[test]
fn test_non_finite_sample_is_rejected() {
    let mut samples = vec![0.0; 4096];
    samples[1234] = f32::NAN;
    let buffer = AudioBuffer::from_mono(samples, SR).unwrap();

    assert_eq!(
        create_extractor().extract(&buffer),
        Err(ExtractionError::NonFiniteSample { index: 1234 })
    );
}

#[test]
fn test_note_duration_scan_stops_at_silence() {
    let mut samples = vec![0.0; seconds(1.0)];
    write_sine(&mut samples, 0, seconds(0.3), 220.0, 0.5);

    let duration = create_extractor().estimate_note_duration(&samples, 0, SR);
    assert!((duration - 0.3).abs() < 0.01, "duration {}", duration);
}

#[test]
fn test_note_duration_has_floor() {
    let samples = vec![0.0; seconds(1.0)];
    let duration = create_extractor().estimate_note_duration(&samples, 0, SR);
    assert_eq!(duration, 0.1);
}

#[test]
fn test_note_duration_running_to_end_falls_back_to_minimum() {
    let mut samples = vec![0.0; seconds(1.0)];
    write_sine(&mut samples, 0, seconds(1.0), 220.0, 0.5);

    // 0.5 s of tone remain, but the scan never sees it end
    let duration = create_extractor().estimate_note_duration(&samples, seconds(0.5), SR);
    assert_eq!(duration, 0.1);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut config = AppConfig::default();
    config.pitch.window_size = 2000;
    assert!(matches!(
        FeatureExtractor::new(&config),
        Err(ExtractionError::InvalidWindowLength { length: 2000 })
    ));
}

#[test]
fn test_window_starts_never_read_past_end() {
    let starts: Vec<usize> = window_starts(10, 4, 3).collect();
    assert_eq!(starts, vec![0, 3, 6]);
    assert_eq!(window_starts(3, 4, 1).count(), 0);
    assert_eq!(window_starts(4, 4, 1).collect::<Vec<_>>(), vec![0]);
}
