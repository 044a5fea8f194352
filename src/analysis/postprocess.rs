// Post-processing - turn raw per-window candidates into final sequences
//
// Pitch candidates overlap heavily (a 2048-sample window every 512 samples),
// so consecutive candidates that start inside the current note are folded
// into it. Percussion candidates fire on every hop of a loud onset, so only
// the first hit of each cluster is kept.

use crate::analysis::types::{Note, PercussionHit};

/// Merge candidates whose start falls inside the current note
///
/// The merged note keeps the pitch and start of its first candidate,
/// stretches to cover the latest end and takes the highest velocity.
/// Input must be ordered by start.
pub fn smooth_notes(candidates: &[Note]) -> Vec<Note> {
    let mut smoothed = Vec::new();
    let mut current: Option<Note> = None;

    for &note in candidates {
        match current.as_mut() {
            Some(cur) if note.start_time_seconds <= cur.start_time_seconds + cur.duration_seconds => {
                let end = note.start_time_seconds + note.duration_seconds;
                cur.duration_seconds = cur.duration_seconds.max(end - cur.start_time_seconds);
                cur.velocity = cur.velocity.max(note.velocity);
            }
            _ => {
                if let Some(done) = current.replace(note) {
                    smoothed.push(done);
                }
            }
        }
    }

    smoothed.extend(current);
    smoothed
}

/// Drop hits that start within `min_interval_seconds` of the last kept hit
///
/// Spacing is global: a snare right after a kick is dropped too.
pub fn filter_percussion(candidates: &[PercussionHit], min_interval_seconds: f32) -> Vec<PercussionHit> {
    let mut filtered: Vec<PercussionHit> = Vec::new();

    for &hit in candidates {
        let keep = filtered
            .last()
            .map_or(true, |last| hit.start_time_seconds - last.start_time_seconds > min_interval_seconds);
        if keep {
            filtered.push(hit);
        }
    }

    filtered
}
