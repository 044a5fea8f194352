// Analysis module - turns a decoded recording into notes and drum hits
//
// Pipeline:
//   AudioBuffer ─┬─ pitch pass (PitchDetector / YIN) ──────→ smooth_notes ──────→ notes
//                └─ percussion pass (PercussionClassifier) → filter_percussion → percussion
//
// Everything here is pure: no device access, no globals. The only
// concurrency is the scoped worker split inside FeatureExtractor.

pub mod classifier;
pub mod extractor;
pub mod features;
pub mod pitch;
pub mod postprocess;
pub mod types;

pub use classifier::{PercussionClassifier, PercussionFeatures};
pub use extractor::{FeatureExtractor, PitchPassMode};
pub use pitch::{frequency_to_midi, midi_to_frequency, PitchDetector};
pub use postprocess::{filter_percussion, smooth_notes};
pub use types::{AudioBuffer, DetectionResult, Note, PercussionHit, PercussionKind};
