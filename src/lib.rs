// Hum to Music - turns a hummed or beatboxed recording into notes and drum
// hits, and plays them back through a small synthesizer.
//
// Pipeline:
//   CaptureDevice → RecordingSession → AudioBuffer → FeatureExtractor
//     → DetectionResult { notes, percussion } → PlaybackEngine → SynthBackend

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{AudioBuffer, DetectionResult, FeatureExtractor, Note, PercussionHit, PercussionKind};
pub use config::AppConfig;
pub use engine::{EngineHandle, RecordingSession, SessionState};
pub use playback::{DrumKit, MelodyInstrument, PlaybackConfig, PlaybackEngine, ScheduleTiming};
