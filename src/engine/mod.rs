//! Engine module: capture devices, the recording session state machine and
//! the `EngineHandle` facade.
//!
//! `backend` holds the `CaptureDevice` trait and its implementations,
//! `session` turns one capture into a `DetectionResult`, and `core` pairs a
//! session with a playback engine behind shared telemetry.

pub mod backend;
pub mod core;
pub mod session;

#[cfg(feature = "live_audio")]
pub use backend::CpalCaptureDevice;
pub use backend::{BufferedCaptureDevice, CaptureDevice};
pub use core::EngineHandle;
pub use session::{RecordingSession, SessionState};
