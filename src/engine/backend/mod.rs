//! Capture device abstractions for the recording session.
//!
//! A device is opened once per recording, buffers audio in fixed-interval
//! chunks while open, and on `finish` hands back the whole take as encoded
//! (WAV) bytes.

use crate::config::CaptureConfig;
use crate::error::DeviceAccessError;

/// Trait implemented by microphone backends.
///
/// Implementations must tolerate `release` being called at any time,
/// including when nothing is open.
pub trait CaptureDevice {
    /// Acquire the device exclusively and start buffering chunks.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), DeviceAccessError>;

    /// Stop capturing, release the device and return the encoded take.
    fn finish(&mut self) -> Result<Vec<u8>, DeviceAccessError>;

    /// Abort capture and release the device, discarding buffered audio.
    fn release(&mut self);

    fn is_open(&self) -> bool;
}

mod stub;
pub use stub::BufferedCaptureDevice;

#[cfg(feature = "live_audio")]
mod cpal;
#[cfg(feature = "live_audio")]
pub use self::cpal::CpalCaptureDevice;
