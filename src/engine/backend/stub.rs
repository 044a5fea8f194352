use crate::audio::buffer_pool::{chunk_len_for_interval, ChunkCollector, ChunkPool, ChunkWriter};
use crate::audio::codec::encode_wav;
use crate::config::CaptureConfig;
use crate::error::DeviceAccessError;

use super::CaptureDevice;

/// Samples handed to the chunk writer per simulated callback.
const CALLBACK_BLOCK: usize = 512;

enum Take {
    Samples {
        interleaved: Vec<f32>,
        channels: u16,
        sample_rate: u32,
    },
    Encoded(Vec<u8>),
}

/// Capture device that "records" a pre-loaded take.
///
/// Used by tests and by the CLI when analysing files. Samples travel through
/// the same chunk pool and WAV encoding as a live microphone, in
/// callback-sized blocks. A failure can be injected to simulate a denied
/// permission or a busy device.
pub struct BufferedCaptureDevice {
    take: Take,
    open_failure: Option<DeviceAccessError>,
    pool: Option<(ChunkWriter, ChunkCollector)>,
    opened_count: usize,
}

impl BufferedCaptureDevice {
    /// Device that will capture interleaved `samples`
    pub fn new(interleaved: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            take: Take::Samples {
                interleaved,
                channels: channels.max(1),
                sample_rate,
            },
            open_failure: None,
            pool: None,
            opened_count: 0,
        }
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, 1, sample_rate)
    }

    /// Device whose `finish` returns `bytes` verbatim (for decode failures)
    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        Self {
            take: Take::Encoded(bytes),
            open_failure: None,
            pool: None,
            opened_count: 0,
        }
    }

    /// Make every `open` fail with `err`
    pub fn with_open_failure(mut self, err: DeviceAccessError) -> Self {
        self.open_failure = Some(err);
        self
    }

    /// Number of successful opens so far
    pub fn opened_count(&self) -> usize {
        self.opened_count
    }

    fn capture_samples(
        writer: &mut ChunkWriter,
        collector: &mut ChunkCollector,
        interleaved: &[f32],
    ) -> Vec<f32> {
        for block in interleaved.chunks(CALLBACK_BLOCK) {
            writer.write(block);
            collector.drain();
        }
        writer.flush();

        if writer.dropped_samples() > 0 {
            log::warn!(
                "[BufferedCaptureDevice] Dropped {} samples (chunk pool exhausted)",
                writer.dropped_samples()
            );
        }
        collector.take_recording()
    }
}

impl CaptureDevice for BufferedCaptureDevice {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), DeviceAccessError> {
        if let Some(err) = &self.open_failure {
            return Err(err.clone());
        }
        if self.pool.is_some() {
            return Err(DeviceAccessError::DeviceBusy);
        }

        let (channels, sample_rate) = match &self.take {
            Take::Samples {
                channels,
                sample_rate,
                ..
            } => (*channels, *sample_rate),
            Take::Encoded(_) => (1, 44_100),
        };
        let chunk_len = chunk_len_for_interval(sample_rate, channels, config.chunk_interval_ms);
        self.pool = Some(ChunkPool::new(config.chunk_pool_size, chunk_len));
        self.opened_count += 1;

        log::debug!(
            "[BufferedCaptureDevice] Opened ({} ch @ {} Hz, {} samples per chunk)",
            channels,
            sample_rate,
            chunk_len
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, DeviceAccessError> {
        let Some((mut writer, mut collector)) = self.pool.take() else {
            return Err(DeviceAccessError::NotOpen);
        };

        match &self.take {
            Take::Samples {
                interleaved,
                channels,
                sample_rate,
            } => {
                let recording = Self::capture_samples(&mut writer, &mut collector, interleaved);
                encode_wav(&recording, *channels, *sample_rate).map_err(|err| {
                    DeviceAccessError::StreamFailure {
                        reason: format!("WAV encoding failed: {}", err),
                    }
                })
            }
            Take::Encoded(bytes) => Ok(bytes.clone()),
        }
    }

    fn release(&mut self) {
        if self.pool.take().is_some() {
            log::debug!("[BufferedCaptureDevice] Released without finishing");
        }
    }

    fn is_open(&self) -> bool {
        self.pool.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::{AudioDecoder, WavDecoder};

    #[test]
    fn test_finish_round_trips_samples_through_the_pool() {
        let samples: Vec<f32> = (0..10_000).map(|i| (i % 100) as f32 / 100.0).collect();
        let mut device = BufferedCaptureDevice::from_mono(samples.clone(), 8000);

        device.open(&CaptureConfig::default()).unwrap();
        assert!(device.is_open());
        let bytes = device.finish().unwrap();
        assert!(!device.is_open());

        let buffer = WavDecoder.decode(&bytes).unwrap();
        assert_eq!(buffer.samples(), samples.as_slice());
        assert_eq!(buffer.sample_rate(), 8000);
    }

    #[test]
    fn test_injected_failure_is_reported_on_open() {
        let mut device = BufferedCaptureDevice::from_mono(vec![0.0; 10], 8000)
            .with_open_failure(DeviceAccessError::PermissionDenied);

        assert_eq!(
            device.open(&CaptureConfig::default()),
            Err(DeviceAccessError::PermissionDenied)
        );
        assert!(!device.is_open());
        assert_eq!(device.opened_count(), 0);
    }

    #[test]
    fn test_double_open_is_busy_and_finish_requires_open() {
        let mut device = BufferedCaptureDevice::from_mono(vec![0.0; 10], 8000);
        assert_eq!(device.finish(), Err(DeviceAccessError::NotOpen));

        device.open(&CaptureConfig::default()).unwrap();
        assert_eq!(
            device.open(&CaptureConfig::default()),
            Err(DeviceAccessError::DeviceBusy)
        );

        device.release();
        assert!(!device.is_open());
        device.release();
    }

    #[test]
    fn test_encoded_take_is_returned_verbatim() {
        let mut device = BufferedCaptureDevice::from_encoded(b"garbage".to_vec());
        device.open(&CaptureConfig::default()).unwrap();
        assert_eq!(device.finish().unwrap(), b"garbage".to_vec());
    }
}
