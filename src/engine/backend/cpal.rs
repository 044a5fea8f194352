//! CPAL-based microphone capture for desktop platforms (Linux, macOS, Windows)
//!
//! The input callback only copies samples into pre-allocated chunks; a
//! collector thread drains filled chunks into the take. Only one input
//! stream may be open per process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::buffer_pool::{chunk_len_for_interval, ChunkCollector, ChunkPool, ChunkWriter};
use crate::audio::codec::encode_wav;
use crate::config::CaptureConfig;
use crate::error::{log_device_error, DeviceAccessError};

use super::CaptureDevice;

/// Process-wide claim on the input device
static DEVICE_CLAIMED: AtomicBool = AtomicBool::new(false);

/// How long `finish` waits for the callback to hand over its last chunk
const FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// Flags shared between the input callback and the control thread
#[derive(Default)]
struct CallbackFlags {
    flush_requested: AtomicBool,
    flushed: AtomicBool,
    stop_collector: AtomicBool,
    dropped_samples: AtomicUsize,
}

struct ActiveCapture {
    stream: cpal::Stream,
    flags: Arc<CallbackFlags>,
    collector: JoinHandle<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

/// Default-input-device capture
pub struct CpalCaptureDevice {
    active: Option<ActiveCapture>,
}

impl CpalCaptureDevice {
    pub fn new() -> Self {
        Self { active: None }
    }

    fn build_stream(
        config: &CaptureConfig,
        flags: Arc<CallbackFlags>,
    ) -> Result<(cpal::Stream, ChunkCollector, u16, u32), DeviceAccessError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(DeviceAccessError::NoInputDevice)?;

        let supported = device
            .default_input_config()
            .map_err(|e| DeviceAccessError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = supported.config();
        let channels = stream_config.channels;
        let sample_rate = stream_config.sample_rate.0;

        let chunk_len = chunk_len_for_interval(sample_rate, channels, config.chunk_interval_ms);
        let (writer, collector) = ChunkPool::new(config.chunk_pool_size, chunk_len);

        let err_fn = |err| log::error!("[CpalCaptureDevice] Input stream error: {}", err);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let mut writer = writer;
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        writer.write(data);
                        Self::after_write(&mut writer, &flags);
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let mut writer = writer;
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let mut scratch = [0.0_f32; 256];
                        for block in data.chunks(scratch.len()) {
                            for (dst, &src) in scratch.iter_mut().zip(block) {
                                *dst = f32::from(src) / 32768.0;
                            }
                            writer.write(&scratch[..block.len()]);
                        }
                        Self::after_write(&mut writer, &flags);
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(DeviceAccessError::StreamOpenFailed {
                    reason: format!("Unsupported input sample format {:?}", other),
                })
            }
        }
        .map_err(|e| DeviceAccessError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        Ok((stream, collector, channels, sample_rate))
    }

    fn after_write(writer: &mut ChunkWriter, flags: &CallbackFlags) {
        flags
            .dropped_samples
            .store(writer.dropped_samples(), Ordering::Relaxed);
        if flags.flush_requested.load(Ordering::Acquire) && !flags.flushed.load(Ordering::Relaxed)
        {
            writer.flush();
            flags.flushed.store(true, Ordering::Release);
        }
    }

    fn spawn_collector(
        mut collector: ChunkCollector,
        flags: Arc<CallbackFlags>,
        interval: Duration,
    ) -> Result<JoinHandle<Vec<f32>>, DeviceAccessError> {
        thread::Builder::new()
            .name("hum-capture-collector".to_string())
            .spawn(move || {
                while !flags.stop_collector.load(Ordering::Acquire) {
                    collector.drain();
                    thread::sleep(interval);
                }
                collector.take_recording()
            })
            .map_err(DeviceAccessError::from)
    }

    fn shutdown(active: ActiveCapture) -> (Vec<f32>, usize) {
        let ActiveCapture {
            stream,
            flags,
            collector,
            ..
        } = active;

        flags.flush_requested.store(true, Ordering::Release);
        let deadline = Instant::now() + FLUSH_TIMEOUT;
        while !flags.flushed.load(Ordering::Acquire) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if let Err(err) = stream.pause() {
            log::warn!("[CpalCaptureDevice] Failed to pause stream: {}", err);
        }
        drop(stream);

        flags.stop_collector.store(true, Ordering::Release);
        let recording = collector.join().unwrap_or_else(|_| {
            log::error!("[CpalCaptureDevice] Collector thread panicked");
            Vec::new()
        });
        DEVICE_CLAIMED.store(false, Ordering::Release);

        (recording, flags.dropped_samples.load(Ordering::Relaxed))
    }
}

impl Default for CpalCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for CpalCaptureDevice {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), DeviceAccessError> {
        if DEVICE_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DeviceAccessError::DeviceBusy);
        }

        let flags = Arc::new(CallbackFlags::default());
        let opened = Self::build_stream(config, Arc::clone(&flags)).and_then(
            |(stream, collector, channels, sample_rate)| {
                let interval = Duration::from_millis(u64::from(config.chunk_interval_ms.max(10)) / 2);
                let collector = Self::spawn_collector(collector, Arc::clone(&flags), interval)?;
                stream.play().map_err(|e| DeviceAccessError::StreamOpenFailed {
                    reason: format!("Failed to start input stream: {:?}", e),
                })?;
                Ok(ActiveCapture {
                    stream,
                    flags: Arc::clone(&flags),
                    collector,
                    channels,
                    sample_rate,
                })
            },
        );

        match opened {
            Ok(active) => {
                log::info!(
                    "[CpalCaptureDevice] Capturing {} ch @ {} Hz",
                    active.channels,
                    active.sample_rate
                );
                self.active = Some(active);
                Ok(())
            }
            Err(err) => {
                // Stop a collector that may already be running
                flags.stop_collector.store(true, Ordering::Release);
                DEVICE_CLAIMED.store(false, Ordering::Release);
                log_device_error(&err, "CpalCaptureDevice::open");
                Err(err)
            }
        }
    }

    fn finish(&mut self) -> Result<Vec<u8>, DeviceAccessError> {
        let active = self.active.take().ok_or(DeviceAccessError::NotOpen)?;
        let (channels, sample_rate) = (active.channels, active.sample_rate);

        let (recording, dropped) = Self::shutdown(active);
        if dropped > 0 {
            log::warn!(
                "[CpalCaptureDevice] Dropped {} samples (chunk pool exhausted)",
                dropped
            );
        }

        encode_wav(&recording, channels, sample_rate).map_err(|err| {
            DeviceAccessError::StreamFailure {
                reason: format!("WAV encoding failed: {}", err),
            }
        })
    }

    fn release(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = Self::shutdown(active);
        }
    }

    fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for CpalCaptureDevice {
    fn drop(&mut self) {
        self.release();
    }
}
