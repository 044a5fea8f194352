//! CPAL speaker output for desktop platforms.
//!
//! `cpal::Stream` cannot leave the thread that built it, so the stream lives
//! on a dedicated "hum-output" thread for the lifetime of the `CpalOutput`.
//! Triggers reach the output callback through an rtrb command queue; the
//! callback mixes voices from a pre-allocated pool and never allocates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::{log_playback_error, PlaybackError};

use super::backend::SynthBackend;
use super::schedule::ScheduledEvent;
use super::voice::Voice;

/// Simultaneous voices the callback will mix
const MAX_VOICES: usize = 64;

/// Pending commands between the scheduler and the callback
const COMMAND_QUEUE_CAPACITY: usize = 256;

enum VoiceCommand {
    Trigger(Box<Voice>),
    Silence,
}

/// Real-time output on the default output device
pub struct CpalOutput {
    commands: Mutex<Producer<VoiceCommand>>,
    sample_rate: u32,
    next_seed: AtomicU64,
    shutdown: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the default output device and start its stream
    ///
    /// # Errors
    /// `OutputUnavailable` if no device, config or F32 stream is available
    pub fn open() -> Result<Self, PlaybackError> {
        let (producer, consumer) = RingBuffer::<VoiceCommand>::new(COMMAND_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, PlaybackError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("hum-output".to_string())
            .spawn(move || match build_stream(consumer) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // Returns once the owning CpalOutput drops its sender
                    let _ = shutdown_rx.recv();
                    if let Err(err) = stream.pause() {
                        log::warn!("[CpalOutput] Failed to pause stream: {}", err);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|err| PlaybackError::OutputUnavailable {
                reason: format!("Failed to spawn output thread: {}", err),
            })?;

        let opened = ready_rx
            .recv()
            .unwrap_or_else(|_| {
                Err(PlaybackError::OutputUnavailable {
                    reason: "Output thread exited before the stream started".to_string(),
                })
            });

        match opened {
            Ok(sample_rate) => {
                log::info!("[CpalOutput] Output stream running @ {} Hz", sample_rate);
                Ok(Self {
                    commands: Mutex::new(producer),
                    sample_rate,
                    next_seed: AtomicU64::new(0),
                    shutdown: Some(shutdown_tx),
                    worker: Some(worker),
                })
            }
            Err(err) => {
                let _ = worker.join();
                log_playback_error(&err, "CpalOutput::open");
                Err(err)
            }
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&self, command: VoiceCommand) -> Result<(), PlaybackError> {
        let mut commands = self
            .commands
            .lock()
            .map_err(|_| PlaybackError::LockPoisoned {
                component: "output command queue".to_string(),
            })?;
        commands
            .push(command)
            .map_err(|_| PlaybackError::BackendFailure {
                reason: "Output command queue full".to_string(),
            })
    }
}

impl SynthBackend for CpalOutput {
    fn begin(&self) -> Result<(), PlaybackError> {
        self.send(VoiceCommand::Silence)
    }

    fn trigger(&self, event: &ScheduledEvent) -> Result<(), PlaybackError> {
        let seed = self.next_seed.fetch_add(1, Ordering::Relaxed);
        let voice = Box::new(Voice::new(event, self.sample_rate, seed));
        self.send(VoiceCommand::Trigger(voice))
    }

    fn silence(&self) {
        if let Err(err) = self.send(VoiceCommand::Silence) {
            log_playback_error(&err, "CpalOutput::silence");
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[CpalOutput] Output thread panicked");
            }
        }
    }
}

fn build_stream(
    mut commands: Consumer<VoiceCommand>,
) -> Result<(cpal::Stream, u32), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::OutputUnavailable {
            reason: "No default output device found".to_string(),
        })?;

    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::OutputUnavailable {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(PlaybackError::OutputUnavailable {
            reason: "Only F32 sample format is currently supported for output".to_string(),
        });
    }

    let stream_config: cpal::StreamConfig = supported.config();
    let channels = usize::from(stream_config.channels.max(1));
    let sample_rate = stream_config.sample_rate.0;

    let mut voices: Vec<Box<Voice>> = Vec::with_capacity(MAX_VOICES);
    let err_fn = |err| log::error!("[CpalOutput] Output stream error: {}", err);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(command) = commands.pop() {
                    match command {
                        VoiceCommand::Trigger(voice) => {
                            if voices.len() < MAX_VOICES {
                                voices.push(voice);
                            }
                        }
                        VoiceCommand::Silence => voices.clear(),
                    }
                }

                for frame in data.chunks_mut(channels) {
                    let mut mixed = 0.0;
                    for voice in voices.iter_mut() {
                        mixed += voice.next_sample();
                    }
                    frame.fill(mixed.clamp(-1.0, 1.0));
                }

                voices.retain(|voice| !voice.is_finished());
            },
            err_fn,
            None,
        )
        .map_err(|e| PlaybackError::OutputUnavailable {
            reason: format!("{:?}", e),
        })?;

    stream.play().map_err(|e| PlaybackError::OutputUnavailable {
        reason: format!("Failed to start output stream: {:?}", e),
    })?;

    Ok((stream, sample_rate))
}
