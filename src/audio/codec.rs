// Codec - WAV container between capture, decoder and renderer
//
// Capture finishes into an in-memory WAV file; the decoder turns any WAV
// (float or 8/16/24/32-bit integer PCM) back into an AudioBuffer.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::analysis::types::AudioBuffer;
use crate::error::DecodeError;

/// Turns encoded bytes into an AudioBuffer
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, DecodeError>;
}

/// hound-backed WAV decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mut reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
            (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
                let scale = 1.0 / (1_i64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
            (format, bits) => {
                return Err(DecodeError::UnsupportedFormat {
                    format: format!("{:?} {}-bit", format, bits),
                })
            }
        };

        if interleaved.is_empty() {
            return Err(DecodeError::Empty);
        }

        log::debug!(
            "[WavDecoder] Decoded {} samples ({} ch @ {} Hz, {:?} {}-bit)",
            interleaved.len(),
            spec.channels,
            spec.sample_rate,
            spec.sample_format,
            spec.bits_per_sample
        );

        AudioBuffer::from_interleaved(&interleaved, usize::from(spec.channels), spec.sample_rate)
    }
}

fn float_spec(channels: u16, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Encode interleaved samples as a 32-bit float WAV file in memory
pub fn encode_wav(interleaved: &[f32], channels: u16, sample_rate: u32) -> hound::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, float_spec(channels, sample_rate))?;
        for &sample in interleaved {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Read and decode a WAV file from disk
pub fn read_wav_file<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, DecodeError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|err| DecodeError::Malformed {
        reason: format!("{}: {}", path.as_ref().display(), err),
    })?;
    WavDecoder.decode(&bytes)
}

/// Write mono samples to disk as a 16-bit PCM WAV file
pub fn write_wav_file<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
) -> hound::Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}
