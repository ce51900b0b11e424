//! In-memory WAV encode/decode via hound.
//!
//! The transcription API takes a WAV upload; the speech API returns one.
//! Both directions use 16-bit PCM mono.

use std::io::Cursor;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Encode mono f32 samples as a 16-bit PCM WAV in memory.
///
/// # Errors
/// Returns an error if the WAV writer fails (effectively never for an
/// in-memory cursor with a valid spec).
pub fn encode(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec { channels: 1, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * 32767.0) as i16).context("Failed to write WAV sample")?;
        }
        writer.finalize().context("Failed to finalize WAV")?;
    }

    Ok(cursor.into_inner())
}

/// Decode a WAV byte buffer to mono f32 samples and its sample rate.
///
/// Multi-channel audio is mixed down by averaging.
///
/// # Errors
/// Returns an error if the buffer is not a valid 16-bit PCM WAV.
pub fn decode(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV")?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        anyhow::bail!("Unsupported WAV format: {:?} {} bits", spec.sample_format, spec.bits_per_sample);
    }

    let channels = spec.channels as usize;
    let raw: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>().context("Failed to read WAV samples")?;

    let samples = if channels == 1 {
        raw.iter().map(|&s| f32::from(s) / 32768.0).collect()
    } else {
        raw.chunks(channels).map(|frame| frame.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>() / channels as f32).collect()
    };

    Ok((samples, spec.sample_rate))
}
