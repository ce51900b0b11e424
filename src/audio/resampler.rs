//! Batch audio resampling using the rubato FFT-based resampler.
//!
//! Utterances are resampled whole before transcription upload, and synthesized
//! speech is resampled whole before playback, so only the batch path exists.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Chunk size for FFT-based resampling (good quality/performance balance).
const CHUNK_SIZE: usize = 1024;

/// Number of sub-chunks for FFT processing.
const SUB_CHUNKS: usize = 2;

/// Resample mono audio from one sample rate to another.
///
/// Used to bring microphone utterances down to the 16 kHz the transcription
/// API expects, and synthesized 24 kHz speech up to the output device rate.
///
/// # Errors
/// Returns an error if the resampler cannot be constructed or processing fails.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = Fft::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        1, // mono
        FixedSync::Input,
    )
    .context("Failed to create resampler")?;

    let output_frames_max = resampler.output_frames_max();
    let mut output_buffer = vec![0.0f32; output_frames_max];

    let expected_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize;
    let mut output = Vec::with_capacity(expected_len + CHUNK_SIZE);

    for chunk in samples.chunks(CHUNK_SIZE) {
        // The FFT resampler only accepts full chunks; pad the tail with silence
        let padded;
        let input_chunk: &[f32] = if chunk.len() < CHUNK_SIZE {
            padded = {
                let mut p = chunk.to_vec();
                p.resize(CHUNK_SIZE, 0.0);
                p
            };
            &padded
        } else {
            chunk
        };

        let input_adapter = InterleavedSlice::new(input_chunk, 1, CHUNK_SIZE).context("Failed to create input adapter")?;
        let mut output_adapter = InterleavedSlice::new_mut(&mut output_buffer, 1, output_frames_max).context("Failed to create output adapter")?;

        let (_, frames_written) = resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| anyhow::anyhow!("Resampling error: {}", e))?;
        output.extend_from_slice(&output_buffer[..frames_written]);
    }

    // Trim the tail padding introduced by the last chunk
    output.truncate(expected_len + 100);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_mic_to_whisper_rate() {
        // 48kHz device -> 16kHz transcription input
        let samples = vec![0.0; 48000]; // 1 second
        let result = resample(&samples, 48000, 16000).unwrap();
        assert!(result.len() >= 15900 && result.len() <= 16100, "Expected length 15900-16100, got {}", result.len());
    }

    #[test]
    fn test_resample_tts_to_device_rate() {
        // 24kHz synthesized speech -> 48kHz device
        let samples = vec![0.0; 24000]; // 1 second
        let result = resample(&samples, 24000, 48000).unwrap();
        assert!(result.len() >= 48000 && result.len() <= 48100);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.25f32; 1000];
        let result = resample(&samples, 16000, 16000).unwrap();
        assert_eq!(result, samples);
    }
}
