//! Speaker playback using cpal.
//!
//! Plays mono f32 samples through the default output device. The audio
//! callback pops from a lock-free ring buffer so the high-priority audio
//! thread never takes a mutex; `play` blocks until the queue drains.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::resample;
use super::util::{find_best_config, get_device_name};

/// Ring buffer capacity in samples (~20 seconds at 48 kHz). Spoken interview
/// questions are short; anything beyond this is dropped with a warning.
const PLAYBACK_RING_SIZE: usize = 1 << 20;

/// Audio player for synthesized speech.
pub struct Player {
    _stream: Stream,
    device_sample_rate: u32,
    producer: Mutex<ringbuf::HeapProd<f32>>,
    queued: Arc<AtomicUsize>,
}

impl Player {
    /// Open the default output device.
    ///
    /// # Errors
    /// Returns an error if no output device is available or the stream cannot
    /// be built.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().context("No output device available")?;

        info!("Using output device: {}", get_device_name(&device));

        let device_sample_rate = match device.default_output_config() {
            Ok(default_config) => default_config.sample_rate(),
            Err(_) => {
                let supported_configs = device.supported_output_configs().context("Failed to get supported output configs")?;
                find_best_config(supported_configs, 48000)?.sample_rate()
            }
        };

        let supported_configs = device.supported_output_configs().context("Failed to get supported output configs")?;
        let config = find_best_config(supported_configs, device_sample_rate)?;
        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();

        debug!("Audio playback config: {} Hz, {} channels", device_sample_rate, channels);

        let ring = HeapRb::<f32>::new(PLAYBACK_RING_SIZE);
        let (producer, mut consumer) = ring.split();

        let queued = Arc::new(AtomicUsize::new(0));
        let queued_in_callback = queued.clone();

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut consumed = 0;
                for frame in data.chunks_mut(channels) {
                    let sample = match consumer.try_pop() {
                        Some(s) => {
                            consumed += 1;
                            s
                        }
                        None => 0.0,
                    };
                    // Duplicate the mono sample to all channels
                    for channel in frame.iter_mut() {
                        *channel = sample;
                    }
                }
                if consumed > 0 {
                    note_consumed(&queued_in_callback, consumed);
                }
            },
            |err| {
                tracing::error!("Audio playback error: {}", err);
            },
            None,
        )?;

        stream.play().context("Failed to start playback stream")?;

        Ok(Self { _stream: stream, device_sample_rate, producer: Mutex::new(producer), queued })
    }

    /// Play mono samples recorded at `sample_rate`, blocking until the queue
    /// drains (or a duration-based deadline passes).
    ///
    /// # Errors
    /// Returns an error if resampling to the device rate fails.
    pub fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let samples_to_play = resample(samples, sample_rate, self.device_sample_rate)?;

        {
            let mut producer = self.producer.lock();
            // Account before pushing so the callback never underflows the count
            self.queued.fetch_add(samples_to_play.len(), Ordering::Relaxed);
            let written = producer.push_slice(&samples_to_play);
            if written < samples_to_play.len() {
                warn!("Playback buffer overflow, dropped {} samples", samples_to_play.len() - written);
                self.queued.fetch_sub(samples_to_play.len() - written, Ordering::Relaxed);
            }
        }

        debug!("Playing {} samples at {} Hz", samples_to_play.len(), self.device_sample_rate);

        // Wait for the callback to drain the queue, with generous headroom
        let duration = Duration::from_secs_f64(samples_to_play.len() as f64 / self.device_sample_rate as f64);
        let deadline = Instant::now() + duration + Duration::from_millis(500);

        while self.queued.load(Ordering::Relaxed) > 0 {
            if Instant::now() > deadline {
                // Leave the counter alone: the callback keeps draining the
                // ring and the accounting must stay consistent with it.
                warn!("Playback deadline exceeded, abandoning wait");
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        debug!("Playback completed");
        Ok(())
    }
}

/// Subtract drained samples from the queue counter, saturating at zero so the
/// counter can never wrap if the accounting ever drifts.
fn note_consumed(queued: &AtomicUsize, consumed: usize) {
    let mut current = queued.load(Ordering::Relaxed);
    loop {
        let next = current.saturating_sub(consumed);
        match queued.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}
