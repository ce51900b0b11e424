//! Microphone capture using cpal.
//!
//! Streams mono f32 frames from the default input device to a callback.
//! Capture is gated by a shared running flag so recognition sessions can
//! pause and resume without rebuilding the stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use tracing::{debug, info};

use super::util::{find_best_config, get_device_name, mix_to_mono};

/// Microphone handle. The underlying stream is opened once and stays alive
/// for the lifetime of the handle; frames are dropped while paused.
pub struct Microphone {
    _stream: Stream,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

impl Microphone {
    /// Open the default input device and start streaming to `callback`.
    ///
    /// The callback receives mono f32 frames at [`Microphone::sample_rate`]
    /// and runs on the audio thread, so it must stay cheap (the endpointer's
    /// RMS accumulation qualifies).
    ///
    /// # Errors
    /// Returns an error if no input device is available or the stream cannot
    /// be built.
    pub fn open<F>(preferred_rate: u32, callback: F) -> Result<Self>
    where
        F: Fn(&[f32]) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_input_device().context("No input device available")?;

        info!("Using input device: {}", get_device_name(&device));

        let supported_configs = device.supported_input_configs().context("Failed to get supported input configs")?;
        let config = find_best_config(supported_configs, preferred_rate)?;
        let sample_rate = config.sample_rate();
        let channels = config.channels() as usize;

        debug!("Audio capture config: {} Hz, {} channels, {:?}", sample_rate, channels, config.sample_format());

        let running = Arc::new(AtomicBool::new(false));
        let running_in_callback = running.clone();

        let stream_config: StreamConfig = config.config();

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if running_in_callback.load(Ordering::Relaxed) {
                    callback(&mix_to_mono(data, channels));
                }
            },
            |err| {
                tracing::error!("Audio capture error: {}", err);
            },
            None,
        )?;

        stream.play().context("Failed to start audio stream")?;

        info!("Audio capture configured at {} Hz", sample_rate);

        Ok(Self { _stream: stream, running, sample_rate })
    }

    /// Resume delivering frames to the callback.
    pub fn resume(&self) {
        self.running.store(true, Ordering::SeqCst);
        debug!("Microphone resumed");
    }

    /// Stop delivering frames. The stream stays open for a later resume.
    pub fn pause(&self) {
        self.running.store(false, Ordering::SeqCst);
        debug!("Microphone paused");
    }

    /// Actual capture sample rate (may differ from the preferred rate).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
