//! The microphone-backed recognition engine.
//!
//! Implements the capture controller's `SpeechEngine` contract: sessions are
//! opened and closed by pausing/resuming one long-lived microphone stream and
//! resetting the endpointer. Completed segments are delivered over a channel
//! to the transcription task, which turns them into recognition events.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::Microphone;
use crate::capture::SpeechEngine;
use crate::config::AppConfig;

use super::endpoint::{Endpointer, Segment};

/// Events emitted by a recognition session, in engine order.
#[derive(Debug)]
pub enum RecognitionEvent {
    /// A partial hypothesis the engine may still revise. Observed by the
    /// controller and discarded; the HTTP transcription backend never
    /// produces these.
    Interim(String),
    /// A finalized utterance.
    Final(String),
    /// The session ended, whether from an explicit stop, silence, or an
    /// engine-side error.
    SessionEnded,
}

/// Speech recognition engine over the default microphone.
pub struct Recognizer {
    mic: Microphone,
    endpointer: Arc<Mutex<Endpointer>>,
}

impl Recognizer {
    /// Open the microphone and wire it to the endpointer.
    ///
    /// Returns the engine and the channel on which completed segments are
    /// delivered (the transcription task consumes it).
    ///
    /// # Errors
    /// Returns an error if the capture device is unavailable.
    pub fn new(config: &AppConfig) -> Result<(Self, mpsc::Receiver<Segment>)> {
        // Small buffer: at most one segment per session is in flight
        let (segment_tx, segment_rx) = mpsc::channel(4);

        let endpointer = Arc::new(Mutex::new(Endpointer::new(config.sample_rate, config.endpointer())));

        let endpointer_for_audio = endpointer.clone();
        let mic = Microphone::open(config.sample_rate, move |samples: &[f32]| {
            if let Some(segment) = endpointer_for_audio.lock().accept_waveform(samples) {
                // Non-blocking send, this runs on the audio thread
                if segment_tx.try_send(segment).is_err() {
                    warn!("Segment channel full, dropping completed segment");
                }
            }
        })?;

        if mic.sample_rate() != config.sample_rate {
            info!("Capture device runs at {} Hz, endpointing adjusted", mic.sample_rate());
            endpointer.lock().set_sample_rate(mic.sample_rate());
        }

        Ok((Self { mic, endpointer }, segment_rx))
    }

    /// Rate of the samples inside emitted segments.
    pub fn sample_rate(&self) -> u32 {
        self.mic.sample_rate()
    }
}

impl SpeechEngine for Recognizer {
    fn start_session(&mut self) -> Result<()> {
        self.endpointer.lock().begin_session();
        self.mic.resume();
        Ok(())
    }

    fn stop_session(&mut self) {
        self.mic.pause();
        self.endpointer.lock().close();
    }
}
