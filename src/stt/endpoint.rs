//! RMS-based speech endpointing.
//!
//! Accumulates microphone frames during a session and decides when an
//! utterance is complete: speech has been observed and trailing silence
//! exceeds the configured duration. A session with no speech at all closes
//! after the no-speech timeout, mirroring recognition engines that give up
//! listening on their own.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, info};

/// Pre-roll kept while idle so the first word is not clipped, in seconds.
const PREROLL_SECONDS: f32 = 0.3;

/// Outcome of a completed recognition session.
#[derive(Debug)]
pub enum Segment {
    /// One endpointed utterance (mono samples at the capture rate).
    Speech(Vec<f32>),
    /// The session elapsed without any speech.
    Timeout,
}

/// Endpointer tuning, durations in seconds.
#[derive(Debug, Clone, Copy)]
pub struct EndpointerConfig {
    /// RMS level at or above which a frame counts as speech.
    pub speech_threshold: f32,
    /// Trailing silence that finalizes an utterance.
    pub silence_duration: f32,
    /// Session lifetime when no speech is detected at all.
    pub no_speech_timeout: f32,
    /// Hard cap on utterance length.
    pub max_utterance_secs: f32,
}

/// Per-session endpointing state.
pub struct Endpointer {
    config: EndpointerConfig,
    sample_rate: u32,

    open: bool,
    speaking: bool,
    buffer: Vec<f32>,
    preroll: VecDeque<f32>,
    trailing_silence: usize,
    observed: usize,
    speech_start: Option<Instant>,
}

impl Endpointer {
    pub fn new(sample_rate: u32, config: EndpointerConfig) -> Self {
        Self {
            config,
            sample_rate,
            open: false,
            speaking: false,
            buffer: Vec::new(),
            preroll: VecDeque::new(),
            trailing_silence: 0,
            observed: 0,
            speech_start: None,
        }
    }

    /// Adjust for the actual device rate when it differs from the preferred
    /// one.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Open a fresh session, discarding any leftover state.
    pub fn begin_session(&mut self) {
        self.reset();
        self.open = true;
        debug!("Recognition session opened");
    }

    /// Close the session without emitting anything (explicit stop).
    pub fn close(&mut self) {
        if self.open {
            debug!("Recognition session closed");
        }
        self.reset();
    }

    /// Feed captured frames. Returns a segment when the session completes,
    /// after which the endpointer is dormant until the next `begin_session`.
    pub fn accept_waveform(&mut self, samples: &[f32]) -> Option<Segment> {
        if !self.open || samples.is_empty() {
            return None;
        }

        self.observed += samples.len();
        let is_speech = rms(samples) >= self.config.speech_threshold;

        if is_speech {
            if !self.speaking {
                self.speaking = true;
                self.speech_start = Some(Instant::now());
                // Splice in the pre-roll so the leading edge survives
                self.buffer.extend(self.preroll.drain(..));
                info!("🎤 Speech started");
            }
            self.trailing_silence = 0;
        } else if self.speaking {
            self.trailing_silence += samples.len();
        }

        if self.speaking {
            self.buffer.extend_from_slice(samples);
        } else {
            self.preroll.extend(samples.iter().copied());
            let cap = (PREROLL_SECONDS * self.sample_rate as f32) as usize;
            while self.preroll.len() > cap {
                self.preroll.pop_front();
            }
        }

        self.check_completion()
    }

    fn check_completion(&mut self) -> Option<Segment> {
        let silence_limit = self.seconds_to_samples(self.config.silence_duration);
        let max_utterance = self.seconds_to_samples(self.config.max_utterance_secs);
        let no_speech_limit = self.seconds_to_samples(self.config.no_speech_timeout);

        if self.speaking && (self.trailing_silence >= silence_limit || self.buffer.len() >= max_utterance) {
            if let Some(start) = self.speech_start.take() {
                info!("🎤 Speech ended ({:.1}s)", start.elapsed().as_secs_f32());
            }
            let utterance = std::mem::take(&mut self.buffer);
            self.reset();
            return Some(Segment::Speech(utterance));
        }

        if !self.speaking && self.observed >= no_speech_limit {
            debug!("No speech within session timeout");
            self.reset();
            return Some(Segment::Timeout);
        }

        None
    }

    fn seconds_to_samples(&self, seconds: f32) -> usize {
        (seconds * self.sample_rate as f32) as usize
    }

    fn reset(&mut self) {
        self.open = false;
        self.speaking = false;
        self.buffer.clear();
        self.preroll.clear();
        self.trailing_silence = 0;
        self.observed = 0;
        self.speech_start = None;
    }
}

/// Root-mean-square level of a frame.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}
