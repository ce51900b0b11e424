//! Application configuration and CLI argument parsing.

use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::stt::EndpointerConfig;

/// Voice interviewer application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "voice-interviewer")]
#[command(author, version, about = "A voice-driven interview front-end", long_about = None)]
pub struct AppConfig {
    /// Chat completion API URL
    #[arg(long, env = "CHAT_API_URL", default_value = "https://api.openai.com/v1/chat/completions")]
    pub chat_url: String,

    /// Chat model name
    #[arg(long, short = 'm', env = "CHAT_MODEL", default_value = "gpt-3.5-turbo")]
    pub chat_model: String,

    /// Bearer token for the remote APIs
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// Transcription API URL
    #[arg(long, env = "STT_API_URL", default_value = "https://api.openai.com/v1/audio/transcriptions")]
    pub stt_url: String,

    /// Transcription model name
    #[arg(long, default_value = "whisper-1")]
    pub stt_model: String,

    /// Speech synthesis API URL
    #[arg(long, env = "TTS_API_URL", default_value = "https://api.openai.com/v1/audio/speech")]
    pub tts_url: String,

    /// Speech synthesis model name
    #[arg(long, default_value = "tts-1")]
    pub tts_model: String,

    /// Speech synthesis voice
    #[arg(long, default_value = "alloy")]
    pub tts_voice: String,

    /// Text-to-speech speed multiplier
    #[arg(long, default_value = "1.0")]
    pub tts_speed: f32,

    /// The interview question to ask
    #[arg(long, short = 'q', default_value = "What is your favorite programming language?")]
    pub question: String,

    /// Bind address for the interview API
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:3000")]
    pub listen_addr: SocketAddr,

    /// Preferred microphone sample rate (also the transcription upload rate)
    #[arg(long, default_value = "16000")]
    pub sample_rate: u32,

    /// RMS level above which a frame counts as speech (0.0 - 1.0)
    #[arg(long, default_value = "0.015")]
    pub speech_threshold: f32,

    /// Trailing silence in seconds that finalizes an utterance
    #[arg(long, default_value = "0.8")]
    pub silence_duration: f32,

    /// Seconds a session may run without any speech before ending
    #[arg(long, default_value = "8.0")]
    pub no_speech_timeout: f32,

    /// Maximum utterance length in seconds
    #[arg(long, default_value = "30.0")]
    pub max_utterance_secs: f32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Endpointer tuning derived from the CLI flags.
    pub fn endpointer(&self) -> EndpointerConfig {
        EndpointerConfig {
            speech_threshold: self.speech_threshold,
            silence_duration: self.silence_duration,
            no_speech_timeout: self.no_speech_timeout,
            max_utterance_secs: self.max_utterance_secs,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("API key is required (set OPENAI_API_KEY)");
        }

        if !(0.0..=1.0).contains(&self.speech_threshold) || self.speech_threshold == 0.0 {
            anyhow::bail!("Speech threshold must be between 0.0 (exclusive) and 1.0");
        }

        if self.silence_duration <= 0.0 {
            anyhow::bail!("Silence duration must be positive");
        }

        if self.no_speech_timeout <= self.silence_duration {
            anyhow::bail!("No-speech timeout must exceed the silence duration");
        }

        if self.max_utterance_secs <= 0.0 {
            anyhow::bail!("Maximum utterance length must be positive");
        }

        if !(0.25..=4.0).contains(&self.tts_speed) {
            anyhow::bail!("TTS speed must be between 0.25 and 4.0");
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Chat endpoint: {}", self.chat_url);
        info!("  Chat model: {}", self.chat_model);
        info!("  STT endpoint: {}", self.stt_url);
        info!("  TTS endpoint: {} (voice {})", self.tts_url, self.tts_voice);
        info!("  Question: {}", self.question);
        info!("  API bind address: {}", self.listen_addr);
        info!("  Sample rate: {} Hz", self.sample_rate);
        info!("  Speech threshold: {}", self.speech_threshold);
        info!("  Silence duration: {}s", self.silence_duration);
    }
}
