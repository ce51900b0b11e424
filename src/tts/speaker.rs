//! Fire-and-forget speech output.
//!
//! Synthesis goes through an OpenAI-compatible `audio/speech` endpoint
//! requesting WAV; playback happens on a dedicated thread that owns the
//! output stream (cpal streams cannot cross threads). No completion signal
//! surfaces to callers.

use std::sync::mpsc::{self, Sender};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::audio::{Player, wav};
use crate::config::AppConfig;

/// The text-to-speech collaborator, as the interview flow sees it.
pub trait Speak {
    /// Queue `text` for speaking. Fire and forget: failures are logged, never
    /// propagated.
    fn speak(&self, text: &str);
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Synthesis half of the speaker, cloneable into spawned tasks.
#[derive(Clone)]
struct SynthClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
}

impl SynthClient {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let request = SpeechRequest { model: &self.model, input: text, voice: &self.voice, speed: self.speed, response_format: "wav" };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("speech API error {}: {}", status, body);
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Speaker that synthesizes remotely and plays through the default output
/// device.
pub struct Speaker {
    synth: SynthClient,
    playback_tx: Sender<(Vec<f32>, u32)>,
}

impl Speaker {
    pub fn new(config: &AppConfig) -> Self {
        info!("TTS voice: {} (model {}, speed {})", config.tts_voice, config.tts_model, config.tts_speed);

        let (playback_tx, playback_rx) = mpsc::channel::<(Vec<f32>, u32)>();

        // The playback thread owns the output stream for its whole lifetime;
        // it exits once every sender is gone.
        std::thread::spawn(move || {
            let player = match Player::new() {
                Ok(player) => player,
                Err(e) => {
                    error!("❌ Audio output unavailable, questions will not be spoken: {:#}", e);
                    while playback_rx.recv().is_ok() {}
                    return;
                }
            };

            while let Ok((samples, sample_rate)) = playback_rx.recv() {
                if let Err(e) = player.play(&samples, sample_rate) {
                    error!("❌ Playback failed: {:#}", e);
                }
            }
            debug!("Playback thread exiting");
        });

        let synth = SynthClient {
            client: reqwest::Client::new(),
            url: config.tts_url.clone(),
            api_key: config.api_key.clone(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
        };

        Self { synth, playback_tx }
    }
}

impl Speak for Speaker {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let synth = self.synth.clone();
        let playback_tx = self.playback_tx.clone();
        let text = text.to_string();

        tokio::spawn(async move {
            match synth.synthesize(&text).await {
                Ok(bytes) => match wav::decode(&bytes) {
                    Ok((samples, sample_rate)) => {
                        debug!("🔊 Speaking ({} samples at {} Hz)", samples.len(), sample_rate);
                        let _ = playback_tx.send((samples, sample_rate));
                    }
                    Err(e) => error!("❌ Failed to decode synthesized speech: {:#}", e),
                },
                Err(e) => error!("❌ Speech synthesis failed: {:#}", e),
            }
        });
    }
}
