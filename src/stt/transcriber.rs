//! Remote transcription client.
//!
//! Uploads endpointed utterances as in-memory WAV to an OpenAI-compatible
//! `audio/transcriptions` endpoint and returns the recognized text.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::AppConfig;

/// Transcription API response body.
#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcription failures. The recognition engine treats these as session
/// errors: logged, then folded into a normal session end.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcription API error {status}: {body}")]
    Api { status: reqwest::StatusCode, body: String },
}

/// HTTP client for the speech-to-text collaborator.
pub struct Transcriber {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl Transcriber {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.stt_url.clone(),
            api_key: config.api_key.clone(),
            model: config.stt_model.clone(),
        }
    }

    /// Transcribe a 16 kHz mono WAV.
    ///
    /// # Errors
    /// Returns an error on network failure, a non-success status, or a
    /// malformed response body.
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<String, TranscribeError> {
        debug!("Uploading {} WAV bytes for transcription", wav.len());

        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(wav).file_name("utterance.wav").mime_str("audio/wav")?)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Transcription API error {}: {}", status, body);
            return Err(TranscribeError::Api { status, body });
        }

        let result: TranscriptionResponse = response.json().await?;
        debug!("Transcription: \"{}\"", result.text);
        Ok(result.text)
    }
}
