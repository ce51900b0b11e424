//! Voice Interviewer - a voice-driven interview front-end.
//!
//! Captures spoken answers from the microphone, transcribes them remotely,
//! sends the finalized text to a chat-completion API, and speaks the scripted
//! follow-up question. Also serves the placeholder interview API.

mod api;
mod audio;
mod capture;
mod config;
mod interview;
mod llm;
mod stt;
mod tts;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use capture::CaptureController;
use config::AppConfig;
use interview::Interviewer;
use llm::{ChatApi, ChatClient};
use stt::{RecognitionEvent, Recognizer, Segment, Transcriber};
use tts::{Speak, Speaker};

/// Spawn the transcription task.
///
/// Receives completed segments from the endpointer, transcribes them, and
/// emits recognition events in engine order: `Final` (when the utterance
/// produced text) followed by `SessionEnded`. Transcription failures are
/// engine-session errors: logged, then folded into a plain session end.
fn spawn_transcription_task(
    mut segment_rx: mpsc::Receiver<Segment>,
    event_tx: mpsc::Sender<RecognitionEvent>,
    transcriber: Arc<Transcriber>,
    capture_rate: u32,
    upload_rate: u32,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let segment = tokio::select! {
                _ = shutdown.cancelled() => break,
                segment = segment_rx.recv() => match segment {
                    Some(segment) => segment,
                    None => {
                        debug!("Segment channel closed");
                        break;
                    }
                },
            };

            if let Segment::Speech(samples) = segment {
                match transcribe_segment(&samples, capture_rate, upload_rate, &transcriber).await {
                    Ok(Some(text)) => {
                        if event_tx.send(RecognitionEvent::Final(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => debug!("Empty transcription result"),
                    Err(e) => warn!("Recognition session error: {:#}", e),
                }
            }

            // Every segment ends its session, speech or not
            if event_tx.send(RecognitionEvent::SessionEnded).await.is_err() {
                break;
            }
        }
    })
}

/// Resample, WAV-encode, and transcribe one utterance.
async fn transcribe_segment(samples: &[f32], capture_rate: u32, upload_rate: u32, transcriber: &Transcriber) -> Result<Option<String>> {
    let resampled = audio::resampler::resample(samples, capture_rate, upload_rate)?;
    let wav = audio::wav::encode(&resampled, upload_rate)?;

    let text = transcriber.transcribe(wav).await?;
    let text = text.trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Spawn the submission task.
///
/// Owns the interviewer and receives finalized answers over a channel. The
/// remote chat call happens here, off the event loop, so capture restarts and
/// shutdown stay responsive while a submission is in flight.
fn spawn_submission_task<C, S>(
    mut answer_rx: mpsc::Receiver<String>,
    mut interviewer: Interviewer<C, S>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    C: ChatApi + Send + 'static,
    S: Speak + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let answer = tokio::select! {
                _ = shutdown.cancelled() => break,
                answer = answer_rx.recv() => match answer {
                    Some(answer) => answer,
                    None => {
                        debug!("Answer channel closed");
                        break;
                    }
                },
            };

            interviewer.submit(answer).await;
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then cancel the token.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_args();

    // Respect RUST_LOG, fall back to the verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🎙️  Voice Interviewer v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    config.log_config();

    // Collaborators: recognition engine, transcription, chat, speech output
    let (recognizer, segment_rx) = match Recognizer::new(&config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("❌ Speech recognition unavailable: {:#}", e);
            std::process::exit(1);
        }
    };
    let capture_rate = recognizer.sample_rate();

    let transcriber = Arc::new(Transcriber::new(&config));
    let chat = ChatClient::new(&config)?;
    let speaker = Speaker::new(&config);

    let mut controller = CaptureController::new(recognizer);
    let mut interviewer = Interviewer::new(chat, speaker, config.question.clone());

    let shutdown = CancellationToken::new();

    let (event_tx, mut event_rx) = mpsc::channel::<RecognitionEvent>(10);
    let transcription_handle = spawn_transcription_task(segment_rx, event_tx, transcriber, capture_rate, config.sample_rate, shutdown.clone());

    let api_state = Arc::new(api::ApiState { question: config.question.clone() });
    let api_handle = tokio::spawn(api::serve(config.listen_addr, api::router(api_state), shutdown.clone()));

    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    // Ask the opening question, then hand the interviewer to its task and
    // start listening
    interviewer.next_question();
    let (answer_tx, answer_rx) = mpsc::channel::<String>(4);
    let submission_handle = spawn_submission_task(answer_rx, interviewer, shutdown.clone());

    if let Err(e) = controller.start_capture() {
        error!("❌ {}", e);
    }

    // Event loop: recognition events drive the controller; finalized answers
    // are handed to the submission task. The controller and its engine stay
    // on this task (the capture stream must not cross threads), and nothing
    // here awaits a remote call.
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = event_rx.recv() => {
                let Some(event) = event else {
                    debug!("Event channel closed");
                    break;
                };
                match event {
                    RecognitionEvent::Interim(text) => controller.on_interim_result(&text),
                    RecognitionEvent::Final(text) => {
                        controller.on_final_result(text);
                        info!("🗣️  You: {}", controller.transcript());
                        let answer = controller.take_transcript();
                        if answer_tx.try_send(answer).is_err() {
                            warn!("Submission queue full, dropping answer");
                        }
                    }
                    RecognitionEvent::SessionEnded => {
                        if let Err(e) = controller.on_session_end() {
                            error!("❌ {}", e);
                        }
                    }
                }
            }
        }
    }

    // Release the microphone before waiting on tasks
    controller.teardown();

    let graceful_timeout = tokio::time::Duration::from_millis(500);

    tokio::select! {
        _ = transcription_handle => {
            debug!("Transcription task finished gracefully");
        }
        _ = tokio::time::sleep(graceful_timeout) => {
            debug!("Transcription task didn't finish in time");
        }
    }

    tokio::select! {
        _ = submission_handle => {
            debug!("Submission task finished gracefully");
        }
        _ = tokio::time::sleep(graceful_timeout) => {
            debug!("Submission task didn't finish in time");
        }
    }

    tokio::select! {
        result = api_handle => {
            if let Ok(Err(e)) = result {
                error!("❌ API server error: {:#}", e);
            }
        }
        _ = tokio::time::sleep(graceful_timeout) => {
            debug!("API server didn't finish in time");
        }
    }

    info!("✅ Voice interviewer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    use super::*;
    use crate::llm::ChatError;

    /// Chat fake whose calls block until released through a notify.
    struct GatedChat {
        gate: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChatApi for GatedChat {
        async fn complete(&self, _content: &str) -> Result<String, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok("ok".to_string())
        }
    }

    struct MuteVoice;

    impl Speak for MuteVoice {
        fn speak(&self, _text: &str) {}
    }

    async fn wait_for_calls(calls: &AtomicUsize, expected: usize) {
        timeout(Duration::from_secs(1), async {
            while calls.load(Ordering::SeqCst) < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("chat call never started");
    }

    #[tokio::test]
    async fn test_answers_queue_while_a_chat_call_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let chat = GatedChat { gate: gate.clone(), calls: calls.clone() };
        let interviewer = Interviewer::new(chat, MuteVoice, "Q".to_string());

        let shutdown = CancellationToken::new();
        let (answer_tx, answer_rx) = mpsc::channel::<String>(4);
        let handle = spawn_submission_task(answer_rx, interviewer, shutdown.clone());

        answer_tx.send("first".to_string()).await.unwrap();
        wait_for_calls(&calls, 1).await;

        // The sender stays unblocked while the first call is pending
        answer_tx.try_send("second".to_string()).expect("queue accepts answers during a pending call");

        gate.notify_one();
        wait_for_calls(&calls, 2).await;
        gate.notify_one();

        shutdown.cancel();
        timeout(Duration::from_secs(1), handle).await.expect("task exits on shutdown").unwrap();
    }

    #[tokio::test]
    async fn test_submission_task_exits_when_answer_channel_closes() {
        let gate = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let chat = GatedChat { gate, calls };
        let interviewer = Interviewer::new(chat, MuteVoice, "Q".to_string());

        let shutdown = CancellationToken::new();
        let (answer_tx, answer_rx) = mpsc::channel::<String>(4);
        let handle = spawn_submission_task(answer_rx, interviewer, shutdown);

        drop(answer_tx);
        timeout(Duration::from_secs(1), handle).await.expect("task exits when senders drop").unwrap();
    }
}
