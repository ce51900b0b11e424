//! Submission flow bridging finalized transcripts to the chat collaborator.
//!
//! A failed remote call still advances to the next question. That is the
//! intended behavior: the interview stays non-blocking, and the error is
//! surfaced alongside.

use tracing::{error, info};

use crate::llm::ChatApi;
use crate::tts::Speak;

/// Generic user-facing message for any chat-completion failure.
const CHAT_ERROR_MESSAGE: &str = "Failed to get a response from the AI. Please try again.";

/// One question/answer exchange. Transient state, owned by the interviewer;
/// `ai_reply` and `error` carry over so the last outcome stays visible while
/// the next question is asked.
#[derive(Debug, Default)]
pub struct InterviewTurn {
    pub question: String,
    pub user_answer: String,
    pub ai_reply: String,
    pub error: Option<String>,
}

/// Drives the question cycle against the chat and speech collaborators.
pub struct Interviewer<C: ChatApi, S: Speak> {
    chat: C,
    voice: S,
    question: String,
    turn: InterviewTurn,
}

impl<C: ChatApi, S: Speak> Interviewer<C, S> {
    /// `question` is the single scripted prompt; there is no question bank.
    pub fn new(chat: C, voice: S, question: String) -> Self {
        Self { chat, voice, question, turn: InterviewTurn::default() }
    }

    pub fn turn(&self) -> &InterviewTurn {
        &self.turn
    }

    /// Start a fresh exchange: set and speak the next question, discarding
    /// the previous answer.
    pub fn next_question(&mut self) {
        self.turn.question = self.question.clone();
        self.turn.user_answer.clear();
        info!("❓ {}", self.turn.question);
        self.voice.speak(&self.turn.question);
    }

    /// Submit a finalized transcript (may be empty; an empty message is
    /// sent as-is).
    ///
    /// On success the reply is stored and any prior error cleared; on failure
    /// a generic error message is stored and the prior reply left unchanged.
    /// Either way the interview advances to the next question.
    pub async fn submit(&mut self, transcript: String) {
        info!("🧠 Submitting answer: \"{}\"", transcript);
        self.turn.user_answer = transcript;

        match self.chat.complete(&self.turn.user_answer).await {
            Ok(reply) => {
                info!("🤖 {}", reply);
                self.turn.ai_reply = reply;
                self.turn.error = None;
            }
            Err(e) => {
                error!("❌ Chat completion failed: {}", e);
                self.turn.error = Some(CHAT_ERROR_MESSAGE.to_string());
            }
        }

        self.next_question();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::llm::ChatError;

    struct FakeChat {
        reply: Option<String>, // None simulates a network failure
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ChatApi for FakeChat {
        async fn complete(&self, content: &str) -> Result<String, ChatError> {
            self.seen.lock().push(content.to_string());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(ChatError::EmptyResponse),
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeVoice {
        spoken: Arc<Mutex<Vec<String>>>,
    }

    impl Speak for FakeVoice {
        fn speak(&self, text: &str) {
            self.spoken.lock().push(text.to_string());
        }
    }

    const QUESTION: &str = "What is your favorite programming language?";

    fn interviewer(reply: Option<&str>) -> (Interviewer<FakeChat, FakeVoice>, Arc<Mutex<Vec<String>>>, FakeVoice) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let chat = FakeChat { reply: reply.map(String::from), seen: seen.clone() };
        let voice = FakeVoice::default();
        (Interviewer::new(chat, voice.clone(), QUESTION.to_string()), seen, voice)
    }

    #[test]
    fn test_next_question_sets_and_speaks() {
        let (mut iv, _, voice) = interviewer(Some("ok"));
        iv.next_question();
        assert_eq!(iv.turn().question, QUESTION);
        assert_eq!(voice.spoken.lock().as_slice(), [QUESTION]);
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let (mut iv, seen, voice) = interviewer(Some("Great answer!"));
        iv.next_question();

        iv.submit("I love distributed systems".to_string()).await;

        // The collaborator saw the exact transcript
        assert_eq!(seen.lock().as_slice(), ["I love distributed systems"]);
        assert_eq!(iv.turn().ai_reply, "Great answer!");
        assert!(iv.turn().error.is_none());
        // The turn advanced: answer discarded, next question spoken
        assert_eq!(iv.turn().user_answer, "");
        assert_eq!(voice.spoken.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_submission_still_advances() {
        let (mut iv, _, voice) = interviewer(None);
        iv.next_question();

        iv.submit("anything".to_string()).await;

        let error = iv.turn().error.as_deref().expect("error message set");
        assert!(!error.is_empty());
        assert_eq!(iv.turn().user_answer, "");
        // The next question was still requested and spoken
        assert_eq!(voice.spoken.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_prior_reply_unchanged() {
        let (mut iv, seen, _) = interviewer(Some("Great answer!"));
        iv.submit("first".to_string()).await;
        assert_eq!(iv.turn().ai_reply, "Great answer!");

        // Swap in a failing collaborator, keeping accumulated state
        iv.chat = FakeChat { reply: None, seen };
        iv.submit("second".to_string()).await;

        assert_eq!(iv.turn().ai_reply, "Great answer!");
        assert!(iv.turn().error.is_some());
    }

    #[tokio::test]
    async fn test_success_clears_prior_error() {
        let (mut iv, seen, _) = interviewer(None);
        iv.submit("first".to_string()).await;
        assert!(iv.turn().error.is_some());

        iv.chat = FakeChat { reply: Some("Better.".to_string()), seen };
        iv.submit("second".to_string()).await;

        assert!(iv.turn().error.is_none());
        assert_eq!(iv.turn().ai_reply, "Better.");
    }

    #[tokio::test]
    async fn test_empty_transcript_is_sent_as_is() {
        let (mut iv, seen, _) = interviewer(Some("ok"));
        iv.submit(String::new()).await;
        assert_eq!(seen.lock().as_slice(), [""]);
    }
}
