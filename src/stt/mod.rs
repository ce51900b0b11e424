//! Speech-to-text: microphone recognition sessions and remote transcription.
//!
//! A session captures audio until one utterance is endpointed (or a
//! no-speech timeout elapses), then ends on its own. The capture controller
//! restarts sessions to keep listening continuous.

mod endpoint;
mod recognizer;
mod transcriber;

pub use endpoint::{Endpointer, EndpointerConfig, Segment};
pub use recognizer::{RecognitionEvent, Recognizer};
pub use transcriber::{TranscribeError, Transcriber};
