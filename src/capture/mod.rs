//! Speech capture controller.
//!
//! Maintains a continuous, restartable speech-to-text session and surfaces
//! only finalized text to callers.

mod controller;

pub use controller::{CaptureController, CaptureError, CaptureState, SpeechEngine};
