//! Audio I/O for the interview loop.
//!
//! Microphone capture and speaker playback via cpal, batch resampling
//! between device rates and the speech API rates, and in-memory WAV
//! encode/decode for the HTTP speech collaborators.

mod capture;
mod playback;
pub mod resampler;
pub mod util;
pub mod wav;

pub use capture::Microphone;
pub use playback::Player;
