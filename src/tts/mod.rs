//! Text-to-speech: speaking interview questions out loud.

mod speaker;

pub use speaker::{Speak, Speaker};
