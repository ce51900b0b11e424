//! Chat-completion client for generating replies to interview answers.

mod client;

pub use client::{ChatApi, ChatClient, ChatError};
