//! The interview flow: one question/answer exchange at a time.

mod session;

pub use session::{InterviewTurn, Interviewer};
