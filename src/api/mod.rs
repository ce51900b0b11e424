//! Placeholder interview API: question listing and response intake.

mod routes;

pub use routes::{ApiState, QuestionRecord, router, serve};
