//! The two interview endpoints.
//!
//! `GET /api/questions` serves the question list (currently the one
//! configured question); `POST /api/responses` accepts an opaque payload and
//! acknowledges it. Response storage is not implemented.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shared route state.
pub struct ApiState {
    pub question: String,
}

/// One question record as served by the API.
#[derive(Serialize)]
pub struct QuestionRecord {
    pub id: u32,
    pub text: String,
}

/// List interview questions.
async fn list_questions(State(state): State<Arc<ApiState>>) -> Json<Vec<QuestionRecord>> {
    Json(vec![QuestionRecord { id: 1, text: state.question.clone() }])
}

/// Accept a submitted response. The payload is treated as opaque.
async fn create_response(Json(payload): Json<serde_json::Value>) -> (StatusCode, &'static str) {
    debug!("Received response payload: {}", payload);
    (StatusCode::CREATED, "Response saved")
}

/// Build the interview API router.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/questions", get(list_questions))
        .route("/api/responses", post(create_response))
        .with_state(state)
}

/// Serve the router until the shutdown token fires.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr, router: Router, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {}", addr))?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("API server failed")?;

    Ok(())
}
