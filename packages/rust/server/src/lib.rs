//! Inbound-message server: the synthesis pipeline behind an HTTP boundary.
//!
//! `POST /reply` takes a message plus optional prior turns and answers with
//! the rendered four-section text. `GET /health` is a liveness probe.
//! Every request builds its own corpus; only the service handles are shared.

pub mod error;

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use meetnotes_core::{HistoryInput, Pipeline, SilentProgress, SynthesisRequest};
use meetnotes_ingest::SourceInput;
use meetnotes_shared::{MeetNotesError, Mode, Result};

pub use error::ApiError;

/// Handler state: the pipeline plus the server-wide shutdown token.
#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
    #[serde(default)]
    pub history: Option<HistoryInput>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Build the router. In-flight requests are cancelled when `shutdown` fires.
pub fn router(pipeline: Pipeline, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/reply", post(reply))
        .route("/health", get(health))
        .with_state(AppState { pipeline, shutdown })
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn serve(pipeline: Pipeline, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MeetNotesError::Network(format!("cannot bind {addr}: {e}")))?;

    let bound = listener
        .local_addr()
        .map_err(|e| MeetNotesError::Network(e.to_string()))?;
    info!(%bound, "server listening");

    let app = router(pipeline, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| MeetNotesError::Network(format!("server error: {e}")))?;

    info!("server stopped");
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn reply(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ReplyRequest>, JsonRejection>,
) -> std::result::Result<Response, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let request_id = Uuid::now_v7();
    let turns = body.history.map(HistoryInput::into_turns).unwrap_or_default();
    let span = info_span!("reply", %request_id, history = turns.len());

    let request = SynthesisRequest::new(vec![SourceInput::text("message", body.message)], Mode::Single)
        .with_history(turns);
    let cancel = state.shutdown.child_token();

    let result = state
        .pipeline
        .synthesize(request, &SilentProgress, &cancel)
        .instrument(span)
        .await?;

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        result.text,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    Ok(response)
}
