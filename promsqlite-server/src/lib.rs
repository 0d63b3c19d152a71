//! HTTP surface for the promsqlite remote-storage adapter.
//!
//! Three routes, bit-compatible with the Prometheus remote storage
//! protocol:
//!
//! - `GET /healthcheck` — liveness check, body `"hello!"`
//! - `POST /api/v1/remote_write` — snappy-compressed protobuf
//!   `WriteRequest`; 200 on accept, 400 on decompression or parse failure
//! - `POST /api/v1/remote_read` — snappy-compressed protobuf
//!   `ReadRequest`; 200 with a compressed `ReadResponse`, 422 on
//!   decompression/parse failure, 503 on query failure
//!
//! Writes are acknowledged as soon as the write serializer accepts the
//! handoff; the transaction runs afterwards. Reads execute on the blocking
//! pool with a per-request connection, so concurrent reads lean on
//! SQLite's own concurrency control rather than any lock here.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use promsqlite::{Storage, WriteSerializer, codec, execute_read};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The single write serializer for the process.
    pub writer: Arc<WriteSerializer>,
    /// Database path; each read request opens its own connection to it.
    pub db_path: PathBuf,
}

/// Builds the adapter's router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/api/v1/remote_write", post(remote_write))
        .route("/api/v1/remote_read", post(remote_read))
        .with_state(state)
}

/// Handle GET /healthcheck
async fn healthcheck() -> &'static str {
    tracing::debug!("received healthcheck");
    "hello!"
}

/// Handle POST /api/v1/remote_write
///
/// A 200 means accepted, not committed: the serializer applies the
/// transaction after this handler has returned.
async fn remote_write(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match codec::decode_write(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("rejecting write: {e}");
            return (StatusCode::BAD_REQUEST, format!("could not decode body: {e}"))
                .into_response();
        }
    };

    match state.writer.submit(request).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!("write submission failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Handle POST /api/v1/remote_read
async fn remote_read(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match codec::decode_read(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("rejecting read: {e}");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("could not decode read request: {e}"),
            )
                .into_response();
        }
    };

    let db_path = state.db_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        // The writer bootstrapped the schema at startup, so read
        // connections skip the DDL and the WAL switch.
        let storage = Storage::open_existing(&db_path)?;
        execute_read(&storage, &request)
    })
    .await;

    let response = match result {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!("read request failed: {e}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        Err(e) => {
            tracing::error!("read task failed: {e}");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    match codec::encode_read_response(&response) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/x-protobuf"),
                (header::CONTENT_ENCODING, "snappy"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("could not encode read response: {e}");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Resolves when ctrl-c is received; used for graceful shutdown.
///
/// # Panics
///
/// Panics if the ctrl-c signal handler cannot be installed.
pub async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
