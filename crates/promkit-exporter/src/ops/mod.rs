//! Operational HTTP endpoints.
//!
//! - `/healthz`      : liveness
//! - `/metrics`      : text exposition format
//! - `/metrics.json` : the same snapshot as JSON

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use promkit_core::exposition::{self, TEXT_CONTENT_TYPE};

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let snaps = state.snapshot();
    tracing::debug!(metrics = snaps.len(), "scrape");
    let body = exposition::encode_bytes(&snaps);

    (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body).into_response()
}

pub async fn metrics_json(State(state): State<AppState>) -> Response {
    Json(state.snapshot()).into_response()
}
