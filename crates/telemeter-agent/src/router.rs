//! Axum router wiring (scrape endpoint).
//!
//! Exposes `GET /metrics` returning the Prometheus text body, and binds the
//! listener it is served on.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use telemeter_core::error::{Result, TelemeterError};
use tokio::net::TcpListener;

use crate::app_state::AgentState;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn build_router(state: AgentState) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .with_state(state)
}

async fn scrape(State(state): State<AgentState>) -> Response {
    match state.metrics() {
        Some(registry) => (
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            registry.render_prometheus(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Bind the scrape listener and log the readiness line.
pub async fn bind_listener(bind: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(bind).await.map_err(|e| {
        TelemeterError::Transport(format!("failed to bind Prometheus listener {bind}: {e}"))
    })?;
    tracing::info!("started Prometheus HTTP listener {bind}");
    Ok(listener)
}
