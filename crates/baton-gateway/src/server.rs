//! Axum-based HTTP + WebSocket server.

use std::sync::Arc;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use baton_core::protocol::NewSessionResponse;

use crate::connection::handle_ws_connection;
use crate::state::GatewayState;

/// Build the gateway router.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let app = Router::new()
        .route("/new-session", post(new_session_handler))
        .route("/s/{session_id}/ws", get(session_ws_handler))
        .route("/health", get(health_handler));

    #[cfg(feature = "metrics")]
    let app = match crate::metrics::prometheus_handle() {
        Some(handle) => app.route(
            "/metrics",
            get(move || std::future::ready(handle.render())),
        ),
        None => app,
    };

    app.with_state(state).layer(TraceLayer::new_for_http())
}

/// Start the gateway server on `port`, binding the configured address.
pub async fn start_gateway(state: Arc<GatewayState>, port: u16) -> anyhow::Result<()> {
    let bind_addr = state.config.bind();
    let app = build_router(state);

    let addr = format!("{bind_addr}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn new_session_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let session_id = state.sessions.create().await;
    Json(NewSessionResponse { session_id })
}

async fn session_ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    match state.sessions.get(&session_id).await {
        Ok(session) => ws
            .on_upgrade(move |socket| handle_ws_connection(session, socket))
            .into_response(),
        Err(e) => {
            warn!(%e, "Rejecting WebSocket upgrade");
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len().await,
        "uptime_secs": state.uptime_secs(),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(%e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
