use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{ForwarderFailure, forward_bytes};

pub struct ForwarderState {
    pub client: Client,
}

impl Default for ForwarderState {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

pub fn router(state: Arc<ForwarderState>) -> Router {
    Router::new()
        .route("/api/proxy", post(proxy))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Always answers 200 with the upstream outcome, or 500 with `{error}` when
/// the call could not be made at all.
async fn proxy(State(state): State<Arc<ForwarderState>>, body: Bytes) -> Response {
    match forward_bytes(&state.client, &body).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(err) => {
            warn!("forwarding failed: {err}");
            let failure = ForwarderFailure {
                error: err.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Binds `addr` and serves the forwarder until ctrl-c.
pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("forwarder listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(ForwarderState::default())))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down forwarder");
        })
        .await
}
