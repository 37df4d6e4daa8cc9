//! Liveness endpoint for Steadyhand.
//!
//! Hosting platforms poll an HTTP port to decide whether the process is
//! alive. `GET /` answers with a plain string; `GET /health` adds the
//! current session status as JSON.

use axum::{Router, extract::State, response::Json, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use steadyhand_agent::SessionStatus;
use steadyhand_config::GatewayConfig;

/// Shared state for the handlers.
pub struct GatewayState {
    pub status: watch::Receiver<SessionStatus>,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(status: watch::Receiver<SessionStatus>) -> Self {
        Self {
            status,
            started_at: Utc::now(),
        }
    }
}

type SharedState = Arc<GatewayState>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve(
    config: &GatewayConfig,
    status: watch::Receiver<SessionStatus>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| GatewayError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(addr = %addr, "Liveness endpoint listening");
    let app = build_router(Arc::new(GatewayState::new(status)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// --- Handlers ---

async fn root_handler() -> &'static str {
    "Bot is running!"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
    session: SessionStatus,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let session = state.status.borrow().clone();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        session,
    })
}
