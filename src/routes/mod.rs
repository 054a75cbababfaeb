//! Proxy Routes
//!
//! The HTTP surface served to the frontend:
//! - `/api/*` - Catch-all forwarder to the AutoAnalyst backend
//! - `/proxy/status` - Connectivity state as seen by this process

pub mod health;
pub mod proxy;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

// Multipart framing on top of the largest allowed upload
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Create the proxy router
pub fn create_router(state: AppState) -> Router {
    info!(backend = %state.config.backend.url, "Creating proxy router");

    let body_limit = (state.config.upload.max_file_size + MULTIPART_OVERHEAD) as usize;
    let origins = state.config.server.cors_allowed_origins.clone();

    let router = Router::new()
        .merge(health::router(state.clone()))
        .merge(proxy::router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}
