//! Backend Proxy
//!
//! Forwards every `/api/*` request to the configured backend and relays the
//! answer unchanged. When the backend cannot be reached the frontend gets a
//! `502` with a JSON body instead of a bare connection error.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use bytes::Bytes;
use tracing::{debug, error};

use crate::models::{AppState, ProxyErrorBody};

// Connection-scoped headers that must not be forwarded
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/{*path}", any(forward))
        .with_state(state)
}

async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let target = format!("{}{}", state.config.backend.url, path_and_query);

    debug!(method = %method, target = %target, "Forwarding request to backend");

    let upstream = state
        .http
        .request(method.clone(), &target)
        .headers(end_to_end(&headers))
        .body(body)
        .send()
        .await;

    let response = match upstream {
        Ok(response) => response,
        Err(e) => {
            error!(method = %method, target = %target, error = %e, "Backend unreachable");
            return bad_gateway(&state, e.to_string());
        }
    };

    let status = response.status();
    let response_headers = end_to_end(response.headers());
    match response.bytes().await {
        Ok(bytes) => (status, response_headers, bytes).into_response(),
        Err(e) => {
            error!(target = %target, error = %e, "Backend response interrupted");
            bad_gateway(&state, e.to_string())
        }
    }
}

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

fn bad_gateway(state: &AppState, details: String) -> Response {
    let body = ProxyErrorBody {
        error: "Backend unavailable".to_string(),
        details,
        backend_url: state.config.backend.url.clone(),
    };
    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
}
