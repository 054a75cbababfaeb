use axum::{extract::State, routing::get, Json, Router};

use crate::connectivity::ConnectivityState;
use crate::models::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/proxy/status", get(connectivity_status))
        .with_state(state)
}

async fn connectivity_status(State(state): State<AppState>) -> Json<ConnectivityState> {
    Json(state.connectivity.current())
}
