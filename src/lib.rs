// AutoAnalyst - connectivity monitoring, debounced API gateway and backend proxy

pub mod api;
pub mod config;
pub mod connectivity;
pub mod fallback;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod types;

// Re-exports for convenience
pub use api::{ApiClient, AutoAnalyst};
pub use config::Config;
pub use connectivity::{Connectivity, ConnectivityMonitor, ConnectivityState};
pub use gateway::Gateway;
pub use models::AppState;
pub use types::{ApiError, ApiResult, Operation};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
