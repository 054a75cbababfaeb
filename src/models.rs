use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;

/// Shared state for the proxy server routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
    pub connectivity: Arc<ConnectivityMonitor>,
}

impl AppState {
    /// The proxy client only bounds connecting: agent answers can take minutes.
    pub fn new(config: Config, connectivity: Arc<ConnectivityMonitor>) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.backend.request_timeout())
            .build()?;
        Ok(Self {
            config,
            http,
            connectivity,
        })
    }
}

// Wire records exchanged with the AutoAnalyst backend.
// Optional fields are defaulted so older backends that omit them still decode.

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "healthy" | "ok")
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AskRequest {
    pub query: String,
    pub session_id: String,
}

/// Body of `POST /api/export-pdf`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    #[serde(default)]
    pub charts: Vec<serde_json::Value>,
    #[serde(default = "default_query_type")]
    pub query_type: String,
    pub session_id: String,
}

fn default_query_type() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub chunks_created: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub chunks_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub has_more: bool,
}

impl DocumentList {
    /// Backends that only send `documents` get `total` filled from the list.
    pub fn normalized(mut self) -> Self {
        if self.total < self.documents.len() {
            self.total = self.documents.len();
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DocumentStats {
    pub total_documents: u64,
    pub processed_documents: u64,
    pub unprocessed_documents: u64,
    pub total_chunks: u64,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub file_types: HashMap<String, u64>,
    pub avg_chunks_per_doc: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SystemInfo {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub documents: DocumentStats,
    pub system: SystemInfo,
}

/// Body returned by the proxy when the backend cannot be reached.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProxyErrorBody {
    pub error: String,
    pub details: String,
    pub backend_url: String,
}

/// FastAPI error payload (`{"detail": "..."}`).
#[derive(Debug, serde::Deserialize)]
pub struct BackendErrorDetail {
    pub detail: serde_json::Value,
}
