//! AutoAnalyst Service
//!
//! The entry point views use to talk to the backend. Reads (stats, document
//! list) go through the debounced [`Gateway`]; when they fail because no
//! response arrived, a health check confirms the outage and the fixed
//! fallback snapshot is served instead. Uploads are validated locally before
//! anything is sent.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::{Config, GatewayConfig, UploadConfig};
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::fallback;
use crate::gateway::Gateway;
use crate::models::{AskRequest, AskResponse, DocumentList, SystemStats, UploadResponse};
use crate::types::{ApiError, ApiResult, Operation};

pub struct AutoAnalyst {
    client: Arc<ApiClient>,
    gateway: Gateway,
    connectivity: Arc<ConnectivityMonitor>,
    gateway_config: GatewayConfig,
    upload_config: UploadConfig,
}

impl AutoAnalyst {
    /// Build the client and a connectivity monitor probing the same backend.
    pub fn new(config: &Config) -> ApiResult<Self> {
        let client = Arc::new(ApiClient::from_config(&config.backend)?);
        let connectivity = Arc::new(ConnectivityMonitor::new(
            client.clone(),
            config.connectivity.poll_interval(),
            config.backend.request_timeout(),
        ));
        Ok(Self::with_parts(client, connectivity, config))
    }

    /// Assemble from an existing client and monitor (shared with other consumers).
    pub fn with_parts(
        client: Arc<ApiClient>,
        connectivity: Arc<ConnectivityMonitor>,
        config: &Config,
    ) -> Self {
        Self {
            client,
            gateway: Gateway::new(),
            connectivity,
            gateway_config: config.gateway.clone(),
            upload_config: config.upload.clone(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// Run one health check now. Never debounced.
    pub async fn check_health(&self) -> ApiResult<Connectivity> {
        let monitor = &self.connectivity;
        self.gateway
            .invoke(
                Operation::HealthCheck,
                || async move { Ok(monitor.check_health().await) },
                Duration::ZERO,
            )
            .await
    }

    pub async fn get_system_stats(&self) -> ApiResult<SystemStats> {
        let client = &self.client;
        let result = self
            .gateway
            .invoke(
                Operation::Stats,
                || async move { client.stats().await },
                self.gateway_config.stats_cooldown(),
            )
            .await;

        self.or_offline_fallback(Operation::Stats, result, fallback::system_stats)
            .await
    }

    pub async fn list_documents(&self) -> ApiResult<DocumentList> {
        let client = &self.client;
        let result = self
            .gateway
            .invoke(
                Operation::Documents,
                || async move { client.list_documents().await },
                self.gateway_config.documents_cooldown(),
            )
            .await;

        self.or_offline_fallback(Operation::Documents, result, fallback::documents)
            .await
    }

    /// Ask the agent a question. A fresh session id is generated when none is given.
    pub async fn ask(&self, query: &str, session_id: Option<String>) -> ApiResult<AskResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::Validation("Query is required".to_string()));
        }

        let request = AskRequest {
            query: query.to_string(),
            session_id: session_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        };

        let result = self.client.ask(&request).await;
        self.note_failure(Operation::Ask, &result).await;
        result
    }

    /// Check a prospective upload against the configured limits.
    pub fn validate_upload(&self, filename: &str, size: u64) -> ApiResult<()> {
        if filename.trim().is_empty() {
            return Err(ApiError::Validation("No file provided".to_string()));
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();

        if !self.upload_config.allowed_extensions.contains(&extension) {
            return Err(ApiError::Validation(format!(
                "File type {} not supported. Allowed: {}",
                if extension.is_empty() { "(none)" } else { extension.as_str() },
                self.upload_config.allowed_extensions.join(", ")
            )));
        }

        if size > self.upload_config.max_file_size {
            return Err(ApiError::Validation(format!(
                "File {} is {} bytes, exceeding the {} MB size limit",
                filename,
                size,
                self.upload_config.max_file_size / (1024 * 1024)
            )));
        }

        Ok(())
    }

    pub async fn upload_document(&self, filename: &str, bytes: Vec<u8>) -> ApiResult<UploadResponse> {
        self.validate_upload(filename, bytes.len() as u64)?;

        let result = self.client.upload(filename, bytes).await;
        match &result {
            Ok(uploaded) => {
                info!(id = %uploaded.id, filename = %uploaded.filename, chunks = uploaded.chunks_created, "Document uploaded");
                self.invalidate_document_views().await;
            }
            Err(_) => self.note_failure(Operation::Upload, &result).await,
        }
        result
    }

    /// Upload a file from disk. Size and type are checked before it is read.
    pub async fn upload_path(&self, path: &Path) -> ApiResult<UploadResponse> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ApiError::Validation(format!("Invalid file path: {}", path.display())))?
            .to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ApiError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
        self.validate_upload(&filename, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
        self.upload_document(&filename, bytes).await
    }

    pub async fn delete_document(&self, id: &str) -> ApiResult<()> {
        let result = self.client.delete_document(id).await;
        match &result {
            Ok(()) => {
                info!(id, "Document deleted");
                self.invalidate_document_views().await;
            }
            Err(_) => self.note_failure(Operation::DeleteDocument, &result).await,
        }
        result
    }

    /// Render a session's conversation as a PDF report.
    pub async fn export_pdf(&self, session_id: &str) -> ApiResult<Bytes> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ApiError::Validation("Session ID is required".to_string()));
        }

        let result = self.client.export_pdf(session_id).await;
        match &result {
            Ok(pdf) => info!(session_id, size = pdf.len(), "Report exported"),
            Err(_) => self.note_failure(Operation::ExportPdf, &result).await,
        }
        result
    }

    /// Next stats/document reads should hit the backend.
    async fn invalidate_document_views(&self) {
        self.gateway.reset(Operation::Documents).await;
        self.gateway.reset(Operation::Stats).await;
    }

    /// A network failure prompts a health check so the shared state catches up.
    async fn note_failure<T>(&self, operation: Operation, result: &ApiResult<T>) {
        if let Err(e) = result {
            if e.is_network_error() {
                warn!(operation = %operation, error = %e, "Backend unreachable, re-checking health");
                self.check_health().await.ok();
            }
        }
    }

    async fn or_offline_fallback<T>(
        &self,
        operation: Operation,
        result: ApiResult<T>,
        snapshot: fn() -> T,
    ) -> ApiResult<T> {
        match result {
            Err(e) if e.is_network_error() => {
                warn!(operation = %operation, error = %e, "Backend unreachable, re-checking health");
                match self.check_health().await {
                    Ok(Connectivity::Offline) => {
                        info!(operation = %operation, version = fallback::SNAPSHOT_VERSION, "Backend offline, serving fallback data");
                        Ok(snapshot())
                    }
                    _ => Err(e),
                }
            }
            other => other,
        }
    }
}

/// File name the backend gives an exported report.
pub fn report_filename(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(8).collect();
    format!("autoanalyst_report_{}.pdf", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(url: &str) -> Config {
        let mut config = Config::default();
        config.backend.url = url.to_string();
        config.backend.request_timeout_secs = 2;
        config
    }

    const STATS_BODY: &str = r#"{
        "documents": {"total_documents": 7, "processed_documents": 6, "total_chunks": 120},
        "system": {"status": "healthy", "version": "1.0.0"}
    }"#;

    #[tokio::test]
    async fn test_unreachable_backend_serves_mock_stats() {
        let service = AutoAnalyst::new(&config_for("http://127.0.0.1:1")).unwrap();

        let stats = service.get_system_stats().await.unwrap();

        assert_eq!(stats.documents.total_documents, 3);
        assert_eq!(stats, fallback::system_stats());
        assert_eq!(service.connectivity().status(), Connectivity::Offline);
    }

    #[tokio::test]
    async fn test_unreachable_backend_serves_mock_documents() {
        let service = AutoAnalyst::new(&config_for("http://127.0.0.1:1")).unwrap();
        let documents = service.list_documents().await.unwrap();
        assert_eq!(documents, fallback::documents());
    }

    #[tokio::test]
    async fn test_stats_are_debounced() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(STATS_BODY)
            .expect(1)
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        let first = service.get_system_stats().await.unwrap();
        let second = service.get_system_stats().await.unwrap();

        assert_eq!(first.documents.total_documents, 7);
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_surfaced_without_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/stats")
            .with_status(500)
            .with_body(r#"{"detail": "Error getting stats: disk full"}"#)
            .create_async()
            .await;
        let health = server
            .mock("GET", "/api/health")
            .expect(0)
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        let err = service.get_system_stats().await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(service.connectivity().status(), Connectivity::Unknown);
        health.assert_async().await;
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_locally() {
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", "/api/upload")
            .expect(0)
            .create_async()
            .await;

        let mut config = config_for(&server.url());
        config.upload.max_file_size = 1024;
        let service = AutoAnalyst::new(&config).unwrap();

        let err = service
            .upload_document("big.pdf", vec![0u8; 2048])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().contains("size limit"));
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected_locally() {
        let service = AutoAnalyst::new(&Config::default()).unwrap();
        let err = service.validate_upload("payload.exe", 10).unwrap_err();
        assert!(err.to_string().contains("not supported"));

        let err = service.validate_upload("", 10).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        assert!(service.validate_upload("Report.PDF", 10).is_ok());
    }

    #[tokio::test]
    async fn test_upload_path_from_disk() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "doc-9", "filename": "notes.md", "chunks_created": 1}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n\nRevenue grew 12%.").unwrap();

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        let uploaded = service.upload_path(&path).await.unwrap();

        assert_eq!(uploaded.id, "doc-9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let service = AutoAnalyst::new(&Config::default()).unwrap();
        let err = service.ask("   ", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ask_generates_session_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/ask")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"query": "How many orders?"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer": "42", "sources": [], "charts": [], "query_type": "sql", "session_id": "generated"}"#)
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        let response = service.ask("How many orders?", None).await.unwrap();
        assert_eq!(response.answer, "42");
        assert_eq!(response.query_type, "sql");
    }

    #[tokio::test]
    async fn test_delete_invalidates_cached_documents() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/api/documents")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"documents": [{"id": "doc-1", "filename": "a.pdf", "processed": true, "chunks_count": 3}], "total": 1, "has_more": false}"#)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/documents/doc-1")
            .with_status(200)
            .with_body(r#"{"message": "Document deleted successfully"}"#)
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        service.list_documents().await.unwrap();
        service.list_documents().await.unwrap();
        service.delete_document("doc-1").await.unwrap();
        service.list_documents().await.unwrap();

        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_check_health_updates_shared_state() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "healthy"}"#)
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        let mut rx = service.connectivity().subscribe();

        assert_eq!(service.check_health().await.unwrap(), Connectivity::Online);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_online());
    }

    #[tokio::test]
    async fn test_server_error_replayed_while_online_is_not_mock() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "healthy"}"#)
            .create_async()
            .await;
        let stats = server
            .mock("GET", "/api/stats")
            .with_status(500)
            .with_body(r#"{"detail": "Error getting stats: disk full"}"#)
            .expect(1)
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        assert_eq!(service.check_health().await.unwrap(), Connectivity::Online);

        let first = service.get_system_stats().await;
        let retry = service.get_system_stats().await;

        for result in [first, retry] {
            let err = result.unwrap_err();
            assert_eq!(err.status(), Some(500));
            assert!(err.to_string().contains("disk full"));
        }
        assert_eq!(service.connectivity().status(), Connectivity::Online);
        stats.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_pdf_returns_report() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/export-pdf")
            .match_body(mockito::Matcher::Json(serde_json::json!({"session_id": "5b1d7c40-aa01"})))
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 quarterly")
            .create_async()
            .await;

        let service = AutoAnalyst::new(&config_for(&server.url())).unwrap();
        let pdf = service.export_pdf(" 5b1d7c40-aa01 ").await.unwrap();

        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(report_filename("5b1d7c40-aa01"), "autoanalyst_report_5b1d7c40.pdf");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_pdf_requires_session() {
        let service = AutoAnalyst::new(&Config::default()).unwrap();
        let err = service.export_pdf("  ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_export_pdf_unreachable_rechecks_health() {
        let service = AutoAnalyst::new(&config_for("http://127.0.0.1:1")).unwrap();

        let err = service.export_pdf("5b1d7c40-aa01").await.unwrap_err();

        assert!(err.is_network_error());
        assert_eq!(service.connectivity().status(), Connectivity::Offline);
    }

    #[test]
    fn test_report_filename_short_session() {
        assert_eq!(report_filename("abc"), "autoanalyst_report_abc.pdf");
    }
}
