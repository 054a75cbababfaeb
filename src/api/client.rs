// HTTP client for the AutoAnalyst backend
// Endpoints: /api/health, /api/ask, /api/upload, /api/documents, /api/stats, /api/export-pdf

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::connectivity::HealthProbe;
use crate::models::{
    AskRequest, AskResponse, BackendErrorDetail, DocumentList, ExportRequest, HealthResponse,
    SystemStats, UploadResponse,
};
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Every request made by this client is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &BackendConfig) -> ApiResult<Self> {
        Self::new(config.url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> ApiResult<HealthResponse> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        Self::decode(response).await
    }

    pub async fn ask(&self, request: &AskRequest) -> ApiResult<AskResponse> {
        debug!(session_id = %request.session_id, "Sending query to backend");
        let response = self
            .client
            .post(self.url("/api/ask"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Upload a document as the multipart field `file`.
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> ApiResult<UploadResponse> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())?;
        let form = multipart::Form::new().part("file", part);

        debug!(filename, size, mime = %mime, "Uploading document");
        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_documents(&self) -> ApiResult<DocumentList> {
        let response = self.client.get(self.url("/api/documents")).send().await?;
        let list: DocumentList = Self::decode(response).await?;
        Ok(list.normalized())
    }

    pub async fn delete_document(&self, id: &str) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/documents/{}", id)))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    pub async fn stats(&self) -> ApiResult<SystemStats> {
        let response = self.client.get(self.url("/api/stats")).send().await?;
        Self::decode(response).await
    }

    /// Render the session's conversation as a PDF report.
    pub async fn export_pdf(&self, session_id: &str) -> ApiResult<Bytes> {
        debug!(session_id, "Requesting PDF export");
        let response = self
            .client
            .post(self.url("/api/export-pdf"))
            .json(&ExportRequest { session_id: session_id.to_string() })
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Turn a non-2xx response into a `Server` error carrying the backend's message.
    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<BackendErrorDetail>(&body) {
            Ok(BackendErrorDetail { detail: serde_json::Value::String(detail) }) => detail,
            Ok(BackendErrorDetail { detail }) => detail.to_string(),
            Err(_) if !body.trim().is_empty() => body,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };

        warn!(status = status.as_u16(), message = %message, "Backend returned an error");
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl HealthProbe for ApiClient {
    async fn probe(&self) -> ApiResult<HealthResponse> {
        self.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_health_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "healthy", "services": {"export_service": {"status": "healthy"}}, "version": "1.0.0"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let health = client.health().await.unwrap();

        assert!(health.is_healthy());
        assert_eq!(health.version.as_deref(), Some("1.0.0"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_carries_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/ask")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Error processing query: model unavailable"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let err = client
            .ask(&AskRequest {
                query: "total revenue by region".to_string(),
                session_id: "s-1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(!err.is_network_error());
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // nothing listens on port 1
        let client = ApiClient::new("http://127.0.0.1:1", TIMEOUT).unwrap();
        let err = client.stats().await.unwrap_err();
        assert!(err.is_network_error());
    }

    #[tokio::test]
    async fn test_ask_sends_query_and_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/ask")
            .match_body(Matcher::Json(serde_json::json!({
                "query": "Summarize the report",
                "session_id": "abc"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer": "It grew.", "sources": [{"title": "report.pdf"}], "charts": [], "query_type": "rag", "session_id": "abc"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let response = client
            .ask(&AskRequest {
                query: "Summarize the report".to_string(),
                session_id: "abc".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.answer, "It grew.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.query_type, "rag");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_is_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/upload")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data; boundary=.*".to_string()),
            )
            .match_body(Matcher::Regex(r#"name="file"; filename="notes.txt""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "doc-1", "filename": "notes.txt", "status": "completed", "chunks_created": 2}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let uploaded = client.upload("notes.txt", b"hello".to_vec()).await.unwrap();

        assert_eq!(uploaded.id, "doc-1");
        assert_eq!(uploaded.chunks_created, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_document() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("DELETE", "/api/documents/doc-1")
            .with_status(200)
            .with_body(r#"{"message": "Document deleted successfully"}"#)
            .create_async()
            .await;
        server
            .mock("DELETE", "/api/documents/missing")
            .with_status(404)
            .with_body(r#"{"detail": "Document not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        client.delete_document("doc-1").await.unwrap();
        ok.assert_async().await;

        let err = client.delete_document("missing").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("Document not found"));
    }

    #[tokio::test]
    async fn test_garbled_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/stats")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let err = client.stats().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_export_pdf_returns_document_bytes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/export-pdf")
            .match_body(Matcher::Json(serde_json::json!({"session_id": "0f3c9a2e-77aa"})))
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(b"%PDF-1.4 report")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let pdf = client.export_pdf("0f3c9a2e-77aa").await.unwrap();

        assert!(pdf.starts_with(b"%PDF"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_export_pdf_without_history_is_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/export-pdf")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "No chat history found for this session"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), TIMEOUT).unwrap();
        let err = client.export_pdf("missing").await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("No chat history"));
    }
}
