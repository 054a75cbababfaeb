// Type definitions and enums

/// Logical backend operations, used as gateway keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    HealthCheck,
    Stats,
    Documents,
    Ask,
    Upload,
    DeleteDocument,
    ExportPdf,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::HealthCheck => "healthCheck",
            Operation::Stats => "stats",
            Operation::Documents => "documents",
            Operation::Ask => "ask",
            Operation::Upload => "upload",
            Operation::DeleteDocument => "deleteDocument",
            Operation::ExportPdf => "exportPdf",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response was received at all.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Operation {operation} is cooling down and has no cached result")]
    Cooldown { operation: Operation },
}

impl ApiError {
    pub fn is_network_error(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ApiError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            // connect, timeout, request and body errors all mean no usable response
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
