use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// File extensions the backend knows how to ingest.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".doc", ".txt", ".md"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub connectivity: ConnectivityConfig,
    pub gateway: GatewayConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    pub poll_interval_secs: u64,
    pub banner_hide_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub stats_cooldown_ms: u64,
    pub documents_cooldown_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ConnectivityConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn banner_hide_delay(&self) -> Duration {
        Duration::from_secs(self.banner_hide_delay_secs)
    }
}

impl GatewayConfig {
    pub fn stats_cooldown(&self) -> Duration {
        Duration::from_millis(self.stats_cooldown_ms)
    }

    pub fn documents_cooldown(&self) -> Duration {
        Duration::from_millis(self.documents_cooldown_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ],
            },
            backend: BackendConfig {
                url: "http://localhost:8000".to_string(),
                request_timeout_secs: 5,
            },
            connectivity: ConnectivityConfig {
                poll_interval_secs: 10,
                banner_hide_delay_secs: 5,
            },
            gateway: GatewayConfig {
                stats_cooldown_ms: 5000,
                documents_cooldown_ms: 5000,
            },
            upload: UploadConfig {
                max_file_size: 10 * 1024 * 1024,
                allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| defaults.server.port.to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or(defaults.server.host),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.cors_allowed_origins),
            },
            backend: BackendConfig {
                url: env::var("BACKEND_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.backend.url),
                request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| defaults.backend.request_timeout_secs.to_string())
                    .parse()?,
            },
            connectivity: ConnectivityConfig {
                poll_interval_secs: env::var("HEALTH_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| defaults.connectivity.poll_interval_secs.to_string())
                    .parse()?,
                banner_hide_delay_secs: env::var("BANNER_HIDE_DELAY_SECS")
                    .unwrap_or_else(|_| defaults.connectivity.banner_hide_delay_secs.to_string())
                    .parse()?,
            },
            gateway: GatewayConfig {
                stats_cooldown_ms: env::var("STATS_COOLDOWN_MS")
                    .unwrap_or_else(|_| defaults.gateway.stats_cooldown_ms.to_string())
                    .parse()?,
                documents_cooldown_ms: env::var("DOCUMENTS_COOLDOWN_MS")
                    .unwrap_or_else(|_| defaults.gateway.documents_cooldown_ms.to_string())
                    .parse()?,
            },
            upload: UploadConfig {
                max_file_size: env::var("MAX_FILE_SIZE")
                    .unwrap_or_else(|_| defaults.upload.max_file_size.to_string())
                    .parse()?,
                allowed_extensions: defaults.upload.allowed_extensions,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the connectivity monitor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.connectivity.poll_interval_secs == 0 {
            anyhow::bail!("HEALTH_POLL_INTERVAL_SECS must be greater than zero");
        }
        if self.backend.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }
}
