use crate::error::{BinError, BinResult};
use serde::Deserialize;
use std::time::Duration;

/// Secret used when none is configured. `AppConfig::uses_default_secret`
/// lets the binary warn about it at startup.
pub const DEFAULT_TOKEN_SECRET: &str = "binthere-dev-secret";

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Root application configuration. Loaded from environment variables
/// with the prefix `BINTHERE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Take the caller address from the first `X-Forwarded-For` entry.
    /// Only enable behind a reverse proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_secret")]
    pub token_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    3001
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_sweep_interval_secs() -> u64 {
    30 * 60
}
fn default_session_ttl_secs() -> u64 {
    60 * 60
}
fn default_classifier_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_classifier_timeout_ms() -> u64 {
    30_000
}
fn default_health_timeout_ms() -> u64 {
    5_000
}
fn default_token_secret() -> String {
    DEFAULT_TOKEN_SECRET.to_string()
}
fn default_token_ttl_hours() -> i64 {
    24
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            trust_forwarded_for: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

impl SessionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_url(),
            api_key: None,
            timeout_ms: default_classifier_timeout_ms(),
            health_timeout_ms: default_health_timeout_ms(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            classifier: ClassifierConfig::default(),
            auth: AuthConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> BinResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("BINTHERE")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service misbehave silently.
    pub fn validate(&self) -> BinResult<()> {
        if self.session.ttl_secs == 0 {
            return Err(BinError::Config("session.ttl_secs must be positive".into()));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(BinError::Config(
                "session.sweep_interval_secs must be positive".into(),
            ));
        }
        if self.auth.token_secret.is_empty() {
            return Err(BinError::Config("auth.token_secret must not be empty".into()));
        }
        if self.auth.token_ttl_hours <= 0 || self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(BinError::Config(format!(
                "auth.token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}"
            )));
        }
        if self.api.max_upload_bytes == 0 {
            return Err(BinError::Config("api.max_upload_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.token_secret == DEFAULT_TOKEN_SECRET
    }
}
