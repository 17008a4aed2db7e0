//! HTTP client for the remote YOLO detection service.

use crate::types::{ClassifierError, ImageUpload, Prediction, NO_OBJECTS_MESSAGE};
use async_trait::async_trait;
use binthere_core::config::ClassifierConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Image classification backend.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn predict(&self, upload: ImageUpload) -> Result<Prediction, ClassifierError>;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> bool;
}

pub struct YoloClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    health_timeout: Duration,
}

impl YoloClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ClassifierError::Request(e.to_string()))?;

        if config.api_key.is_none() {
            warn!("Classifier API key not configured; predictions will fail");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            health_timeout: Duration::from_millis(config.health_timeout_ms),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ClassifierError {
        if err.is_connect() || err.is_timeout() {
            ClassifierError::Unavailable {
                base_url: self.base_url.clone(),
            }
        } else {
            ClassifierError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Classifier for YoloClient {
    async fn predict(&self, upload: ImageUpload) -> Result<Prediction, ClassifierError> {
        let api_key = self.api_key.as_deref().ok_or(ClassifierError::NotConfigured)?;
        metrics::counter!("classifier.requests").increment(1);

        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| ClassifierError::Request(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/predict", self.base_url))
            .header("x-api-key", api_key)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("classifier.failures").increment(1);
                warn!(error = %e, filename = %upload.filename, "Prediction request failed");
                self.transport_error(e)
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), filename = %upload.filename, "Prediction response");

        if status == StatusCode::NO_CONTENT {
            return Ok(Prediction::NoObjects {
                message: NO_OBJECTS_MESSAGE.to_string(),
            });
        }

        if !status.is_success() {
            metrics::counter!("classifier.failures").increment(1);
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Upstream {
                status: status.as_u16(),
                detail: upstream_detail(&body),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        if content_type.starts_with("image/") {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.transport_error(e))?;
            return Ok(Prediction::Annotated {
                bytes: bytes.to_vec(),
                content_type,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;
        Ok(Prediction::from_json(body))
    }

    async fn health_check(&self) -> bool {
        let result = self
            .http
            .get(format!("{}/docs", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await;

        match result {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                warn!(error = %e, "Prediction API health check failed");
                false
            }
        }
    }
}

/// Pull `detail` out of a JSON error body, falling back to the raw text.
fn upstream_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => json.to_string(),
        },
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => "Prediction API returned an error".to_string(),
    }
}
