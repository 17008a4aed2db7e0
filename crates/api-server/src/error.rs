//! API error type and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use binthere_accounts::AccountError;
use binthere_classifier::ClassifierError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => *code,
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Upstream { .. } => "prediction_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

/// Error body. `error` carries the human-readable text clients display;
/// `code` is a stable machine-readable tag.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(message) => ApiError::bad_request("validation_failed", message),
            AccountError::EmailTaken | AccountError::UsernameTaken => {
                ApiError::bad_request("already_exists", err.to_string())
            }
            AccountError::InvalidCredentials | AccountError::WrongPassword => {
                ApiError::Unauthorized(err.to_string())
            }
            AccountError::NotFound => ApiError::NotFound(err.to_string()),
            AccountError::PasswordHash(_) => ApiError::Internal(err.to_string()),
            AccountError::Token(_) => ApiError::Forbidden("Invalid or expired token".into()),
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &err {
            ClassifierError::Upstream { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        ApiError::Upstream { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_error_mapping() {
        assert_eq!(
            ApiError::from(AccountError::EmailTaken).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AccountError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AccountError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_classifier_error_keeps_upstream_status() {
        let err = ApiError::from(ClassifierError::Upstream {
            status: 422,
            detail: "bad image".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "bad image");

        let err = ApiError::from(ClassifierError::Unavailable {
            base_url: "http://yolo".into(),
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_body_puts_message_in_error_field() {
        let resp = ApiError::from(AccountError::EmailTaken).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": "User with this email already exists",
                "code": "already_exists",
            })
        );
    }
}
