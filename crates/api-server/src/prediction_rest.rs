//! Waste classification, disposal confirmation and session monitoring endpoints.

use crate::error::ApiError;
use crate::extract::Caller;
use crate::rest::AppState;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use binthere_classifier::{is_allowed_image_type, ImageUpload, Prediction};
use binthere_core::types::{DisposalResponse, SessionStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

const UPLOAD_FIELD: &str = "file";

/// JSON body for predictions that did not come back as an annotated image.
#[derive(Serialize, ToSchema)]
pub struct PredictionResponse {
    pub success: bool,
    pub message: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub filename: String,
}

/// Multipart form accepted by the predict endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    /// JPEG, PNG or WEBP image.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct PredictionHealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/prediction/predict — Classify an uploaded image.
#[utoipa::path(
    post,
    path = "/api/prediction/predict",
    tag = "Prediction",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Annotated image, or JSON when nothing was drawn", body = PredictionResponse),
        (status = 400, description = "No file or invalid file type", body = crate::error::ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = crate::error::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::error::ErrorResponse),
        (status = 503, description = "Prediction API unavailable", body = crate::error::ErrorResponse),
    )
)]
pub async fn handle_predict(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = read_upload(multipart, state.max_upload_bytes).await?;
    let filename = upload.filename.clone();

    let prediction = state.classifier.predict(upload).await.map_err(|e| {
        warn!(error = %e, filename = %filename, "Prediction failed");
        ApiError::from(e)
    })?;

    if prediction.has_detections() {
        let session = state.tracker.track_prediction(&caller.context);
        info!(session = %session, filename = %filename, "Prediction session opened");
    }

    let response = match prediction {
        Prediction::Annotated {
            bytes,
            content_type,
        } => (
            [
                (CONTENT_TYPE, content_type),
                (
                    CONTENT_DISPOSITION,
                    format!("inline; filename=\"annotated_{}\"", header_safe(&filename)),
                ),
            ],
            bytes,
        )
            .into_response(),
        Prediction::Detections(data) => Json(PredictionResponse {
            success: true,
            message: "Prediction completed".to_string(),
            data,
            filename,
        })
        .into_response(),
        Prediction::NoObjects { message } => Json(PredictionResponse {
            success: true,
            data: serde_json::json!({ "message": message }),
            message,
            filename,
        })
        .into_response(),
    };
    Ok(response)
}

/// POST /api/prediction/disposal-confirmation — Confirm the last prediction's item was disposed of.
#[utoipa::path(
    post,
    path = "/api/prediction/disposal-confirmation",
    tag = "Prediction",
    responses(
        (status = 200, description = "Disposal confirmed", body = DisposalResponse),
        (status = 400, description = "No recent prediction to confirm", body = crate::error::ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = crate::error::ErrorResponse),
        (status = 500, description = "Sorted count update failed", body = crate::error::ErrorResponse),
    ),
    security((), ("bearer_auth" = []))
)]
pub async fn handle_disposal_confirmation(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<DisposalResponse>, ApiError> {
    if !state.tracker.can_confirm_disposal(&caller.context) {
        metrics::counter!("session.confirmations_rejected").increment(1);
        warn!(
            session = %caller.context.identity(),
            "Disposal confirmation without a recent prediction"
        );
        return Err(ApiError::bad_request(
            "no_recent_prediction",
            "No recent prediction found. Please classify an item before confirming disposal.",
        ));
    }

    // Stays confirmed even if the counter update below fails.
    state.tracker.confirm_disposal(&caller.context);

    let Some(claims) = caller.claims else {
        return Ok(Json(DisposalResponse {
            success: true,
            message: "Disposal confirmed".to_string(),
            items_sorted_count: None,
        }));
    };

    let count = state
        .accounts
        .increment_items_sorted(claims.id)
        .map_err(|e| {
            error!(error = %e, user_id = %claims.id, "Failed to increment items sorted count");
            ApiError::Internal("Disposal confirmed but the sorted count could not be updated".into())
        })?;

    info!(user_id = %claims.id, items_sorted = count, "Disposal confirmed");
    Ok(Json(DisposalResponse {
        success: true,
        message: "Disposal confirmed".to_string(),
        items_sorted_count: Some(count),
    }))
}

/// GET /api/prediction/health — Check that the prediction API is reachable.
#[utoipa::path(
    get,
    path = "/api/prediction/health",
    tag = "Prediction",
    responses(
        (status = 200, description = "Prediction API is healthy", body = PredictionHealthResponse),
        (status = 503, description = "Prediction API is not available", body = PredictionHealthResponse),
    )
)]
pub async fn handle_prediction_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<PredictionHealthResponse>) {
    let healthy = state.classifier.health_check().await;
    let (status, message) = if healthy {
        (StatusCode::OK, "Prediction API is healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Prediction API is not available")
    };

    (
        status,
        Json(PredictionHealthResponse {
            success: healthy,
            message: message.to_string(),
            timestamp: Utc::now(),
        }),
    )
}

/// GET /api/prediction/session-stats — Prediction session counts.
#[utoipa::path(
    get,
    path = "/api/prediction/session-stats",
    tag = "Prediction",
    responses((status = 200, description = "Session snapshot", body = SessionStats))
)]
pub async fn handle_session_stats(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.tracker.stats())
}

/// Pull the `file` field out of the form and check its type and size.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_allowed_image_type(&content_type) {
            return Err(ApiError::bad_request(
                "invalid_file_type",
                "Invalid file type. Please upload an image file (JPEG, PNG, JPG, WEBP).",
            ));
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::bad_request(
        "no_file",
        "No file uploaded. Please provide a file.",
    ))
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!("File exceeds the {max_bytes} byte upload limit"))
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::bad_request("malformed_upload", err.body_text())
    }
}

/// Replace characters that cannot appear inside a quoted header parameter.
fn header_safe(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe_filename() {
        assert_eq!(header_safe("can 1.jpg"), "can 1.jpg");
        assert_eq!(header_safe("a\"b\\c.png"), "a_b_c.png");
        assert_eq!(header_safe("bouteille-é.jpg"), "bouteille-_.jpg");
    }
}
