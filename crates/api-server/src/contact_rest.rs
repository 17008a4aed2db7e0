//! Contact form endpoint. Submissions are logged, not stored.

use crate::error::ApiError;
use crate::extract::Caller;
use axum::Json;
use binthere_accounts::validation::is_valid_email;
use binthere_core::types::{Ack, ContactRequest};
use tracing::info;

/// POST /api/contact/submit — Submit a contact form message.
#[utoipa::path(
    post,
    path = "/api/contact/submit",
    tag = "Contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Message received", body = Ack),
        (status = 400, description = "Missing fields or invalid email", body = crate::error::ErrorResponse),
    )
)]
pub async fn handle_contact_submit(
    caller: Caller,
    Json(request): Json<ContactRequest>,
) -> Result<Json<Ack>, ApiError> {
    let name = request.name.trim();
    let email = request.email.trim();
    let message = request.message.trim();

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(ApiError::bad_request(
            "missing_fields",
            "All fields are required",
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::bad_request(
            "invalid_email",
            "Please provide a valid email address",
        ));
    }

    info!(
        name = %name,
        email = %email,
        message = %message,
        ip = caller.context.ip.as_deref().unwrap_or("unknown"),
        "Contact form submission received"
    );
    metrics::counter!("contact.submissions").increment(1);

    Ok(Json(Ack::ok(
        "Thank you for your message! We have received your email and will contact you shortly.",
    )))
}
