//! OpenAPI specification and Swagger UI configuration.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BinThere API",
        version = "0.1.0",
        description = "Waste classification backend.\n\nForwards photos to the YOLO prediction service, tracks prediction sessions so disposals can be confirmed once, and manages user accounts with a sorted-items counter.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Prediction", description = "Image classification and disposal confirmation"),
        (name = "Authentication", description = "Registration, login and account management"),
        (name = "Contact", description = "Contact form submissions"),
        (name = "Operations", description = "Health, readiness and liveness probes"),
    ),
    paths(
        // Prediction
        crate::prediction_rest::handle_predict,
        crate::prediction_rest::handle_disposal_confirmation,
        crate::prediction_rest::handle_prediction_health,
        crate::prediction_rest::handle_session_stats,
        // Authentication
        crate::auth_rest::handle_register,
        crate::auth_rest::handle_login,
        crate::auth_rest::handle_me,
        crate::auth_rest::handle_delete_me,
        crate::auth_rest::handle_update_password,
        crate::auth_rest::handle_list_users,
        // Contact
        crate::contact_rest::handle_contact_submit,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        binthere_core::types::PublicUser,
        binthere_core::types::RegisterRequest,
        binthere_core::types::LoginRequest,
        binthere_core::types::PasswordUpdateRequest,
        binthere_core::types::AuthResponse,
        binthere_core::types::SessionStats,
        binthere_core::types::DisposalResponse,
        binthere_core::types::ContactRequest,
        binthere_core::types::Ack,
        crate::error::ErrorResponse,
        crate::rest::HealthResponse,
        crate::rest::RouteNotFound,
        crate::prediction_rest::PredictionResponse,
        crate::prediction_rest::ImageUploadForm,
        crate::prediction_rest::PredictionHealthResponse,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("HMAC-SHA256")
                    .build(),
            ),
        );
    }
}
