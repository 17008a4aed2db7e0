//! Router assembly plus the HTTP and metrics listeners.

use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use crate::{auth_rest, contact_rest, prediction_rest};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use binthere_core::config::AppConfig;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let prediction = Router::new()
        .route(
            "/predict",
            post(prediction_rest::handle_predict).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/disposal-confirmation",
            post(prediction_rest::handle_disposal_confirmation),
        )
        .route("/health", get(prediction_rest::handle_prediction_health))
        .route("/session-stats", get(prediction_rest::handle_session_stats));

    let auth = Router::new()
        .route("/register", post(auth_rest::handle_register))
        .route("/login", post(auth_rest::handle_login))
        .route(
            "/me",
            get(auth_rest::handle_me).delete(auth_rest::handle_delete_me),
        )
        .route("/password", put(auth_rest::handle_update_password))
        .route("/users", get(auth_rest::handle_list_users));

    let contact = Router::new().route("/submit", post(contact_rest::handle_contact_submit));

    Router::new()
        .nest("/api/prediction", prediction)
        .nest("/api/auth", auth)
        .nest("/api/contact", contact)
        // Operational endpoints
        .route("/api/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .fallback(rest::not_found)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Owns the listener configuration and the handler state.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve the REST API until `shutdown` resolves.
    pub async fn start_http<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Start the Prometheus exporter on a separate port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
