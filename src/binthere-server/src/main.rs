//! BinThere waste classification backend.
//!
//! Main entry point that wires the session tracker, accounts and the
//! detector client into the HTTP server.

use binthere_accounts::{AccountService, InMemoryUserStore, TokenIssuer};
use binthere_api::{ApiServer, AppState};
use binthere_classifier::YoloClient;
use binthere_core::config::AppConfig;
use binthere_session::SessionTracker;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "binthere-server")]
#[command(about = "Waste classification backend with disposal tracking")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "BINTHERE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "BINTHERE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Seconds a prediction session stays confirmable (overrides config)
    #[arg(long, env = "BINTHERE__SESSION__TTL_SECS")]
    session_ttl_secs: Option<u64>,

    /// Seconds between expired-session sweeps (overrides config)
    #[arg(long, env = "BINTHERE__SESSION__SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: Option<u64>,

    /// Base URL of the YOLO prediction service (overrides config)
    #[arg(long, env = "BINTHERE__CLASSIFIER__BASE_URL")]
    classifier_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "binthere_server=info,binthere_api=info,binthere_session=info,tower_http=info"
                    .into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("BinThere starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(ttl) = cli.session_ttl_secs {
        config.session.ttl_secs = ttl;
    }
    if let Some(interval) = cli.sweep_interval_secs {
        config.session.sweep_interval_secs = interval;
    }
    if let Some(url) = cli.classifier_url {
        config.classifier.base_url = url;
    }
    config.validate()?;

    if config.uses_default_secret() {
        warn!("Using the built-in token secret; set BINTHERE__AUTH__TOKEN_SECRET in production");
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        session_ttl_secs = config.session.ttl_secs,
        sweep_interval_secs = config.session.sweep_interval_secs,
        classifier = %config.classifier.base_url,
        "Configuration loaded"
    );

    let tracker = SessionTracker::from_config(&config.session);
    let sweeper = tracker.start_sweeper();

    let accounts = AccountService::new(
        Arc::new(InMemoryUserStore::new()),
        TokenIssuer::from_config(&config.auth),
    );
    let classifier = YoloClient::new(&config.classifier)?;

    let state = AppState {
        tracker: tracker.clone(),
        accounts: Arc::new(accounts),
        classifier: Arc::new(classifier),
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
        trust_forwarded_for: config.api.trust_forwarded_for,
        max_upload_bytes: config.api.max_upload_bytes,
    };

    let api_server = ApiServer::new(config.clone(), state);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("BinThere is ready to serve traffic");

    let signal_tracker = tracker.clone();
    let served = api_server
        .start_http(async move {
            shutdown_signal().await;
            // /ready reports 503 while in-flight requests drain.
            signal_tracker.shutdown();
        })
        .await;

    tracker.shutdown();
    if let Err(e) = sweeper.await {
        error!(error = %e, "Session sweeper task failed");
    }
    info!(remaining_sessions = tracker.len(), "BinThere shut down");

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
