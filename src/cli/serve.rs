//! Serve command implementation

use crate::agent::factory::{register_backends, AgentTimeouts};
use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::SwitchyardConfig;
use crate::health::HealthMonitor;
use crate::jobs::{JobJournal, JsonlJournal};
use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<SwitchyardConfig, Box<dyn std::error::Error>> {
    let mut config = if args.config.exists() {
        SwitchyardConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        SwitchyardConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.no_health_check {
        config.health_check.enabled = false;
    }

    Ok(config)
}

/// Shared HTTP client for every backend agent.
fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .build()
}

/// Create the registry and one agent per configured backend.
pub fn build_registry(
    config: &SwitchyardConfig,
) -> Result<Arc<Registry>, Box<dyn std::error::Error>> {
    let registry = Arc::new(Registry::new());
    let timeouts = AgentTimeouts {
        probe: Duration::from_secs(config.health_check.timeout_seconds),
        request: Duration::from_secs(config.routing.request_timeout_seconds),
    };
    let count = register_backends(
        &registry,
        &config.backends,
        Arc::new(build_http_client()?),
        timeouts,
    )?;
    tracing::info!(backends = count, "Backends registered");
    Ok(registry)
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    crate::logging::init(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Switchyard");
    tracing::debug!(?config, "Loaded configuration");

    let registry = build_registry(&config)?;

    let journal: Option<Arc<dyn JobJournal>> = match &config.jobs.journal_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Journaling jobs");
            Some(Arc::new(JsonlJournal::open(path)?))
        }
        None => None,
    };

    let state = Arc::new(AppState::with_journal(
        Arc::clone(&registry),
        Arc::new(config.clone()),
        journal,
    ));
    let app = create_router(Arc::clone(&state));

    let cancel_token = CancellationToken::new();
    let health_handle = if config.health_check.enabled {
        let monitor = HealthMonitor::new(Arc::clone(&registry), config.health_check.clone());
        Some(monitor.start(cancel_token.clone()))
    } else {
        tracing::info!("Health checking disabled");
        None
    };
    let jobs_handle = state.jobs.start(cancel_token.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Switchyard API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    if let Some(handle) = health_handle {
        tracing::info!("Waiting for health monitor to stop");
        handle.await?;
    }
    tracing::info!("Waiting for job dispatcher to stop");
    jobs_handle.await?;

    tracing::info!("Switchyard stopped");
    Ok(())
}
