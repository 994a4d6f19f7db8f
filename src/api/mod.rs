//! # API Gateway
//!
//! OpenAI-compatible chat completions plus the Switchyard control surface.
//!
//! ## Endpoints
//!
//! - `POST /v1/chat/completions` - Chat completion, streaming or not
//! - `GET /v1/backends` - Backend health and load
//! - `GET /v1/admission` / `PUT /v1/admission` - Admission mode (PUT is admin)
//! - `POST /v1/jobs` - Submit an agent job (202)
//! - `GET /v1/jobs` - List jobs, filtered by `agent_id` and `status`
//! - `GET /v1/jobs/{job_id}` - Job with its steps
//! - `POST /v1/jobs/{job_id}/cancel` - Cancel (owner or admin)
//! - `GET /health` - Overall status with backend counts
//! - `GET /metrics` - Prometheus exposition
//!
//! ## Example
//!
//! ```no_run
//! use switchyard::api::{AppState, create_router};
//! use switchyard::config::SwitchyardConfig;
//! use switchyard::registry::Registry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::new());
//! let config = Arc::new(SwitchyardConfig::default());
//! let state = Arc::new(AppState::new(registry, config));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All errors are returned in OpenAI-compatible format:
//! ```json
//! {
//!   "error": {
//!     "message": "Model 'gpt-4' not found",
//!     "type": "invalid_request_error",
//!     "param": "model",
//!     "code": "model_not_found"
//!   }
//! }
//! ```

mod admission;
mod backends;
mod completions;
mod error;
pub mod headers;
mod health;
mod jobs;
pub mod types;

pub use health::overall_status;
pub use types::*;

use crate::admission::AdmissionController;
use crate::config::SwitchyardConfig;
use crate::jobs::{JobExecutor, JobJournal, JobQueue, ToolRegistry};
use crate::metrics::MetricsCollector;
use crate::registry::Registry;
use crate::routing;
use crate::streaming::StreamingGateway;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: Arc<SwitchyardConfig>,
    pub admission: Arc<AdmissionController>,
    pub router: Arc<routing::Router>,
    pub streaming: StreamingGateway,
    pub jobs: Arc<JobQueue>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    /// Create new application state with the given registry and configuration.
    pub fn new(registry: Arc<Registry>, config: Arc<SwitchyardConfig>) -> Self {
        Self::with_journal(registry, config, None)
    }

    /// Same as [`AppState::new`], with jobs journaled to `journal`.
    pub fn with_journal(
        registry: Arc<Registry>,
        config: Arc<SwitchyardConfig>,
        journal: Option<Arc<dyn JobJournal>>,
    ) -> Self {
        let start_time = Instant::now();

        let admission = Arc::new(AdmissionController::from_config(&config.admission));
        let router = Arc::new(routing::Router::new(
            Arc::clone(&registry),
            Arc::clone(&admission),
            config.routing.clone(),
        ));

        let executor = JobExecutor::new(
            Arc::clone(&router),
            Arc::clone(&registry),
            Arc::new(ToolRegistry::with_builtins()),
            &config.jobs,
        );
        let mut queue = JobQueue::new(executor, config.jobs.clone());
        if let Some(journal) = journal {
            queue = queue.with_journal(journal);
        }

        let metrics_collector = Arc::new(MetricsCollector::new(
            Arc::clone(&registry),
            start_time,
            crate::metrics::prometheus_handle(),
        ));

        Self {
            streaming: StreamingGateway::new(&config.streaming),
            registry,
            config,
            admission,
            router,
            jobs: Arc::new(queue),
            start_time,
            metrics_collector,
        }
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .route("/v1/chat/completions", post(completions::handle))
        .route("/v1/backends", get(backends::handle))
        .route("/v1/admission", get(admission::get).put(admission::put))
        .route("/v1/jobs", post(jobs::submit).get(jobs::list))
        .route("/v1/jobs/:job_id", get(jobs::get))
        .route("/v1/jobs/:job_id/cancel", post(jobs::cancel))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
