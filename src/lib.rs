//! Switchyard - health-aware inference router and agent job queue
//!
//! Routes OpenAI-style chat completions across heterogeneous inference
//! backends (local accelerators first, cloud as fallback) by model alias,
//! capacity class and prompt size, with per-backend concurrency limits,
//! background health probing and an admission switch that can fence off
//! backends. Agent jobs run a tool-calling loop through the same router.

pub mod admission;
pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod health;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod routing;
pub mod streaming;
