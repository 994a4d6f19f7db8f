//! Agent loop for one job.

use super::handle::JobHandle;
use super::tools::{ToolContext, ToolRegistry};
use super::types::{ActionType, AgentRunStep, JobStatus};
use crate::admission::apply_force_directive;
use crate::agent::AgentError;
use crate::api::types::{ChatCompletionRequest, ChatMessage};
use crate::config::JobsConfig;
use crate::registry::Registry;
use crate::routing::{estimate_tokens, BackendLease, ModelAlias, Router, RoutingRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an autonomous agent. Use the provided tools when they help, \
then reply with a final answer and no tool calls.";

/// Why the loop stopped without a final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Halt {
    Cancelled,
    Failed(String),
}

/// Runs jobs: route, call the backend, run tools, repeat.
pub struct JobExecutor {
    router: Arc<Router>,
    registry: Arc<Registry>,
    tools: Arc<ToolRegistry>,
    route_retry_delay: Duration,
    route_wait_warn: Duration,
    request_timeout: Duration,
}

impl JobExecutor {
    pub fn new(
        router: Arc<Router>,
        registry: Arc<Registry>,
        tools: Arc<ToolRegistry>,
        config: &JobsConfig,
    ) -> Self {
        let request_timeout = Duration::from_secs(router.config().request_timeout_seconds);
        Self {
            router,
            registry,
            tools,
            route_retry_delay: Duration::from_millis(config.route_retry_delay_ms),
            route_wait_warn: Duration::from_secs(config.route_wait_warn_seconds),
            request_timeout,
        }
    }

    /// Drive a pending job to a terminal status.
    ///
    /// A job cancelled before it starts is left untouched.
    pub async fn run(&self, handle: Arc<JobHandle>) {
        if !handle.transition(JobStatus::Running, |_| {}) {
            return;
        }

        match self.drive(&handle).await {
            Ok(answer) => {
                handle.transition(JobStatus::Completed, |job| job.result = Some(answer));
            }
            Err(Halt::Cancelled) => {
                handle.mark_cancelled();
            }
            Err(Halt::Failed(message)) => {
                warn!(job_id = %handle.job().job_id, error = %message, "Job failed");
                handle.transition(JobStatus::Failed, |job| job.error = Some(message));
            }
        }
    }

    async fn drive(&self, handle: &JobHandle) -> Result<String, Halt> {
        let job = handle.job();
        let cancel = handle.cancel_token().clone();
        let ctx = ToolContext::new(job.working_directory.clone());

        let mut request = ChatCompletionRequest::new(
            job.model.clone(),
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(job.prompt.clone()),
            ],
        );
        let force_big = apply_force_directive(&mut request) || job.force_big;
        if !self.tools.is_empty() {
            request.tools = Some(self.tools.definitions());
        }
        let alias = ModelAlias::parse(&job.model, self.router.aliases());
        let mut tokens_used: u64 = 0;

        for turn in 1..=job.max_turns {
            if cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }

            let routing = RoutingRequest::new(alias.clone(), estimate_tokens(&request))
                .with_force_big(force_big);
            let lease = self.acquire(&routing, &cancel).await?;
            let backend_id = lease.backend_id().to_string();
            let agent = self.registry.get_agent(&backend_id).ok_or_else(|| {
                Halt::Failed(format!("no agent registered for backend '{}'", backend_id))
            })?;

            let mut turn_request = request.clone();
            turn_request.model = alias.upstream_model(lease.backend(), &job.model);

            debug!(job_id = %job.job_id, turn, backend_id = %backend_id, "Calling backend");
            let started = Instant::now();
            // A call already started runs to completion or timeout even if the
            // job is cancelled meanwhile.
            let outcome = tokio::time::timeout(self.request_timeout, agent.chat_completion(turn_request))
                .await
                .unwrap_or_else(|_| Err(AgentError::Timeout(self.request_timeout.as_millis() as u64)));
            lease.release();
            handle.update(|j| j.turns = turn);

            if cancel.is_cancelled() {
                debug!(job_id = %job.job_id, turn, "Cancelled during backend call, discarding reply");
                return Err(Halt::Cancelled);
            }

            let mut step = AgentRunStep::new(ActionType::Thinking);
            step.duration_ms = started.elapsed().as_millis() as u64;
            step.backend_id = Some(backend_id.clone());

            let response = match outcome {
                Ok(response) => response,
                Err(e) => {
                    step.error = Some(e.to_string());
                    handle.push_step(step);
                    if e.is_recoverable() {
                        warn!(job_id = %job.job_id, backend_id = %backend_id, error = %e, "Recoverable backend error");
                        continue;
                    }
                    return Err(Halt::Failed(format!("backend '{}': {}", backend_id, e)));
                }
            };

            if let Some(usage) = response.usage {
                tokens_used += u64::from(usage.total_tokens);
                handle.update(|j| j.tokens_used = Some(tokens_used));
                step.prompt_tokens = Some(usage.prompt_tokens);
                step.completion_tokens = Some(usage.completion_tokens);
            }

            let Some(message) = response.choices.into_iter().next().map(|c| c.message) else {
                step.error = Some("response contained no choices".to_string());
                handle.push_step(step);
                continue;
            };

            let text = message.text();
            if !text.is_empty() {
                step.thinking = Some(text.clone());
            }

            let calls = message.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                step.action_type = ActionType::FinalAnswer;
                handle.push_step(step);
                return Ok(text);
            }

            handle.push_step(step);
            request.messages.push(message);

            for call in calls {
                if cancel.is_cancelled() {
                    return Err(Halt::Cancelled);
                }

                let started = Instant::now();
                let result = self
                    .tools
                    .invoke(&call.function.name, &call.function.arguments, &ctx)
                    .await;

                let mut step = AgentRunStep::new(ActionType::ToolCall);
                step.tool_name = Some(call.function.name.clone());
                step.tool_args = Some(
                    serde_json::from_str(&call.function.arguments)
                        .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments.clone())),
                );
                step.duration_ms = started.elapsed().as_millis() as u64;

                let reply = match result {
                    Ok(output) => {
                        step.tool_result = Some(output.clone());
                        output
                    }
                    Err(e) => {
                        debug!(job_id = %job.job_id, tool = %call.function.name, error = %e, "Tool failed");
                        step.error = Some(e.to_string());
                        format!("Error: {}", e)
                    }
                };
                handle.push_step(step);
                request.messages.push(ChatMessage::tool(call.id, reply));
            }
        }

        Err(Halt::Failed(format!(
            "max_turns ({}) reached without a final answer",
            job.max_turns
        )))
    }

    /// Route, retrying capacity and admission failures until a slot frees up
    /// or the job is cancelled. Only an unknown model fails the job.
    async fn acquire(
        &self,
        request: &RoutingRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendLease, Halt> {
        let started = Instant::now();
        let mut next_warning = self.route_wait_warn;
        loop {
            match self.router.route(request) {
                Ok(lease) => return Ok(lease),
                Err(e) if e.is_retryable() => {
                    let waited = started.elapsed();
                    if !self.route_wait_warn.is_zero() && waited >= next_warning {
                        warn!(alias = %request.alias, waited_secs = waited.as_secs(), error = %e, "Still waiting for a backend");
                        next_warning += self.route_wait_warn;
                    } else {
                        debug!(error = %e, "No backend yet, retrying");
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(Halt::Cancelled),
                        _ = tokio::time::sleep(self.route_retry_delay) => {}
                    }
                }
                Err(e) => return Err(Halt::Failed(e.to_string())),
            }
        }
    }
}
