//! Agent job queue.
//!
//! Jobs are submitted as `pending`, started by a dispatcher task in
//! submission order (at most `max_concurrent_jobs` at a time) and driven to a
//! terminal status by the [`JobExecutor`]. Jobs are kept in memory for the
//! life of the process and can be read at any point, steps included.

pub mod error;
pub mod executor;
pub mod handle;
pub mod journal;
pub mod tools;
pub mod types;


pub use error::JobError;
pub use executor::JobExecutor;
pub use handle::JobHandle;
pub use journal::{JobJournal, JsonlJournal};
pub use tools::{Tool, ToolContext, ToolError, ToolRegistry};
pub use types::{
    ActionType, AgentRunStep, CreateJobRequest, Job, JobDetail, JobFilter, JobStatus,
};

use crate::config::JobsConfig;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// In-memory job store plus the dispatcher that feeds the executor.
pub struct JobQueue {
    jobs: DashMap<String, Arc<JobHandle>>,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    executor: Arc<JobExecutor>,
    config: JobsConfig,
    journal: Option<Arc<dyn JobJournal>>,
}

impl JobQueue {
    pub fn new(executor: JobExecutor, config: JobsConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            jobs: DashMap::new(),
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            executor: Arc::new(executor),
            config,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn JobJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Validate and enqueue a job. Returns it in `pending` state.
    pub fn submit(&self, request: CreateJobRequest) -> Result<Job, JobError> {
        if request.agent_id.trim().is_empty() {
            return Err(JobError::InvalidRequest("agent_id is required".into()));
        }
        if request.prompt.trim().is_empty() {
            return Err(JobError::InvalidRequest("prompt is required".into()));
        }
        if request.model.trim().is_empty() {
            return Err(JobError::InvalidRequest("model is required".into()));
        }
        let max_turns = request.max_turns.unwrap_or(self.config.default_max_turns);
        if max_turns == 0 {
            return Err(JobError::InvalidRequest("max_turns must be at least 1".into()));
        }
        let working_directory = request
            .working_directory
            .or_else(|| self.config.default_working_directory.clone());
        if let Some(dir) = &working_directory {
            if !dir.is_dir() {
                return Err(JobError::InvalidRequest(format!(
                    "working_directory '{}' is not a directory",
                    dir.display()
                )));
            }
        }

        let job = Job {
            job_id: uuid::Uuid::new_v4().to_string(),
            agent_id: request.agent_id,
            prompt: request.prompt,
            model: request.model,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            turns: 0,
            tokens_used: None,
            result: None,
            error: None,
            working_directory,
            max_turns,
            force_big: request.force_big,
            cancel_requested: false,
        };

        let job_id = job.job_id.clone();
        let handle = Arc::new(JobHandle::new(job.clone(), self.journal.clone()));
        self.jobs.insert(job_id.clone(), handle);

        if self.queue_tx.send(job_id.clone()).is_err() {
            self.jobs.remove(&job_id);
            return Err(JobError::ShutDown);
        }

        info!(job_id = %job.job_id, agent_id = %job.agent_id, model = %job.model, "Job submitted");
        metrics::counter!("switchyard_jobs_total", "status" => JobStatus::Pending.as_str())
            .increment(1);
        Ok(job)
    }

    fn handle(&self, job_id: &str) -> Result<Arc<JobHandle>, JobError> {
        self.jobs
            .get(job_id)
            .map(|h| Arc::clone(h.value()))
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Job record without steps.
    pub fn job(&self, job_id: &str) -> Result<Job, JobError> {
        Ok(self.handle(job_id)?.job())
    }

    /// Job plus its ordered steps.
    pub fn get(&self, job_id: &str) -> Result<JobDetail, JobError> {
        Ok(self.handle(job_id)?.detail())
    }

    /// Jobs matching `filter`, oldest first.
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .map(|entry| entry.value().job())
            .filter(|job| filter.matches(job))
            .collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Cancel a job.
    ///
    /// A pending job becomes `cancelled` immediately. A running job is
    /// flagged with `cancel_requested`; its backend call in progress is
    /// allowed to return (or time out) and the executor then marks it
    /// `cancelled` without starting another step. Cancelling a terminal job
    /// changes nothing and succeeds.
    pub fn cancel(&self, job_id: &str) -> Result<Job, JobError> {
        let handle = self.handle(job_id)?;
        handle.request_cancel(None);
        Ok(handle.job())
    }

    /// Spawn the dispatcher. It stops on `shutdown`, cancelling every job
    /// that has not finished, and resolves once running executors have
    /// reached their next checkpoint.
    pub fn start(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        let receiver = self
            .queue_rx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();

        tokio::spawn(async move {
            let Some(mut receiver) = receiver else {
                warn!("Job dispatcher already started");
                return;
            };
            let permits = Arc::new(Semaphore::new(queue.config.max_concurrent_jobs.max(1)));
            let running = TaskTracker::new();
            info!(
                max_concurrent_jobs = queue.config.max_concurrent_jobs,
                "Job dispatcher started"
            );

            loop {
                let job_id = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    next = receiver.recv() => match next {
                        Some(job_id) => job_id,
                        None => break,
                    },
                };

                let permit = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = Arc::clone(&permits).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let Ok(handle) = queue.handle(&job_id) else {
                    continue;
                };
                if handle.status() != JobStatus::Pending {
                    continue;
                }

                let executor = Arc::clone(&queue.executor);
                running.spawn(async move {
                    executor.run(handle).await;
                    drop(permit);
                });
            }

            receiver.close();
            for entry in queue.jobs.iter() {
                entry.value().request_cancel(Some("server shutting down"));
            }
            running.close();
            running.wait().await;
            info!("Job dispatcher stopped");
        })
    }
}
