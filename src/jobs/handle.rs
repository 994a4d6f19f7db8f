//! Shared state of one job.

use super::journal::{JobJournal, JournalEntry};
use super::types::{AgentRunStep, Job, JobDetail, JobStatus};
use chrono::Utc;
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A job record, its step log, and its cancellation token.
///
/// Status changes go through [`JobHandle::transition`], which enforces the
/// job state machine. Steps are only appended while the job is not terminal,
/// so a cancelled job never grows new steps.
pub struct JobHandle {
    job: RwLock<Job>,
    steps: RwLock<Vec<AgentRunStep>>,
    cancel: CancellationToken,
    cancel_reason: Mutex<Option<String>>,
    journal: Option<Arc<dyn JobJournal>>,
}

impl JobHandle {
    pub fn new(job: Job, journal: Option<Arc<dyn JobJournal>>) -> Self {
        if let Some(journal) = &journal {
            journal.record(&JournalEntry::JobCreated {
                at: Utc::now(),
                job: &job,
            });
        }
        Self {
            job: RwLock::new(job),
            steps: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
            cancel_reason: Mutex::new(None),
            journal,
        }
    }

    pub fn job(&self) -> Job {
        self.job.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn status(&self) -> JobStatus {
        self.job.read().unwrap_or_else(|p| p.into_inner()).status
    }

    pub fn steps(&self) -> Vec<AgentRunStep> {
        self.steps.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Consistent snapshot of the job and its steps.
    pub fn detail(&self) -> JobDetail {
        let job = self.job.read().unwrap_or_else(|p| p.into_inner());
        let steps = self.steps.read().unwrap_or_else(|p| p.into_inner());
        JobDetail {
            job: job.clone(),
            steps: steps.clone(),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ask the job to stop.
    ///
    /// A pending job becomes `cancelled` at once. A running job keeps its
    /// status and only has its token cancelled; the executor finishes the
    /// backend call in progress and moves the job to `cancelled` at its next
    /// checkpoint. Terminal jobs are left alone. The first reason given wins.
    pub fn request_cancel(&self, reason: Option<&str>) {
        if self.status().is_terminal() {
            return;
        }
        {
            let mut slot = self.cancel_reason.lock().unwrap_or_else(|p| p.into_inner());
            if slot.is_none() {
                *slot = reason.map(str::to_string);
            }
        }
        self.cancel.cancel();

        let reason = self.cancel_reason();
        let cancelled_now = self.transition_if(JobStatus::Pending, JobStatus::Cancelled, |job| {
            job.error = reason;
        });
        if !cancelled_now {
            self.update(|job| {
                if !job.status.is_terminal() {
                    job.cancel_requested = true;
                }
            });
        }
    }

    /// Move a running job to `cancelled` after its token fired.
    pub fn mark_cancelled(&self) -> bool {
        let reason = self.cancel_reason();
        self.transition(JobStatus::Cancelled, |job| job.error = reason)
    }

    fn cancel_reason(&self) -> Option<String> {
        self.cancel_reason
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Move to `to`, then apply `update` under the same lock.
    ///
    /// Returns false and changes nothing if the state machine forbids the move.
    pub fn transition(&self, to: JobStatus, update: impl FnOnce(&mut Job)) -> bool {
        self.transition_where(|_| true, to, update)
    }

    /// Like [`transition`](Self::transition), but only from `from`.
    pub fn transition_if(
        &self,
        from: JobStatus,
        to: JobStatus,
        update: impl FnOnce(&mut Job),
    ) -> bool {
        self.transition_where(|status| status == from, to, update)
    }

    fn transition_where(
        &self,
        allow: impl FnOnce(JobStatus) -> bool,
        to: JobStatus,
        update: impl FnOnce(&mut Job),
    ) -> bool {
        let mut job = self.job.write().unwrap_or_else(|p| p.into_inner());
        if !allow(job.status) || !job.status.can_transition_to(to) {
            return false;
        }

        let from = job.status;
        let now = Utc::now();
        job.status = to;
        if to == JobStatus::Running {
            job.started_at = Some(now);
        }
        if to.is_terminal() {
            job.completed_at = Some(now);
        }
        update(&mut job);

        info!(
            job_id = %job.job_id,
            agent_id = %job.agent_id,
            from = %from,
            to = %to,
            turns = job.turns,
            "Job status changed"
        );
        metrics::counter!("switchyard_jobs_total", "status" => to.as_str()).increment(1);
        if let Some(journal) = &self.journal {
            journal.record(&JournalEntry::JobStatus {
                at: now,
                job_id: &job.job_id,
                status: to,
                error: job.error.as_deref(),
            });
        }
        true
    }

    /// Update counters (turns, tokens) without changing status.
    pub fn update(&self, update: impl FnOnce(&mut Job)) {
        let mut job = self.job.write().unwrap_or_else(|p| p.into_inner());
        update(&mut job);
    }

    /// Append a step, numbering it after the last one.
    ///
    /// Returns the assigned number, or `None` when the job is already terminal.
    pub fn push_step(&self, mut step: AgentRunStep) -> Option<u32> {
        let job = self.job.read().unwrap_or_else(|p| p.into_inner());
        if job.status.is_terminal() {
            return None;
        }

        let mut steps = self.steps.write().unwrap_or_else(|p| p.into_inner());
        let number = steps.len() as u32 + 1;
        step.step_number = number;

        tracing::debug!(
            job_id = %job.job_id,
            step = number,
            action = step.action_type.as_str(),
            error = step.error.as_deref(),
            "Step recorded"
        );
        metrics::counter!("switchyard_job_steps_total", "action" => step.action_type.as_str())
            .increment(1);
        if let Some(journal) = &self.journal {
            journal.record(&JournalEntry::Step {
                at: Utc::now(),
                job_id: &job.job_id,
                step: &step,
            });
        }

        steps.push(step);
        Some(number)
    }
}
