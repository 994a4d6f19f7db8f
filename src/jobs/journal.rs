//! Append-only JSON-lines journal of job and step events.
//!
//! One line per event, `{"event": "...", "at": ..., ...}`. Write failures are
//! logged and otherwise ignored; the in-memory queue stays authoritative.

use super::types::{AgentRunStep, Job, JobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One journal line.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEntry<'a> {
    JobCreated {
        at: DateTime<Utc>,
        job: &'a Job,
    },
    JobStatus {
        at: DateTime<Utc>,
        job_id: &'a str,
        status: JobStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    },
    Step {
        at: DateTime<Utc>,
        job_id: &'a str,
        step: &'a AgentRunStep,
    },
}

/// Sink for job events.
pub trait JobJournal: Send + Sync {
    fn record(&self, entry: &JournalEntry<'_>);
}

/// Appends entries to a file, one JSON object per line.
pub struct JsonlJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlJournal {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JobJournal for JsonlJournal {
    fn record(&self, entry: &JournalEntry<'_>) {
        let mut line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode journal entry");
                return;
            }
        };
        line.push('\n');

        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write job journal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::ActionType;

    fn job() -> Job {
        Job {
            job_id: "job-1".into(),
            agent_id: "agent-a".into(),
            prompt: "hi".into(),
            model: "auto".into(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            turns: 0,
            tokens_used: None,
            result: None,
            error: None,
            working_directory: None,
            max_turns: 5,
            force_big: false,
            cancel_requested: false,
        }
    }

    #[test]
    fn test_appends_one_line_per_entry() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/jobs.jsonl");
        let journal = JsonlJournal::open(&path).unwrap();

        let job = job();
        let mut step = AgentRunStep::new(ActionType::FinalAnswer);
        step.step_number = 1;

        journal.record(&JournalEntry::JobCreated {
            at: Utc::now(),
            job: &job,
        });
        journal.record(&JournalEntry::Step {
            at: Utc::now(),
            job_id: &job.job_id,
            step: &step,
        });
        journal.record(&JournalEntry::JobStatus {
            at: Utc::now(),
            job_id: &job.job_id,
            status: JobStatus::Completed,
            error: None,
        });

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "job_created");
        assert_eq!(lines[0]["job"]["job_id"], "job-1");
        assert_eq!(lines[1]["event"], "step");
        assert_eq!(lines[1]["step"]["action_type"], "final_answer");
        assert_eq!(lines[2]["status"], "completed");
        assert!(lines[2].get("error").is_none());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("jobs.jsonl");
        let job = job();
        for _ in 0..2 {
            let journal = JsonlJournal::open(&path).unwrap();
            journal.record(&JournalEntry::JobCreated {
                at: Utc::now(),
                job: &job,
            });
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
