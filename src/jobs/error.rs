/// Errors from the job queue API
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    #[error("Job queue is shut down")]
    ShutDown,
}
