use thiserror::Error;

/// Errors raised by administrative admission changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("unknown backend in restricted set: {0}")]
    UnknownBackend(String),

    #[error("restricted mode requires at least one backend")]
    EmptyRestrictedSet,
}
