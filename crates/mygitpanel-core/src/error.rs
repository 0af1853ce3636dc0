//! The error taxonomy from spec §7, shared across every crate in the
//! workspace so the HTTP layer can map it to a status code without
//! re-deriving the distinctions lower layers already made.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Required setting missing or malformed; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Writes and new polls no-op; the API returns a structured status.
    #[error("credentials not configured")]
    CredentialsNotConfigured,

    /// Network failure, 5xx, timeout — logged and retried on the next tick.
    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    /// A 422 on review submission.
    #[error("PR was updated since you started reviewing; refresh and try again.")]
    UpstreamConflict,

    /// 404 from the upstream on a read that does not have a benign fallback.
    #[error("upstream resource not found: {0}")]
    UpstreamNotFound(String),

    /// Surfaced as 500 from the API; always logged with scope.
    #[error("store error: {0}")]
    Store(String),

    /// Bad request body, malformed repo name, non-integer PR number.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate repository add.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        CoreError::Store(err.to_string())
    }

    pub fn upstream_transient(err: impl std::fmt::Display) -> Self {
        CoreError::UpstreamTransient(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
