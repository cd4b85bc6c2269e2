//! Crate-wide error type.
//!
//! Every fallible operation in the pipeline -- validation, repository
//! access, LLM/provider calls, routing -- funnels into `AppError` so the
//! pipeline coordinator can decide what's recoverable (fall back, retry,
//! degrade) and what should abort the ticket.

use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    /// An external system (database, LLM provider, embedding provider)
    /// failed or is unreachable. Distinct from `Internal` so callers can
    /// decide to retry or fall back to a rule-based path.
    #[error("dependency '{dependency}' failed: {source}")]
    DependencyFailure {
        dependency: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound { resource, id: id.to_string() }
    }

    pub fn not_found_uuid(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound { resource, id: id.to_string() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn dependency(dependency: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::DependencyFailure { dependency, source: source.into() }
    }

    /// True for failures where a degraded (rule-based, cached, or partial)
    /// result is preferable to aborting the ticket.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DependencyFailure { .. })
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::dependency("postgres", err)
    }
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::dependency("postgres_pool", err)
    }
}
