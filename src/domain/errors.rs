//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use sea_orm::{DbErr, SqlErr};

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Caller is not authenticated
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Caller lacks the role or ownership for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Referenced resource does not exist
    #[error("{0} not found")]
    NotFound(String),
    /// Operation not valid for the current status
    #[error("{0}")]
    InvalidState(String),
    /// Availability or uniqueness precondition violated
    #[error("{0}")]
    Conflict(String),
    /// Malformed or incomplete input
    #[error("Validation error: {0}")]
    Validation(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    /// Stable machine-readable tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::NotFound(_) => "not_found",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::Conflict(_) => "conflict",
            DomainError::Validation(_) => "validation",
            DomainError::Database(_) => "database",
            DomainError::Internal(_) => "internal",
        }
    }

    /// Map a failed write, turning unique index violations into conflicts.
    pub fn from_write(e: DbErr, conflict_message: &str) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                DomainError::Conflict(conflict_message.to_string())
            }
            _ => DomainError::Database(e.to_string()),
        }
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}
