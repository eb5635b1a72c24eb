//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::PostKind;

/// Domain errors - business rule failures surfaced to the user.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("You are not registered as an author")]
    NotAnAuthor,

    #[error("You cannot publish more than {limit} posts per day")]
    PostingLimitExceeded {
        kind: PostKind,
        limit: u32,
        retry_after: Duration,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepoError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}
