//! Errors raised by pantry payloads and identifiers.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Why a payload or identifier was refused.
///
/// Only deterministic, input-driven failures live here; storage and network
/// problems are `pantry-sync` errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field is out of range or missing (empty name, negative quantity, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
