//! Infrastructure error types shared across the service.
//!
//! Domain errors (invalid key, hardware mismatch, not found) live with their
//! endpoints; this module only covers failures of the machinery underneath
//! them: configuration loading and store access.

use thiserror::Error;

/// Infrastructure failure. Surfaced to HTTP callers as a generic 5xx; the
/// service does not retry on its own.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Result alias used throughout the crate.
pub type ServiceResult<T> = Result<T, ServiceError>;
