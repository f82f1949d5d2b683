//! # DomainError
//!
//! Centralized error handling for forum-board.
//! Every port and service returns `DomainResult`; adapters map their own
//! failures into one of these variants at the boundary.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., Theme, Post, Reply, Notification)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty title, oversized title, duplicate username)
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication failure (e.g., wrong password, no session)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is known but may not perform the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The request collides with current state (e.g., deleting the active theme)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound(resource.to_string(), id.to_string())
    }

    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(resource, _) => format!("{} does not exist", resource),
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Internal(_) => "internal server error".to_string(),
        }
    }
}

/// A specialized Result type for forum-board logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_details_are_not_shown_to_users() {
        let err = DomainError::Internal("database is locked".into());
        assert_eq!(err.user_message(), "internal server error");
        assert!(err.to_string().contains("database is locked"));
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = DomainError::not_found("Theme", 7);
        assert_eq!(err.to_string(), "Theme not found with ID 7");
        assert_eq!(err.user_message(), "Theme does not exist");
    }
}
