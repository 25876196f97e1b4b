//! Sentinel API client interface
//!
//! The lifecycle engine talks to the remote system only through
//! [`SentryApi`]. Authentication, retries and rate limiting belong to the
//! implementation, not the engine.
//!
//! # Module Structure
//!
//! - [`http`] - REST implementation over reqwest
//! - [`memory`] - Process-local store, used offline and in tests

pub mod http;
pub mod memory;

use crate::resource::{ResourceInstance, ResourceKind};
use async_trait::async_trait;
use thiserror::Error;

pub use http::{format_api_error, HttpSentryApi};
pub use memory::InMemorySentryApi;

/// Errors returned by a [`SentryApi`] implementation
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote has no record with this ID
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The remote answered with a non-success status
    #[error("API request failed: {status}")]
    Status { status: u16 },

    /// The request never got an answer
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with something we could not decode
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The remote refused the request for a reason of its own
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Status { status: 404 })
    }
}

/// Operations the lifecycle engine needs from the remote system
#[async_trait]
pub trait SentryApi: Send + Sync {
    /// Create the remote object. Returns the ID the remote stored it under.
    async fn create_remote(
        &self,
        kind: &ResourceKind,
        instance: &ResourceInstance,
    ) -> Result<String, ApiError>;

    /// Fetch the remote object, `None` if it no longer exists
    async fn fetch_remote(&self, id: &str) -> Result<Option<ResourceInstance>, ApiError>;

    async fn update_remote(&self, id: &str, instance: &ResourceInstance) -> Result<(), ApiError>;

    async fn delete_remote(&self, id: &str) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(ApiError::NotFound("x".to_string()).is_not_found());
        assert!(ApiError::Status { status: 404 }.is_not_found());
        assert!(!ApiError::Status { status: 500 }.is_not_found());
        assert!(!ApiError::Transport("reset".to_string()).is_not_found());
    }
}
