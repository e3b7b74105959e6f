//! Error taxonomy for the realtime core.
//!
//! Failures are only ever reported to the originating session, never
//! broadcast to a room. Per-session delivery failures are not errors at all:
//! they are swallowed and the session is reaped by the disconnect path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use parley_store::StoreError;

/// Result type alias for core operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("not authenticated: {reason}")]
    Unauthenticated { reason: String },

    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("not authorized: {reason}")]
    Unauthorized { reason: String },

    #[error("persistence failed: {0}")]
    Persistence(StoreError),
}

impl RealtimeError {
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Machine-readable kind clients can branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RealtimeError::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            RealtimeError::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            RealtimeError::NotFound { .. } => ErrorKind::NotFound,
            RealtimeError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RealtimeError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl From<StoreError> for RealtimeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MessageNotFound { id } => Self::NotFound {
                what: format!("message {id}"),
            },
            other => Self::Persistence(other),
        }
    }
}

/// Tagged error kind carried on the `error` wire event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    InvalidPayload,
    NotFound,
    Unauthorized,
    Persistence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found_kind() {
        let err: RealtimeError = StoreError::message_not_found("m1").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidPayload).unwrap();
        assert_eq!(json, "\"invalid_payload\"");
    }
}
