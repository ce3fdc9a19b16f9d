//! Error taxonomy shared by every engine component.
//!
//! All errors are typed result values; none are used for ordinary control
//! flow. The HTTP boundary maps them 1:1 onto status codes
//! (400/404/403/409/410), with `Storage` the only 500-class variant.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed or out-of-range input. Always recoverable by the caller.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The actor lacks the role or ownership the operation requires.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A state-transition precondition no longer holds. Covers double-accept
    /// races and already-converted quotes; never retried automatically.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A time-based terminal condition (quote past its validity window).
    #[error("expired: {0}")]
    Expired(String),

    /// Infrastructure fault (database, cache). Not part of the business
    /// taxonomy; surfaces as an internal error at the boundary.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        EngineError::AccessDenied(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        EngineError::Conflict(msg.into())
    }

    pub fn expired(msg: impl Into<String>) -> Self {
        EngineError::Expired(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        EngineError::Storage(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
