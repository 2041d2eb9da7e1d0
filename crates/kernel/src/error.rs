//! Kernel error types.

use thiserror::Error;

/// Failure to resolve a service from a container.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no service registered under '{identifier}'")]
    NotFound { identifier: String },
}

/// Errors raised while turning filter keys into conditions.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("attribute '{attribute}' does not support operator '{operator}'")]
    UnsupportedOperator { attribute: String, operator: String },

    #[error("field '{field}' cannot be used to build a condition")]
    UnbuildableField { field: String },

    #[error("invalid value {value} for '{field}' with operator '{operator}': {reason}")]
    ValidationFailed {
        field: String,
        operator: String,
        value: String,
        reason: String,
    },

    #[error("rule for '{attribute}' operator '{operator}' is invalid: {reason}")]
    InvalidRule {
        attribute: String,
        operator: String,
        reason: String,
    },

    #[error("operator symbol '{symbol}' has no SQL rendering")]
    UnsupportedSymbol { symbol: String },

    #[error("no condition builder registered as '{identifier}' for field kind '{kind}'")]
    UnknownBuilder { kind: String, identifier: String },

    #[error("invalid filter parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Errors raised by hydrator dispatch.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("no hydrator configured for class '{class}'")]
    NotConfigured { class: String },

    #[error("hydrator for '{expected}' received an entity of class '{actual}'")]
    EntityMismatch { expected: String, actual: String },

    #[error("collection nesting exceeds extraction depth")]
    DepthExceeded,

    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Result type alias for the condition pipeline.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type alias for hydrator dispatch.
pub type HydrationResult<T> = Result<T, HydrationError>;
