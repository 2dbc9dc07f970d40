//! Service error model.

use thiserror::Error;

/// Result type used across the service layers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse outcome kind handed to the routing layer.
///
/// This is the only part of an error that crosses the service boundary; the
/// detail carried by [`ServiceError`] stays server-side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    NotImplemented,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::Internal => "internal",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-level error.
///
/// `Unauthorized` deliberately carries no detail: a bad password and an
/// unknown identifier must produce the same value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A required field was missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Bad credentials, or a missing/invalid/expired token.
    #[error("unauthorized")]
    Unauthorized,

    /// The permission check rejected an otherwise valid token.
    #[error("forbidden")]
    Forbidden,

    /// No row matches the requested identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated on create.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation is declared but intentionally not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Storage, transport or crypto primitive failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_implemented(what: impl Into<String>) -> Self {
        Self::NotImplemented(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Unauthorized => ErrorKind::Unauthorized,
            ServiceError::Forbidden => ErrorKind::Forbidden,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::NotImplemented(_) => ErrorKind::NotImplemented,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Terse, user-safe message for this error.
    ///
    /// Internal detail is replaced by a fixed string; everything else is
    /// already phrased for the caller.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(msg) => msg.clone(),
            ServiceError::Unauthorized => "invalid credentials".to_string(),
            ServiceError::Forbidden => "lacking permissions".to_string(),
            ServiceError::NotFound(what) => format!("{what} not found"),
            ServiceError::Conflict(msg) => msg.clone(),
            ServiceError::NotImplemented(what) => format!("{what} is not implemented"),
            ServiceError::Internal(_) => "internal error".to_string(),
        }
    }
}
