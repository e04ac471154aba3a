//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them onto HTTP
//! status codes and JSON envelopes; the domain only ever deals in stable
//! [`ErrorCode`]s and human-readable messages.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

use super::trace_id::TraceId;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed, fails validation, or names an escaping path.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist (or is deliberately hidden).
    NotFound,
    /// The operation collides with existing state.
    Conflict,
    /// The request body exceeds the configured upload ceiling.
    PayloadTooLarge,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Error envelope shared by every adapter.
///
/// ## Invariants
/// - `message` is non-empty; constructors take non-empty literals or formatted
///   strings, never caller-controlled empties.
/// - `trace_id` is captured from the ambient [`TraceId`] at construction time
///   so responses correlate with log lines without threading state around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create a new error, capturing any ambient trace identifier.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace_id: TraceId::current().map(|id| id.to_string()),
            details: None,
        }
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::PayloadTooLarge`].
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Attach structured details to the error.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the trace identifier (used when redacting internals).
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Trace identifier propagated into the response header, if any.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Supplementary error details for clients.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

/// Typed failures raised by the storage core.
///
/// Keeps filesystem-facing code precise about what went wrong so tests can
/// assert on exact kinds; the [`From`] impl below collapses them into the
/// transport envelope at the adapter seam.
#[derive(Debug, ThisError)]
pub enum StorageError {
    /// The resolved path would leave the storage root. Always a caller bug or
    /// an attack, never retried.
    #[error("path escapes the storage root")]
    Escape,
    /// The path names nothing on disk.
    #[error("no such file or directory")]
    NotFound,
    /// Refusing to delete a non-empty directory.
    #[error("directory is not empty")]
    NotEmpty,
    /// The destination already exists and overwriting was not intended.
    #[error("destination already exists")]
    Conflict,
    /// Directory moves across filesystems have no atomic primitive and are
    /// refused rather than half-applied.
    #[error("cannot move a directory across filesystems")]
    CrossDevice,
    /// Underlying filesystem failure (disk full, permissions, device error).
    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),
}

impl From<StorageError> for Error {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Escape => Self::invalid_request("invalid path"),
            StorageError::NotFound => Self::not_found("no such file or directory"),
            StorageError::NotEmpty => Self::conflict("directory is not empty"),
            StorageError::Conflict => Self::conflict("destination already exists"),
            StorageError::CrossDevice => {
                Self::conflict("cannot move a directory across filesystems")
            }
            StorageError::Io(error) => Self::internal(format!("storage i/o failed: {error}")),
        }
    }
}
