//! Error types module
//!
//! This module provides the error types of the hook protocol core.
//! `ValidationError` covers malformed canonical models, `ProtocolViolation`
//! covers response directives that do not fit the hook type that produced
//! them, and `HookError` unifies validation with the transport failures the
//! dispatch client reports back to the upload engine.

use std::time::Duration;

use crate::models::HookType;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like an unresponsive handler
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// to the uploading client when a hook failure aborts an upload operation.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "HOOK_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether the event source may retry the lifecycle point
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the uploading client
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// A canonical model could not be constructed from raw values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown hook type: {0}")]
    UnknownHookType(String),

    #[error("Access event is required for pre-access hooks")]
    MissingAccess,

    #[error("Access event is only allowed for pre-access hooks, got {0}")]
    UnexpectedAccess(HookType),

    #[error("Invalid access mode: {0}")]
    InvalidAccessMode(String),

    #[error("Invalid HTTP status code: {0}")]
    InvalidStatusCode(i64),

    #[error("Invalid upload size: {0}")]
    InvalidSize(i64),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// A response directive that is inconsistent with the hook type.
///
/// Violations are reported to the event source as handler misconfiguration;
/// the upload itself proceeds unless the response also rejected it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("StopUpload is only valid for post-receive hooks, got {0}")]
    StopUploadNotAllowed(HookType),

    #[error("ChangeFileInfo is only valid for pre-create hooks, got {0}")]
    ChangeFileInfoNotAllowed(HookType),
}

impl ProtocolViolation {
    pub fn hook_type(&self) -> HookType {
        match self {
            ProtocolViolation::StopUploadNotAllowed(t) => *t,
            ProtocolViolation::ChangeFileInfoNotAllowed(t) => *t,
        }
    }
}

/// Failure of a single hook invocation.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Invalid hook payload: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to encode hook request: {0}")]
    Encode(String),

    /// Connection refused or connect timeout before any exchange
    #[error("Hook handler unreachable: {0}")]
    Unreachable(String),

    /// The deadline passed while the call was in flight
    #[error("Hook handler did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Malformed hook response: {0}")]
    MalformedResponse(String),

    /// The handler signaled an application-level failure
    #[error("Hook handler failed: {0}")]
    HandlerError(String),

    #[error("Hook invocation was cancelled")]
    Cancelled,
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn hook_error_static_metadata(err: &HookError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        HookError::Validation(_) => (500, "HOOK_VALIDATION_ERROR", false, LogLevel::Error),
        HookError::Encode(_) => (500, "HOOK_ENCODE_ERROR", false, LogLevel::Error),
        HookError::Unreachable(_) => (502, "HOOK_UNREACHABLE", true, LogLevel::Warn),
        HookError::Timeout(_) => (504, "HOOK_TIMEOUT", true, LogLevel::Warn),
        HookError::MalformedResponse(_) => {
            (502, "HOOK_MALFORMED_RESPONSE", false, LogLevel::Error)
        }
        HookError::HandlerError(_) => (500, "HOOK_HANDLER_ERROR", true, LogLevel::Error),
        HookError::Cancelled => (503, "HOOK_CANCELLED", true, LogLevel::Debug),
    }
}

impl HookError {
    /// Get the error type name for structured logs
    pub fn error_type(&self) -> &'static str {
        match self {
            HookError::Validation(_) => "Validation",
            HookError::Encode(_) => "Encode",
            HookError::Unreachable(_) => "Unreachable",
            HookError::Timeout(_) => "Timeout",
            HookError::MalformedResponse(_) => "MalformedResponse",
            HookError::HandlerError(_) => "HandlerError",
            HookError::Cancelled => "Cancelled",
        }
    }
}

impl ErrorMetadata for HookError {
    fn http_status_code(&self) -> u16 {
        hook_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        hook_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        hook_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        hook_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        !matches!(self, HookError::Timeout(_) | HookError::Cancelled)
    }

    fn client_message(&self) -> String {
        match self {
            HookError::Timeout(_) => "upload hook did not respond in time".to_string(),
            HookError::Cancelled => "upload hook was cancelled".to_string(),
            _ => "upload hook failed".to_string(),
        }
    }
}
