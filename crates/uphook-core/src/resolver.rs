//! Directive resolution
//!
//! A hook response is a bag of independently settable directives. This
//! module turns one response, together with the hook type that produced it,
//! into a single [`Outcome`] the upload engine can act on.
//!
//! Precedence, highest first:
//! 1. `RejectUpload` rejects, whatever else is set.
//! 2. `StopUpload` stops the upload after the current request; only valid
//!    for post-receive.
//! 3. `ChangeFileInfo` mutates the upload; only valid for pre-create.
//! 4. Otherwise the upload proceeds.
//!
//! A directive used on the wrong hook type is a [`ProtocolViolation`]. Any
//! violation downgrades the outcome to `Proceed` unless the upload was also
//! rejected.

use serde::Serialize;

use crate::error::ProtocolViolation;
use crate::models::{FileInfoChanges, HookResponse, HookType, HttpResponse};

/// Status used for reject and stop outcomes when the handler sets none
pub const DEFAULT_REJECT_STATUS: u16 = 400;

/// Net effect of a hook response on the upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "details", rename_all = "snake_case")]
pub enum Outcome {
    Proceed,
    ProceedWithChanges(FileInfoChanges),
    /// Refuse the operation. Carries the handler's HTTP override, with the
    /// status code defaulted.
    Reject(HttpResponse),
    /// Let the current request finish, then terminate the upload
    StopAfterCompletion(HttpResponse),
}

impl Outcome {
    /// Whether the upload operation must not go ahead as requested
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Reject(_) | Outcome::StopAfterCompletion(_))
    }

    /// Response to send to the uploading client for reject and stop
    /// outcomes: the server's default error merged with the handler override.
    pub fn client_response(&self) -> Option<HttpResponse> {
        match self {
            Outcome::Reject(custom) => Some(upload_rejected_response().merge_with(custom)),
            Outcome::StopAfterCompletion(custom) => {
                Some(upload_stopped_response().merge_with(custom))
            }
            Outcome::Proceed | Outcome::ProceedWithChanges(_) => None,
        }
    }
}

/// Result of resolving one hook response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub hook_type: HookType,
    pub outcome: Outcome,
    /// HTTP override passed to the client alongside a non-terminal outcome.
    /// Only set for hook types that allow it (pre-finish, post-finish).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub informational_response: Option<HttpResponse>,
    #[serde(serialize_with = "serialize_violations")]
    pub violations: Vec<ProtocolViolation>,
}

impl Resolution {
    /// Resolution for a hook that was not dispatched at all
    pub fn proceed(hook_type: HookType) -> Self {
        Self {
            hook_type,
            outcome: Outcome::Proceed,
            informational_response: None,
            violations: Vec::new(),
        }
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Final response for the uploading client, given the response the
    /// server would send by default for a successful operation.
    pub fn response_for_client(&self, default: &HttpResponse) -> HttpResponse {
        if let Some(response) = self.outcome.client_response() {
            return response;
        }
        match &self.informational_response {
            Some(custom) => default.merge_with(custom),
            None => default.clone(),
        }
    }
}

fn serialize_violations<S: serde::Serializer>(
    violations: &[ProtocolViolation],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(violations.iter().map(ToString::to_string))
}

fn error_response(code: &str, message: &str) -> HttpResponse {
    HttpResponse::new(DEFAULT_REJECT_STATUS)
        .with_body(format!("{}: {}\n", code, message))
        .with_header("Content-Type", "text/plain; charset=utf-8")
        // Close the connection in case the request body is still incoming
        .with_header("Connection", "close")
}

pub fn upload_rejected_response() -> HttpResponse {
    error_response(
        "ERR_UPLOAD_REJECTED",
        "upload creation has been rejected by server",
    )
}

pub fn upload_stopped_response() -> HttpResponse {
    error_response("ERR_UPLOAD_STOPPED", "upload has been stopped by server")
}

/// Resolve a validated hook response into an outcome.
pub fn resolve(hook_type: HookType, response: &HookResponse) -> Resolution {
    let mut violations = Vec::new();

    if response.stop_upload && hook_type != HookType::PostReceive {
        violations.push(ProtocolViolation::StopUploadNotAllowed(hook_type));
    }

    let has_changes = !response.change_file_info.is_empty();
    if has_changes && hook_type != HookType::PreCreate {
        violations.push(ProtocolViolation::ChangeFileInfoNotAllowed(hook_type));
    }

    let outcome = if response.reject_upload {
        Outcome::Reject(
            response
                .http_response
                .clone()
                .with_default_status(DEFAULT_REJECT_STATUS),
        )
    } else if !violations.is_empty() {
        Outcome::Proceed
    } else if response.stop_upload {
        Outcome::StopAfterCompletion(
            response
                .http_response
                .clone()
                .with_default_status(DEFAULT_REJECT_STATUS),
        )
    } else if has_changes {
        Outcome::ProceedWithChanges(response.change_file_info.clone())
    } else {
        Outcome::Proceed
    };

    let informational_response = (!outcome.is_terminal()
        && hook_type.allows_informational_response()
        && !response.http_response.is_empty())
    .then(|| response.http_response.clone());

    Resolution {
        hook_type,
        outcome,
        informational_response,
        violations,
    }
}
