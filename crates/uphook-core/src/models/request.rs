use crate::error::ValidationError;
use crate::models::{AccessEvent, HookType, HttpRequest, Upload};

/// The upload and client request involved in a hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookEvent {
    pub upload: Upload,
    pub http_request: HttpRequest,
    /// Only set for pre-access hooks
    pub access: Option<AccessEvent>,
}

impl HookEvent {
    pub fn new(upload: Upload, http_request: HttpRequest) -> Self {
        Self {
            upload,
            http_request,
            access: None,
        }
    }

    pub fn with_access(mut self, access: AccessEvent) -> Self {
        self.access = Some(access);
        self
    }
}

/// One hook notification sent to the handler.
///
/// Fields are private so that every instance went through [`HookRequest::new`]
/// and holds the access invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRequest {
    hook_type: HookType,
    event: HookEvent,
}

impl HookRequest {
    /// Build a request, checking that `access` is present exactly for
    /// pre-access hooks.
    pub fn new(hook_type: HookType, event: HookEvent) -> Result<Self, ValidationError> {
        match (hook_type, &event.access) {
            (HookType::PreAccess, None) => return Err(ValidationError::MissingAccess),
            (HookType::PreAccess, Some(_)) => {}
            (other, Some(_)) => return Err(ValidationError::UnexpectedAccess(other)),
            (_, None) => {}
        }

        event.upload.validate()?;
        if let Some(access) = &event.access {
            for upload in &access.uploads {
                upload.validate()?;
            }
        }

        Ok(Self { hook_type, event })
    }

    /// Build a request from the raw type string found on the wire
    pub fn from_raw(hook_type: &str, event: HookEvent) -> Result<Self, ValidationError> {
        Self::new(hook_type.parse()?, event)
    }

    pub fn hook_type(&self) -> HookType {
        self.hook_type
    }

    pub fn event(&self) -> &HookEvent {
        &self.event
    }

    pub fn upload(&self) -> &Upload {
        &self.event.upload
    }

    pub fn into_event(self) -> HookEvent {
        self.event
    }
}
