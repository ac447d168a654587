use std::collections::HashMap;

use serde::Serialize;

use crate::error::ValidationError;
use crate::models::MetaData;

/// Override for the HTTP response sent to the uploading client.
///
/// A missing status code or an empty body leaves the default response's
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// True when applying this override would change nothing
    pub fn is_empty(&self) -> bool {
        self.status_code.is_none()
            && self.body.as_deref().map_or(true, str::is_empty)
            && self.headers.is_empty()
    }

    /// Returns a copy of `self` where set values from `other` win. Headers
    /// from both sides are kept, `other`'s on conflict.
    pub fn merge_with(&self, other: &HttpResponse) -> HttpResponse {
        let mut merged = self.clone();

        if other.status_code.is_some() {
            merged.status_code = other.status_code;
        }
        if let Some(body) = other.body.as_deref().filter(|b| !b.is_empty()) {
            merged.body = Some(body.to_string());
        }
        merged
            .headers
            .extend(other.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        merged
    }

    pub(crate) fn with_default_status(mut self, status_code: u16) -> Self {
        self.status_code.get_or_insert(status_code);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.status_code {
            Some(code) if !(100..=599).contains(&code) => {
                Err(ValidationError::InvalidStatusCode(i64::from(code)))
            }
            _ => Ok(()),
        }
    }
}

/// Changes a pre-create handler wants applied to the upload before it is
/// created. Unset fields leave the upload untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileInfoChanges {
    /// Replacement upload id; empty means keep the engine's id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Replaces the whole metadata mapping, it is not merged. `Some` of an
    /// empty map clears the metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
    /// Replaces the storage details the data store will use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<HashMap<String, String>>,
}

impl FileInfoChanges {
    /// True when applying these changes would leave an upload untouched
    pub fn is_empty(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
            && self.meta_data.is_none()
            && self.storage.is_none()
    }
}

/// The handler's verdict for one hook request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookResponse {
    pub http_response: HttpResponse,
    pub reject_upload: bool,
    pub stop_upload: bool,
    pub change_file_info: FileInfoChanges,
}

impl HookResponse {
    /// A response that lets the upload proceed unchanged
    pub fn proceed() -> Self {
        Self::default()
    }

    pub fn reject(http_response: HttpResponse) -> Self {
        Self {
            http_response,
            reject_upload: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.http_response.validate()
    }
}
