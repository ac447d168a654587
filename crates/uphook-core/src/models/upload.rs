use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::models::FileInfoChanges;

/// User-supplied key/value metadata of an upload
pub type MetaData = HashMap<String, String>;

/// State of one resumable upload at the moment a hook fires
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upload {
    pub id: String,
    /// Total length; `None` while the client defers the length
    pub size: Option<i64>,
    pub offset: i64,
    pub meta_data: MetaData,
    /// Where the completed upload resides. Only populated for post-finish.
    pub storage: Option<HashMap<String, String>>,
    pub is_partial: bool,
    pub is_final: bool,
    pub partial_uploads: Vec<String>,
}

impl Upload {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn size_is_deferred(&self) -> bool {
        self.size.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(size) = self.size {
            if size < 0 {
                return Err(ValidationError::InvalidSize(size));
            }
        }
        if self.offset < 0 {
            return Err(ValidationError::InvalidSize(self.offset));
        }
        Ok(())
    }

    /// Apply the changes a pre-create handler requested.
    ///
    /// A non-empty id replaces the id. Metadata and storage, when present,
    /// replace the existing mappings as a whole; absent fields are untouched.
    pub fn apply_changes(&mut self, changes: &FileInfoChanges) {
        if let Some(id) = changes.id.as_deref().filter(|id| !id.is_empty()) {
            self.id = id.to_string();
        }
        if let Some(meta_data) = &changes.meta_data {
            self.meta_data = meta_data.clone();
        }
        if let Some(storage) = &changes.storage {
            self.storage = Some(storage.clone());
        }
    }
}

/// The HTTP request from the uploading client that caused the hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub uri: String,
    pub remote_addr: String,
    pub headers: HashMap<String, Vec<String>>,
}

impl HttpRequest {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(AccessMode::Read),
            "write" => Ok(AccessMode::Write),
            _ => Err(ValidationError::InvalidAccessMode(s.to_string())),
        }
    }
}

/// Uploads touched by a pre-access hook, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub mode: AccessMode,
    pub uploads: Vec<Upload>,
}
