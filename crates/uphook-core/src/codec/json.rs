//! Structured-text encoding
//!
//! Field names follow the capitalization of the upload server's JSON hook
//! payloads (`Type`, `Event.Upload.MetaData`, `HTTPResponse.StatusCode`).
//! Unknown fields are ignored on decode; `null` and absent optional fields
//! decode to unset, which stays distinct from an empty object.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{status_code_from_wire, CodecError, CodecKind, HookCodec};
use crate::models::{
    AccessEvent, FileInfoChanges, HookEvent, HookRequest, HookResponse, HttpRequest, HttpResponse,
    MetaData, Upload,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonHookRequest {
    #[serde(rename = "Type")]
    hook_type: String,
    event: JsonEvent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonEvent {
    upload: JsonFileInfo,
    #[serde(rename = "HTTPRequest", default)]
    http_request: JsonHttpRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access: Option<JsonAccess>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonFileInfo {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    size_is_deferred: bool,
    #[serde(default)]
    offset: i64,
    #[serde(default)]
    meta_data: Option<MetaData>,
    #[serde(default)]
    is_partial: bool,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    partial_uploads: Option<Vec<String>>,
    #[serde(default)]
    storage: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonHttpRequest {
    #[serde(default)]
    method: String,
    #[serde(rename = "URI", default)]
    uri: String,
    #[serde(default)]
    remote_addr: String,
    #[serde(default)]
    header: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonAccess {
    mode: String,
    #[serde(default)]
    uploads: Vec<JsonFileInfo>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonHookResponse {
    #[serde(rename = "HTTPResponse", default, skip_serializing_if = "Option::is_none")]
    http_response: Option<JsonHttpResponse>,
    #[serde(default)]
    reject_upload: bool,
    #[serde(default)]
    stop_upload: bool,
    #[serde(default)]
    change_file_info: Option<JsonFileInfoChanges>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonHttpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    // Handlers in the wild use both spellings
    #[serde(default, alias = "Headers", skip_serializing_if = "Option::is_none")]
    header: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JsonFileInfoChanges {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta_data: Option<MetaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage: Option<HashMap<String, String>>,
}

impl From<&Upload> for JsonFileInfo {
    fn from(upload: &Upload) -> Self {
        Self {
            id: upload.id.clone(),
            size: upload.size.unwrap_or(0),
            size_is_deferred: upload.size_is_deferred(),
            offset: upload.offset,
            meta_data: Some(upload.meta_data.clone()),
            is_partial: upload.is_partial,
            is_final: upload.is_final,
            partial_uploads: Some(upload.partial_uploads.clone()),
            storage: upload.storage.clone(),
        }
    }
}

impl From<JsonFileInfo> for Upload {
    fn from(info: JsonFileInfo) -> Self {
        Self {
            id: info.id,
            size: (!info.size_is_deferred).then_some(info.size),
            offset: info.offset,
            meta_data: info.meta_data.unwrap_or_default(),
            storage: info.storage,
            is_partial: info.is_partial,
            is_final: info.is_final,
            partial_uploads: info.partial_uploads.unwrap_or_default(),
        }
    }
}

impl From<&HttpRequest> for JsonHttpRequest {
    fn from(request: &HttpRequest) -> Self {
        Self {
            method: request.method.clone(),
            uri: request.uri.clone(),
            remote_addr: request.remote_addr.clone(),
            header: Some(request.headers.clone()),
        }
    }
}

impl From<JsonHttpRequest> for HttpRequest {
    fn from(request: JsonHttpRequest) -> Self {
        Self {
            method: request.method,
            uri: request.uri,
            remote_addr: request.remote_addr,
            headers: request.header.unwrap_or_default(),
        }
    }
}

impl HookCodec for JsonCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Json
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode_request(&self, request: &HookRequest) -> Result<Vec<u8>, CodecError> {
        let event = request.event();
        let wire = JsonHookRequest {
            hook_type: request.hook_type().to_string(),
            event: JsonEvent {
                upload: JsonFileInfo::from(&event.upload),
                http_request: JsonHttpRequest::from(&event.http_request),
                access: event.access.as_ref().map(|access| JsonAccess {
                    mode: access.mode.to_string(),
                    uploads: access.uploads.iter().map(JsonFileInfo::from).collect(),
                }),
            },
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    fn decode_request(&self, bytes: &[u8]) -> Result<HookRequest, CodecError> {
        let wire: JsonHookRequest = serde_json::from_slice(bytes)?;

        let access = match wire.event.access {
            Some(access) => Some(AccessEvent {
                mode: access.mode.parse()?,
                uploads: access.uploads.into_iter().map(Upload::from).collect(),
            }),
            None => None,
        };
        let event = HookEvent {
            upload: wire.event.upload.into(),
            http_request: wire.event.http_request.into(),
            access,
        };

        Ok(HookRequest::from_raw(&wire.hook_type, event)?)
    }

    fn encode_response(&self, response: &HookResponse) -> Result<Vec<u8>, CodecError> {
        let http = &response.http_response;
        let changes = &response.change_file_info;
        let wire = JsonHookResponse {
            http_response: Some(JsonHttpResponse {
                status_code: http.status_code.map(i64::from),
                body: http.body.clone(),
                header: (!http.headers.is_empty()).then(|| http.headers.clone()),
            }),
            reject_upload: response.reject_upload,
            stop_upload: response.stop_upload,
            change_file_info: Some(JsonFileInfoChanges {
                id: changes.id.clone(),
                meta_data: changes.meta_data.clone(),
                storage: changes.storage.clone(),
            }),
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    fn decode_response(&self, bytes: &[u8]) -> Result<HookResponse, CodecError> {
        let wire: JsonHookResponse = serde_json::from_slice(bytes)?;

        let http_response = match wire.http_response {
            Some(http) => HttpResponse {
                status_code: status_code_from_wire(http.status_code)?,
                body: http.body,
                headers: http.header.unwrap_or_default(),
            },
            None => HttpResponse::default(),
        };
        let change_file_info = wire
            .change_file_info
            .map(|changes| FileInfoChanges {
                id: changes.id,
                meta_data: changes.meta_data,
                storage: changes.storage,
            })
            .unwrap_or_default();

        Ok(HookResponse {
            http_response,
            reject_upload: wire.reject_upload,
            stop_upload: wire.stop_upload,
            change_file_info,
        })
    }
}
