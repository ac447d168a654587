//! Binary-schema encoding
//!
//! Messages of the `v2` hook service. Field numbers are fixed; new fields
//! are only ever appended. Proto3 maps cannot tell "unset" from "empty", so
//! `FileInfoChanges` carries explicit `replace_*` flags next to its maps.

use std::collections::HashMap;

use prost::Message;

use super::{status_code_from_wire, CodecError, CodecKind, HookCodec};
use crate::error::ValidationError;
use crate::models::{
    AccessEvent, FileInfoChanges, HookEvent, HookRequest, HookResponse, HttpRequest, HttpResponse,
    Upload,
};

/// Message definitions for `package v2; service HookHandler`
pub mod pb {
    use std::collections::HashMap;

    /// Full method path of the unary hook call
    pub const INVOKE_HOOK_PATH: &str = "/v2.HookHandler/InvokeHook";

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HookRequest {
        #[prost(string, tag = "1")]
        pub r#type: String,
        #[prost(message, optional, tag = "2")]
        pub event: Option<Event>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Event {
        #[prost(message, optional, tag = "1")]
        pub upload: Option<FileInfo>,
        #[prost(message, optional, tag = "2")]
        pub http_request: Option<HttpRequest>,
        #[prost(message, optional, tag = "3")]
        pub access: Option<AccessInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileInfo {
        #[prost(string, tag = "1")]
        pub id: String,
        #[prost(int64, tag = "2")]
        pub size: i64,
        #[prost(bool, tag = "3")]
        pub size_is_deferred: bool,
        #[prost(int64, tag = "4")]
        pub offset: i64,
        #[prost(map = "string, string", tag = "5")]
        pub meta_data: HashMap<String, String>,
        #[prost(bool, tag = "6")]
        pub is_partial: bool,
        #[prost(bool, tag = "7")]
        pub is_final: bool,
        #[prost(string, repeated, tag = "8")]
        pub partial_uploads: Vec<String>,
        #[prost(map = "string, string", tag = "9")]
        pub storage: HashMap<String, String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HttpRequest {
        #[prost(string, tag = "1")]
        pub method: String,
        #[prost(string, tag = "2")]
        pub uri: String,
        #[prost(string, tag = "3")]
        pub remote_addr: String,
        #[prost(map = "string, string", tag = "4")]
        pub header: HashMap<String, String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AccessInfo {
        #[prost(string, tag = "1")]
        pub mode: String,
        #[prost(message, repeated, tag = "2")]
        pub uploads: Vec<FileInfo>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HookResponse {
        #[prost(message, optional, tag = "1")]
        pub http_response: Option<HttpResponse>,
        #[prost(bool, tag = "2")]
        pub reject_upload: bool,
        #[prost(bool, tag = "3")]
        pub stop_upload: bool,
        #[prost(message, optional, tag = "4")]
        pub change_file_info: Option<FileInfoChanges>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HttpResponse {
        #[prost(int64, optional, tag = "1")]
        pub status_code: Option<i64>,
        #[prost(map = "string, string", tag = "2")]
        pub headers: HashMap<String, String>,
        #[prost(string, optional, tag = "3")]
        pub body: Option<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileInfoChanges {
        #[prost(string, optional, tag = "1")]
        pub id: Option<String>,
        #[prost(map = "string, string", tag = "2")]
        pub meta_data: HashMap<String, String>,
        #[prost(map = "string, string", tag = "3")]
        pub storage: HashMap<String, String>,
        #[prost(bool, tag = "4")]
        pub replace_meta_data: bool,
        #[prost(bool, tag = "5")]
        pub replace_storage: bool,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl From<&Upload> for pb::FileInfo {
    fn from(upload: &Upload) -> Self {
        Self {
            id: upload.id.clone(),
            size: upload.size.unwrap_or(0),
            size_is_deferred: upload.size_is_deferred(),
            offset: upload.offset,
            meta_data: upload.meta_data.clone(),
            is_partial: upload.is_partial,
            is_final: upload.is_final,
            partial_uploads: upload.partial_uploads.clone(),
            storage: upload.storage.clone().unwrap_or_default(),
        }
    }
}

impl From<pb::FileInfo> for Upload {
    fn from(info: pb::FileInfo) -> Self {
        Self {
            id: info.id,
            size: (!info.size_is_deferred).then_some(info.size),
            offset: info.offset,
            meta_data: info.meta_data,
            storage: (!info.storage.is_empty()).then_some(info.storage),
            is_partial: info.is_partial,
            is_final: info.is_final,
            partial_uploads: info.partial_uploads,
        }
    }
}

impl From<&HttpRequest> for pb::HttpRequest {
    fn from(request: &HttpRequest) -> Self {
        // The schema has one value per header; repeated values are combined
        // the way HTTP allows for list-valued fields.
        let header = request
            .headers
            .iter()
            .filter(|(key, values)| !key.is_empty() && !values.is_empty())
            .map(|(key, values)| (key.clone(), values.join(", ")))
            .collect();

        Self {
            method: request.method.clone(),
            uri: request.uri.clone(),
            remote_addr: request.remote_addr.clone(),
            header,
        }
    }
}

impl From<pb::HttpRequest> for HttpRequest {
    fn from(request: pb::HttpRequest) -> Self {
        Self {
            method: request.method,
            uri: request.uri,
            remote_addr: request.remote_addr,
            headers: request
                .header
                .into_iter()
                .map(|(key, value)| (key, vec![value]))
                .collect(),
        }
    }
}

fn present_map(map: HashMap<String, String>, replace: bool) -> Option<HashMap<String, String>> {
    (replace || !map.is_empty()).then_some(map)
}

impl HookCodec for ProtobufCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Protobuf
    }

    fn content_type(&self) -> &'static str {
        "application/grpc+proto"
    }

    fn encode_request(&self, request: &HookRequest) -> Result<Vec<u8>, CodecError> {
        let event = request.event();
        let message = pb::HookRequest {
            r#type: request.hook_type().to_string(),
            event: Some(pb::Event {
                upload: Some(pb::FileInfo::from(&event.upload)),
                http_request: Some(pb::HttpRequest::from(&event.http_request)),
                access: event.access.as_ref().map(|access| pb::AccessInfo {
                    mode: access.mode.to_string(),
                    uploads: access.uploads.iter().map(pb::FileInfo::from).collect(),
                }),
            }),
        };
        Ok(message.encode_to_vec())
    }

    fn decode_request(&self, bytes: &[u8]) -> Result<HookRequest, CodecError> {
        let message = pb::HookRequest::decode(bytes)?;

        if message.r#type.is_empty() {
            return Err(ValidationError::MissingField("type").into());
        }
        let event = message
            .event
            .ok_or(ValidationError::MissingField("event"))?;
        let upload = event
            .upload
            .ok_or(ValidationError::MissingField("event.upload"))?;

        let access = match event.access {
            Some(access) => Some(AccessEvent {
                mode: access.mode.parse()?,
                uploads: access.uploads.into_iter().map(Upload::from).collect(),
            }),
            None => None,
        };
        let event = HookEvent {
            upload: upload.into(),
            http_request: event.http_request.map(Into::into).unwrap_or_default(),
            access,
        };

        Ok(HookRequest::from_raw(&message.r#type, event)?)
    }

    fn encode_response(&self, response: &HookResponse) -> Result<Vec<u8>, CodecError> {
        let http = &response.http_response;
        let changes = &response.change_file_info;
        let message = pb::HookResponse {
            http_response: Some(pb::HttpResponse {
                status_code: http.status_code.map(i64::from),
                headers: http.headers.clone(),
                body: http.body.clone(),
            }),
            reject_upload: response.reject_upload,
            stop_upload: response.stop_upload,
            change_file_info: Some(pb::FileInfoChanges {
                id: changes.id.clone(),
                meta_data: changes.meta_data.clone().unwrap_or_default(),
                storage: changes.storage.clone().unwrap_or_default(),
                replace_meta_data: changes.meta_data.is_some(),
                replace_storage: changes.storage.is_some(),
            }),
        };
        Ok(message.encode_to_vec())
    }

    fn decode_response(&self, bytes: &[u8]) -> Result<HookResponse, CodecError> {
        let message = pb::HookResponse::decode(bytes)?;

        let http_response = match message.http_response {
            Some(http) => HttpResponse {
                status_code: status_code_from_wire(http.status_code)?,
                body: http.body,
                headers: http.headers,
            },
            None => HttpResponse::default(),
        };
        let change_file_info = message
            .change_file_info
            .map(|changes| FileInfoChanges {
                id: changes.id,
                meta_data: present_map(changes.meta_data, changes.replace_meta_data),
                storage: present_map(changes.storage, changes.replace_storage),
            })
            .unwrap_or_default();

        Ok(HookResponse {
            http_response,
            reject_upload: message.reject_upload,
            stop_upload: message.stop_upload,
            change_file_info,
        })
    }
}
