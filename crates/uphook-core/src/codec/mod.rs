//! Wire codecs for the hook protocol
//!
//! Two encodings of the canonical model share the [`HookCodec`] interface:
//! a JSON encoding used by HTTP and file hooks, and a protobuf encoding used
//! by gRPC hooks. The codec is picked from configuration through
//! [`CodecKind`], never by inspecting a payload.

mod json;
mod protobuf;

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

pub use json::JsonCodec;
pub use protobuf::{pb, ProtobufCodec};

use crate::error::ValidationError;
use crate::models::{HookRequest, HookResponse};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("Invalid hook payload: {0}")]
    Validation(#[from] ValidationError),
}

/// Bidirectional mapping between the canonical model and one wire format.
///
/// For every valid `HookResponse` `x`,
/// `decode_response(&encode_response(&x)?)? == x`.
pub trait HookCodec: Send + Sync {
    fn kind(&self) -> CodecKind;

    /// MIME type of encoded payloads
    fn content_type(&self) -> &'static str;

    fn encode_request(&self, request: &HookRequest) -> Result<Vec<u8>, CodecError>;

    fn decode_request(&self, bytes: &[u8]) -> Result<HookRequest, CodecError>;

    fn encode_response(&self, response: &HookResponse) -> Result<Vec<u8>, CodecError>;

    fn decode_response(&self, bytes: &[u8]) -> Result<HookResponse, CodecError>;
}

/// Zero is what zero-valued handlers send for "no status code"
fn status_code_from_wire(code: Option<i64>) -> Result<Option<u16>, ValidationError> {
    match code {
        None | Some(0) => Ok(None),
        Some(code) => u16::try_from(code)
            .ok()
            .filter(|c| (100..=599).contains(c))
            .map(Some)
            .ok_or(ValidationError::InvalidStatusCode(code)),
    }
}

/// Available wire encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Json,
    Protobuf,
}

impl Display for CodecKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CodecKind::Json => write!(f, "json"),
            CodecKind::Protobuf => write!(f, "protobuf"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(CodecKind::Json),
            "protobuf" | "proto" => Ok(CodecKind::Protobuf),
            _ => Err(anyhow::anyhow!("Invalid codec: {}", s)),
        }
    }
}
