//! Uphook Core Library
//!
//! This crate provides the canonical hook model, the wire codecs, the
//! directive resolver, error types and configuration shared by all uphook
//! components. It performs no I/O apart from reading the environment.

pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod resolver;

// Re-export commonly used types
pub use codec::{CodecError, CodecKind, HookCodec, JsonCodec, ProtobufCodec};
pub use config::{HookConfig, HookTransport};
pub use error::{ErrorMetadata, HookError, LogLevel, ProtocolViolation, ValidationError};
pub use models::{
    AccessEvent, AccessMode, FileInfoChanges, HookEvent, HookRequest, HookResponse, HookType,
    HttpRequest, HttpResponse, MetaData, Upload, AVAILABLE_HOOKS,
};
pub use resolver::{resolve, Outcome, Resolution};
