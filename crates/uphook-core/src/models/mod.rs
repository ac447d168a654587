//! Canonical hook model
//!
//! Transport-independent representation of hook requests and responses.
//! Both wire codecs produce and consume these types; nothing else in the
//! workspace reads raw payloads.

mod hook_type;
mod request;
mod response;
mod upload;

pub use hook_type::*;
pub use request::*;
pub use response::*;
pub use upload::*;
