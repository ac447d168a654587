//! Tracing initialization
//!
//! Installs the global `tracing` subscriber used by the uphook binaries.

mod init_basic;

pub use init_basic::{init_telemetry, LogFormat};
