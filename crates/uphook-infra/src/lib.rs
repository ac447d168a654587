//! Uphook infrastructure
//!
//! Hook handler transports (HTTP, gRPC, executable files), the dispatcher
//! that runs them under a deadline, hook metrics and tracing setup.

pub mod dispatch;
pub mod hooks;
pub mod http_response;
pub mod metrics;
pub mod setup;
pub mod telemetry;

pub use dispatch::{failure_response, Dispatcher};
pub use hooks::{FileHook, GrpcHook, HookHandler, HttpHook};
pub use http_response::IntoHttpResponse;
pub use metrics::HookMetrics;
pub use setup::{build_dispatcher, build_hook_handler};
pub use telemetry::{init_telemetry, LogFormat};
