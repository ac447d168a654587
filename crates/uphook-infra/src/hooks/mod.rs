//! Hook handler transports
//!
//! A [`HookHandler`] carries one encoded hook request to the handler and
//! brings back its decoded response. Handlers know nothing about deadlines,
//! enabled hook types or directive resolution; the
//! [`Dispatcher`](crate::Dispatcher) owns those.

mod file;
mod grpc;
mod http;

use async_trait::async_trait;

use uphook_core::{HookError, HookRequest, HookResponse};

pub use file::FileHook;
pub use grpc::{GrpcHook, GrpcTlsFiles};
pub use http::HttpHook;

/// Transport to an external hook handler
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Short transport name for logs
    fn name(&self) -> &'static str;

    /// Prepare the transport before the first invocation
    async fn setup(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Deliver a request and return the handler's response.
    ///
    /// Implementations must be cancel-safe: dropping the returned future
    /// aborts the call.
    async fn invoke_hook(&self, request: &HookRequest) -> Result<HookResponse, HookError>;
}
