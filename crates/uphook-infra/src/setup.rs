//! Building a dispatcher from configuration

use std::sync::Arc;

use anyhow::Context;

use uphook_core::{HookConfig, HookTransport};

use crate::dispatch::Dispatcher;
use crate::hooks::{FileHook, GrpcHook, HookHandler, HttpHook};

/// Create and set up the handler for the configured transport
pub async fn build_hook_handler(config: &HookConfig) -> anyhow::Result<Arc<dyn HookHandler>> {
    config.validate()?;

    let handler: Arc<dyn HookHandler> = match config.transport {
        HookTransport::Http => Arc::new(HttpHook::from_config(config)?),
        HookTransport::Grpc => Arc::new(GrpcHook::from_config(config).await?),
        HookTransport::File => Arc::new(FileHook::from_config(config)?),
    };

    handler
        .setup()
        .await
        .with_context(|| format!("Failed to set up {} hook handler", handler.name()))?;

    tracing::info!(
        transport = %config.transport,
        codec = %config.codec_kind(),
        enabled_hooks = ?config.enabled_hooks,
        timeout_ms = config.timeout_ms,
        "Hook handler ready"
    );

    Ok(handler)
}

pub async fn build_dispatcher(config: &HookConfig) -> anyhow::Result<Dispatcher> {
    let handler = build_hook_handler(config).await?;
    Ok(Dispatcher::from_config(handler, config))
}
