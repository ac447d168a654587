//! Hook dispatch
//!
//! The [`Dispatcher`] is what the upload engine talks to. For each lifecycle
//! point it builds the request, calls the configured handler under a
//! deadline, validates and resolves the response, and logs and counts each
//! step.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use uphook_core::{
    resolve, ErrorMetadata, HookConfig, HookError, HookEvent, HookRequest, HookResponse,
    HookType, HttpResponse, LogLevel, Outcome, Resolution, AVAILABLE_HOOKS,
};

use crate::hooks::HookHandler;
use crate::metrics::HookMetrics;

/// Invokes hooks on one handler. Cheap to clone; clones share the handler.
#[derive(Clone)]
pub struct Dispatcher {
    handler: Arc<dyn HookHandler>,
    enabled_hooks: Arc<HashSet<HookType>>,
    timeout: Duration,
    metrics: HookMetrics,
}

impl Dispatcher {
    /// Dispatcher with every hook type enabled
    pub fn new(handler: Arc<dyn HookHandler>, timeout: Duration) -> Self {
        Self {
            handler,
            enabled_hooks: Arc::new(AVAILABLE_HOOKS.into_iter().collect()),
            timeout,
            metrics: HookMetrics::default(),
        }
    }

    pub fn from_config(handler: Arc<dyn HookHandler>, config: &HookConfig) -> Self {
        Self::new(handler, config.timeout()).with_enabled_hooks(config.enabled_hooks.clone())
    }

    pub fn with_enabled_hooks(mut self, hooks: impl IntoIterator<Item = HookType>) -> Self {
        self.enabled_hooks = Arc::new(hooks.into_iter().collect());
        self
    }

    pub fn with_metrics(mut self, metrics: HookMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn is_enabled(&self, hook_type: HookType) -> bool {
        self.enabled_hooks.contains(&hook_type)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn invoke(
        &self,
        hook_type: HookType,
        event: HookEvent,
    ) -> Result<Resolution, HookError> {
        self.invoke_with_cancel(hook_type, event, &CancellationToken::new())
            .await
    }

    /// Invoke a hook, giving up when the deadline passes or `cancel` fires.
    /// In both cases the in-flight handler call is dropped.
    pub async fn invoke_with_cancel(
        &self,
        hook_type: HookType,
        event: HookEvent,
        cancel: &CancellationToken,
    ) -> Result<Resolution, HookError> {
        if !self.is_enabled(hook_type) {
            return Ok(Resolution::proceed(hook_type));
        }

        self.metrics.record_invocation(hook_type);
        let upload_id = event.upload.id.clone();

        let request = match HookRequest::new(hook_type, event) {
            Ok(request) => request,
            Err(e) => return Err(self.report_failure(hook_type, &upload_id, e.into())),
        };

        tracing::debug!(
            hook_type = %hook_type,
            upload_id = %upload_id,
            handler = self.handler.name(),
            "HookInvocationStart"
        );

        let response = match self.call_handler(&request, cancel).await {
            Ok(response) => response,
            Err(e) => return Err(self.report_failure(hook_type, &upload_id, e)),
        };

        let resolution = resolve(hook_type, &response);

        for violation in &resolution.violations {
            tracing::warn!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                violation = %violation,
                "Hook handler returned a directive not allowed for this hook type"
            );
        }

        match &resolution.outcome {
            Outcome::Reject(http) => tracing::info!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                status_code = ?http.status_code,
                "HookInvocationFinish: upload rejected"
            ),
            Outcome::StopAfterCompletion(_) => tracing::info!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                "HookInvocationFinish: upload stopped"
            ),
            _ => tracing::debug!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                "HookInvocationFinish"
            ),
        }

        Ok(resolution)
    }

    fn report_failure(&self, hook_type: HookType, upload_id: &str, e: HookError) -> HookError {
        self.metrics.record_error(hook_type, e.error_type());
        match e.log_level() {
            LogLevel::Debug => tracing::debug!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                error = %e,
                error_type = e.error_type(),
                error_code = e.error_code(),
                recoverable = e.is_recoverable(),
                "HookInvocationError"
            ),
            LogLevel::Warn => tracing::warn!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                error = %e,
                error_type = e.error_type(),
                error_code = e.error_code(),
                recoverable = e.is_recoverable(),
                "HookInvocationError"
            ),
            LogLevel::Error => tracing::error!(
                hook_type = %hook_type,
                upload_id = %upload_id,
                error = %e,
                error_type = e.error_type(),
                error_code = e.error_code(),
                recoverable = e.is_recoverable(),
                "HookInvocationError"
            ),
        }
        e
    }

    async fn call_handler(
        &self,
        request: &HookRequest,
        cancel: &CancellationToken,
    ) -> Result<HookResponse, HookError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HookError::Cancelled),
            result = self.handler.invoke_hook(request) => result?,
            _ = tokio::time::sleep(self.timeout) => return Err(HookError::Timeout(self.timeout)),
        };

        response
            .validate()
            .map_err(|e| HookError::MalformedResponse(e.to_string()))?;
        Ok(response)
    }

    /// Invoke a hook and apply the failure policy.
    ///
    /// A failed blocking hook aborts the operation: the error comes back as
    /// the response to send to the uploading client. A failed informational
    /// hook is logged and the upload proceeds.
    pub async fn invoke_or_fail(
        &self,
        hook_type: HookType,
        event: HookEvent,
    ) -> Result<Resolution, HttpResponse> {
        match self.invoke(hook_type, event).await {
            Ok(resolution) => Ok(resolution),
            Err(e) if hook_type.is_blocking() => Err(failure_response(&e)),
            Err(e) => {
                tracing::warn!(
                    hook_type = %hook_type,
                    error = %e,
                    "Informational hook failed, proceeding"
                );
                Ok(Resolution::proceed(hook_type))
            }
        }
    }
}

/// Client response for a blocking hook that could not be completed.
///
/// Details of sensitive errors (handler output, endpoints, payload problems)
/// stay in the logs.
pub fn failure_response(err: &HookError) -> HttpResponse {
    let body = if err.is_sensitive() {
        format!("{}: {}\n", err.error_code(), err.client_message())
    } else {
        format!("{}: {}: {}\n", err.error_code(), err.client_message(), err)
    };
    HttpResponse::new(err.http_status_code())
        .with_body(body)
        .with_header("Content-Type", "text/plain; charset=utf-8")
}
