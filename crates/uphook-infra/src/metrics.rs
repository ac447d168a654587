//! OpenTelemetry counters for hook invocations
//!
//! Counters are created from a [`Meter`]; without an installed meter provider
//! the global meter is a no-op, so recording is always safe.

use opentelemetry::{
    metrics::{Counter, Meter},
    KeyValue,
};

use uphook_core::HookType;

/// Per-hook-type invocation and error counters
#[derive(Clone)]
pub struct HookMetrics {
    invocations: Counter<u64>,
    errors: Counter<u64>,
}

impl HookMetrics {
    pub fn new(meter: Meter) -> Self {
        let invocations = meter
            .u64_counter("uphook.hooks.invocations.count")
            .with_description("Total number of hook invocations for enabled hook types")
            .build();

        let errors = meter
            .u64_counter("uphook.hooks.errors.count")
            .with_description("Total number of failed hook invocations")
            .build();

        Self {
            invocations,
            errors,
        }
    }

    pub fn record_invocation(&self, hook_type: HookType) {
        self.invocations
            .add(1, &[KeyValue::new("hook_type", hook_type.as_str())]);
    }

    pub fn record_error(&self, hook_type: HookType, error_type: &'static str) {
        let labels = &[
            KeyValue::new("hook_type", hook_type.as_str()),
            KeyValue::new("error_type", error_type),
        ];
        self.errors.add(1, labels);
    }
}

impl Default for HookMetrics {
    fn default() -> Self {
        Self::new(opentelemetry::global::meter("uphook"))
    }
}
