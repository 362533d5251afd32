//! Tracing span and event helpers for connector operations.
//!
//! These helpers centralise span creation with dynamic level selection and
//! timing emission, keeping the instrumentation out of the connect loop and
//! send path.

use std::time::Instant;

use tracing::{Level, Span};

use super::tracing_config::TracingConfig;

/// Create a tracing span at a dynamically selected level.
///
/// Each branch calls the corresponding `tracing::<level>_span!` macro so the
/// span metadata is statically known per branch while the branch selection
/// is dynamic.
macro_rules! dynamic_span {
    ($level:expr, $name:expr $(, $($field:tt)*)?) => {
        match $level {
            Level::ERROR => tracing::error_span!($name $(, $($field)*)?),
            Level::WARN  => tracing::warn_span!($name $(, $($field)*)?),
            Level::INFO  => tracing::info_span!($name $(, $($field)*)?),
            Level::DEBUG => tracing::debug_span!($name $(, $($field)*)?),
            Level::TRACE => tracing::trace_span!($name $(, $($field)*)?),
        }
    };
}

/// Create a span for one handshake attempt.
///
/// The `result` field is recorded once the attempt completes.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn connect_span(
    config: &TracingConfig,
    connector: &str,
    endpoint: &str,
    attempt: u64,
) -> Span {
    dynamic_span!(
        config.connect_level,
        "connector.connect",
        connector = connector,
        endpoint = endpoint,
        attempt = attempt,
        result = tracing::field::Empty
    )
}

/// Create a span for a text or binary send.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn send_span(config: &TracingConfig, kind: &'static str, frame_bytes: usize) -> Span {
    dynamic_span!(
        config.send_level,
        "connector.send",
        frame.kind = kind,
        frame.bytes = frame_bytes
    )
}

/// Create a span for the `close` operation.
#[expect(
    clippy::cognitive_complexity,
    reason = "complexity from dynamic_span! macro expansion"
)]
pub(crate) fn close_span(config: &TracingConfig, generation: u64) -> Span {
    dynamic_span!(config.close_level, "connector.close", generation = generation)
}

/// Start a timer if timing is enabled for an operation.
pub(crate) fn start_timer(enabled: bool) -> Option<Instant> { enabled.then(Instant::now) }

/// Record elapsed time if timing was enabled for this operation.
///
/// `start` is `None` when timing is disabled. When `Some`, an event is
/// emitted with the `elapsed_us` field at `DEBUG` level.
pub(crate) fn emit_timing_event(start: Option<Instant>) {
    if let Some(start) = start {
        let elapsed_us = start.elapsed().as_micros();
        tracing::debug!(elapsed_us = elapsed_us, "operation.timing");
    }
}
