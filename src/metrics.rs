//! Metric helpers for `socketlink`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. The helpers are
//! always callable; they record nothing when the `metrics` feature is
//! disabled.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open connections.
pub const CONNECTIONS_ACTIVE: &str = "socketlink_connections_active";
/// Name of the counter tracking handshake attempts.
pub const HANDSHAKE_ATTEMPTS: &str = "socketlink_handshake_attempts_total";
/// Name of the counter tracking failed handshake attempts.
pub const HANDSHAKE_FAILURES: &str = "socketlink_handshake_failures_total";
/// Name of the counter tracking sessions that ended and re-entered the
/// connect loop.
pub const RECONNECTS: &str = "socketlink_reconnects_total";
/// Name of the counter tracking processed frames.
pub const FRAMES_PROCESSED: &str = "socketlink_frames_processed_total";
/// Name of the counter tracking inbound frames the receive pipeline
/// rejected.
pub const ERRORS_TOTAL: &str = "socketlink_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Inbound frames received from the hub.
    Inbound,
    /// Outbound frames sent to the hub.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Data frame kind.
#[derive(Clone, Copy, Debug)]
pub enum FrameKind {
    /// UTF-8 text frame carrying a message context.
    Text,
    /// Compressed binary frame.
    Binary,
}

impl FrameKind {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            FrameKind::Text => "text",
            FrameKind::Binary => "binary",
        }
    }
}

/// Increment the open connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the open connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a handshake attempt.
pub fn inc_handshake_attempts() {
    #[cfg(feature = "metrics")]
    counter!(HANDSHAKE_ATTEMPTS).increment(1);
}

/// Record a failed handshake attempt.
pub fn inc_handshake_failures() {
    #[cfg(feature = "metrics")]
    counter!(HANDSHAKE_FAILURES).increment(1);
}

/// Record a session ending and the loop re-entering.
pub fn inc_reconnects() {
    #[cfg(feature = "metrics")]
    counter!(RECONNECTS).increment(1);
}

/// Record a processed frame for the given direction and kind.
pub fn inc_frames(direction: Direction, kind: FrameKind) {
    #[cfg(feature = "metrics")]
    counter!(
        FRAMES_PROCESSED,
        "direction" => direction.as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (direction, kind);
}

/// Record an inbound frame the receive pipeline could not process.
pub fn inc_errors(kind: FrameKind) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
