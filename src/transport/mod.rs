//! Transport seam between the connector and the socket library.
//!
//! A [`Transport`] performs the opening handshake for one attempt and hands
//! back a [`TransportLink`]: an outbound [`FrameSink`] and an inbound
//! [`FrameStream`]. The connector owns the sink; the receive pipeline owns
//! the stream. [`WebSocketTransport`] is the production implementation.

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Sink, Stream};

use crate::{error::TransportError, invocation::InvocationContext};

mod websocket;

pub use websocket::WebSocketTransport;

/// Close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the peer closed without a status code.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Close code recorded when the socket ended without a close handshake.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Code and reason exchanged in a close frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseStatus {
    code: u16,
    reason: String,
}

impl CloseStatus {
    /// Create a close status with an explicit code.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Normal closure with the given reason.
    #[must_use]
    pub fn normal(reason: impl Into<String>) -> Self { Self::new(NORMAL_CLOSURE, reason) }

    /// Status recorded when the socket ended without a close frame.
    #[must_use]
    pub fn abnormal() -> Self { Self::new(ABNORMAL_CLOSURE, "") }

    /// Close code.
    #[must_use]
    pub fn code(&self) -> u16 { self.code }

    /// Close reason.
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }

    /// Return true for a normal closure.
    #[must_use]
    pub fn is_normal(&self) -> bool { self.code == NORMAL_CLOSURE }
}

impl fmt::Display for CloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.reason)
    }
}

/// A complete frame exchanged over a link.
///
/// Control frames other than close are handled by the transport and never
/// surface here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Final UTF-8 text frame.
    Text(String),
    /// Final binary frame.
    Binary(Bytes),
    /// Close frame, optionally carrying a status.
    Close(Option<CloseStatus>),
}

/// Outbound half of a link.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Inbound half of a link.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// Established link produced by a successful handshake.
pub struct TransportLink {
    sink: FrameSink,
    stream: FrameStream,
}

impl TransportLink {
    /// Pair an outbound sink with an inbound stream.
    #[must_use]
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self { Self { sink, stream } }

    /// Split the link into its halves.
    #[must_use]
    pub fn into_parts(self) -> (FrameSink, FrameStream) { (self.sink, self.stream) }
}

impl fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportLink").finish_non_exhaustive()
    }
}

/// Source of established links consumed by the connect loop.
///
/// Implementations must be cancellation-safe: the connect loop drops a
/// pending `connect()` future when its cancellation token fires, and doing
/// so must not leak the half-open socket.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the opening handshake for `context`.
    ///
    /// The request must identify the connector to the hub through the
    /// [`CONNECTOR_NAME_HEADER`](crate::invocation::CONNECTOR_NAME_HEADER)
    /// header.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the endpoint is invalid, refuses the
    /// connection, or the handshake fails.
    async fn connect(&self, context: &InvocationContext) -> Result<TransportLink, TransportError>;
}
