//! Resilient client connector.
//!
//! [`Connector`] keeps one connection to a hub alive: it retries the
//! handshake until it succeeds, hands the live connection to a
//! [`ReceivePipeline`](crate::receiver::ReceivePipeline), and starts over
//! when the session ends. Sends are independent of the loop and go out on
//! whichever connection is currently open.

use std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        PoisonError,
        RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span};

mod backoff;
mod builder;
mod framing;
mod runtime;
mod tracing_config;
mod tracing_helpers;

pub use backoff::BackoffConfig;
pub use builder::ConnectorBuilder;
pub use tracing_config::TracingConfig;
use tracing_helpers::{close_span, emit_timing_event, send_span, start_timer};

use crate::{
    compression::Compressor,
    connection::{ConnectionHandle, ConnectionState},
    error::ConnectorError,
    invocation::{InvocationContext, InvocationContextProvider},
    message::MessageContext,
    metrics::{self, Direction, FrameKind},
    receiver::ReceivePipeline,
    session::{ConnectionId, SessionSlot},
    transport::{CloseStatus, Frame, Transport},
};

/// Client connector maintaining a session with a hub.
///
/// `Connector` is cheap to clone; clones share the same connection, so one
/// task can drive [`connect`](Self::connect) while others send.
///
/// # Examples
///
/// ```no_run
/// use serde_json::json;
/// use socketlink::{Command, Connector, InvocationContext, MessageContext};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), socketlink::ConnectorError> {
/// let connector =
///     Connector::builder(|| InvocationContext::new("billing", "ws://127.0.0.1:7000/hub")).build();
/// let cancel = CancellationToken::new();
///
/// let runner = connector.clone();
/// let token = cancel.clone();
/// tokio::spawn(async move { runner.connect(token).await });
///
/// connector
///     .send_text(MessageContext::new(Command::DataSend, json!({"order": 7})))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connector {
    shared: Arc<Shared>,
}

struct Shared {
    provider: Arc<dyn InvocationContextProvider>,
    transport: Arc<dyn Transport>,
    compressor: Arc<dyn Compressor>,
    pipeline: Arc<dyn ReceivePipeline>,
    backoff: Option<BackoffConfig>,
    tracing_config: TracingConfig,
    /// Set while a connect loop owns this connector.
    running: AtomicBool,
    /// Written only by the connect loop.
    current: RwLock<Option<Arc<ConnectionHandle>>>,
    session: SessionSlot,
    generation: AtomicU64,
    last_invocation: Mutex<Option<InvocationContext>>,
    close_tasks: TaskTracker,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("state", &self.state())
            .field("connection_id", &self.connection_id())
            .field("backoff", &self.shared.backoff)
            .field("tracing_config", &self.shared.tracing_config)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// Start building a connector that resolves its endpoint through
    /// `provider` on every handshake attempt.
    #[must_use]
    pub fn builder<P>(provider: P) -> ConnectorBuilder
    where
        P: InvocationContextProvider + 'static,
    {
        ConnectorBuilder::new(provider)
    }

    /// Lifecycle state of the current connection.
    ///
    /// Returns [`ConnectionState::Idle`] until the first handshake attempt.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.current()
            .map_or(ConnectionState::Idle, |handle| handle.state())
    }

    /// Connection id the hub assigned to the current session.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> { self.shared.session.current() }

    /// Observe connection id assignments.
    ///
    /// The value is reset to `None` each time a new connection opens.
    #[must_use]
    pub fn subscribe_connection_id(&self) -> watch::Receiver<Option<ConnectionId>> {
        self.shared.session.subscribe()
    }

    /// Connector name used for the most recent handshake attempt.
    #[must_use]
    pub fn connector_name(&self) -> Option<String> {
        self.shared
            .last_invocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|ctx| ctx.connector_name().to_owned())
    }

    /// Ensure `context` carries the session's connection id and serialize it
    /// into a text segment.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidSessionHeader`] if the header carries
    /// an empty or non-string `ConnectionId`,
    /// [`ConnectorError::SessionPending`] if one must be injected but the hub
    /// has not assigned it yet, and [`ConnectorError::InvalidArgument`] if the
    /// context cannot be serialized.
    pub fn prepare_outbound(&self, context: &mut MessageContext) -> Result<String, ConnectorError> {
        framing::prepare_outbound(context, self.shared.session.current().as_ref())
    }

    /// Send `context` as one text frame on the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotConnected`] when no connection is open,
    /// any error of [`prepare_outbound`](Self::prepare_outbound), or
    /// [`ConnectorError::Transport`] if the write fails.
    pub async fn send_text(&self, mut context: MessageContext) -> Result<(), ConnectorError> {
        let handle = self.open_handle()?;
        let segment = self.prepare_outbound(&mut context)?;
        let span = send_span(&self.shared.tracing_config, "text", segment.len());
        self.send_frame(&handle, Frame::Text(segment), FrameKind::Text, span)
            .await
    }

    /// Compress `payload` and send it as one binary frame on the open
    /// connection.
    ///
    /// Payloads are never chunked; the whole compressed payload travels in a
    /// single frame and is subject to the peer's frame size limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotConnected`] when no connection is open,
    /// [`ConnectorError::CompressionFailed`] if compression fails, or
    /// [`ConnectorError::Transport`] if the write fails.
    pub async fn send_binary(&self, payload: &[u8]) -> Result<(), ConnectorError> {
        let handle = self.open_handle()?;
        let packed = self.shared.compressor.compress(payload)?;
        let span = send_span(&self.shared.tracing_config, "binary", packed.len());
        self.send_frame(
            &handle,
            Frame::Binary(Bytes::from(packed)),
            FrameKind::Binary,
            span,
        )
        .await
    }

    async fn send_frame(
        &self,
        handle: &ConnectionHandle,
        frame: Frame,
        kind: FrameKind,
        span: Span,
    ) -> Result<(), ConnectorError> {
        let start = start_timer(self.shared.tracing_config.send_timing);
        let result = handle.send(frame).instrument(span.clone()).await;
        span.in_scope(|| emit_timing_event(start));
        if result.is_ok() {
            metrics::inc_frames(Direction::Outbound, kind);
        }
        result
    }

    /// Close the open connection with a normal closure and `reason`.
    ///
    /// The close frame is written in the background. Once the hub
    /// acknowledges, the session ends and [`connect`](Self::connect) starts a
    /// new handshake unless its cancellation token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotConnected`] when no connection is open.
    pub fn close(&self, reason: impl Into<String>) -> Result<(), ConnectorError> {
        let handle = self.open_handle()?;
        let span = close_span(&self.shared.tracing_config, handle.generation());
        let _entered = span.enter();
        let start = start_timer(self.shared.tracing_config.close_timing);
        let closing = handle.begin_close(CloseStatus::normal(reason), &self.shared.close_tasks);
        emit_timing_event(start);
        if closing {
            Ok(())
        } else {
            Err(ConnectorError::NotConnected)
        }
    }

    /// Wait until every close handshake issued so far has been written or
    /// has failed.
    pub async fn wait_for_close_tasks(&self) {
        let tasks = &self.shared.close_tasks;
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }

    fn current(&self) -> Option<Arc<ConnectionHandle>> {
        self.shared
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn open_handle(&self) -> Result<Arc<ConnectionHandle>, ConnectorError> {
        self.current()
            .filter(|handle| handle.state() == ConnectionState::Open)
            .ok_or(ConnectorError::NotConnected)
    }

    fn install(&self, handle: Arc<ConnectionHandle>) {
        *self
            .shared
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn next_generation(&self) -> u64 { self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1 }

    fn remember(&self, invocation: &InvocationContext) {
        *self
            .shared
            .last_invocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(invocation.clone());
    }
}
