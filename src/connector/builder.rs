//! Builder for [`Connector`].

use std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        RwLock,
        atomic::{AtomicBool, AtomicU64},
    },
};

use tokio_util::task::TaskTracker;

use super::{BackoffConfig, Connector, Shared, TracingConfig};
use crate::{
    compression::{Compressor, GzipCompressor},
    invocation::InvocationContextProvider,
    receiver::{FrameReceiver, MessageHandler, NoopHandler, ReceivePipeline},
    session::SessionSlot,
    transport::{Transport, WebSocketTransport},
};

/// Builder for [`Connector`].
///
/// Only the invocation context provider is required. The defaults are a
/// [`WebSocketTransport`], a [`GzipCompressor`], a [`FrameReceiver`] that
/// discards application messages, immediate retries and the default
/// [`TracingConfig`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use socketlink::{BackoffConfig, Connector, InvocationContext, StaticInvocationContext};
///
/// let connector = Connector::builder(StaticInvocationContext::new(InvocationContext::new(
///     "billing",
///     "ws://127.0.0.1:7000/hub",
/// )))
/// .backoff(BackoffConfig {
///     initial_delay: Duration::from_millis(50),
///     max_delay: Duration::from_secs(5),
/// })
/// .build();
/// assert_eq!(connector.state(), socketlink::ConnectionState::Idle);
/// ```
pub struct ConnectorBuilder {
    provider: Arc<dyn InvocationContextProvider>,
    transport: Arc<dyn Transport>,
    compressor: Arc<dyn Compressor>,
    pipeline: Arc<dyn ReceivePipeline>,
    backoff: Option<BackoffConfig>,
    tracing_config: TracingConfig,
}

impl ConnectorBuilder {
    /// Create a builder using `provider` for every handshake attempt.
    #[must_use]
    pub fn new<P>(provider: P) -> Self
    where
        P: InvocationContextProvider + 'static,
    {
        Self {
            provider: Arc::new(provider),
            transport: Arc::new(WebSocketTransport::new()),
            compressor: Arc::new(GzipCompressor::default()),
            pipeline: Arc::new(FrameReceiver::new(NoopHandler)),
            backoff: None,
            tracing_config: TracingConfig::default(),
        }
    }

    /// Replace the transport performing the handshake.
    #[must_use]
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Arc::new(transport);
        self
    }

    /// Replace the compressor applied to binary payloads.
    ///
    /// The same compressor is handed to the receive pipeline for inbound
    /// payloads.
    #[must_use]
    pub fn compressor<C>(mut self, compressor: C) -> Self
    where
        C: Compressor + 'static,
    {
        self.compressor = Arc::new(compressor);
        self
    }

    /// Dispatch inbound messages to `handler` through a [`FrameReceiver`].
    #[must_use]
    pub fn handler<H>(self, handler: H) -> Self
    where
        H: MessageHandler + 'static,
    {
        self.pipeline(FrameReceiver::new(handler))
    }

    /// Replace the receive pipeline entirely.
    #[must_use]
    pub fn pipeline<R>(mut self, pipeline: R) -> Self
    where
        R: ReceivePipeline + 'static,
    {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// Sleep between failed handshakes, doubling the delay on each failure.
    ///
    /// The configuration is normalized with [`BackoffConfig::normalized`].
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = Some(backoff.normalized());
        self
    }

    /// Configure tracing spans and timing for connector operations.
    #[must_use]
    pub fn tracing_config(mut self, config: TracingConfig) -> Self {
        self.tracing_config = config;
        self
    }

    /// Build the connector. No connection is attempted until
    /// [`Connector::connect`] runs.
    #[must_use]
    pub fn build(self) -> Connector {
        Connector {
            shared: Arc::new(Shared {
                provider: self.provider,
                transport: self.transport,
                compressor: self.compressor,
                pipeline: self.pipeline,
                backoff: self.backoff,
                tracing_config: self.tracing_config,
                running: AtomicBool::new(false),
                current: RwLock::new(None),
                session: SessionSlot::new(),
                generation: AtomicU64::new(0),
                last_invocation: Mutex::new(None),
                close_tasks: TaskTracker::new(),
            }),
        }
    }
}

impl fmt::Debug for ConnectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorBuilder")
            .field("backoff", &self.backoff)
            .field("tracing_config", &self.tracing_config)
            .finish_non_exhaustive()
    }
}
