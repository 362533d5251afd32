//! Receive pipeline boundary.
//!
//! After each successful handshake the connector builds a fresh
//! [`ReceiverContext`] and awaits [`ReceivePipeline::run`]. The pipeline owns
//! the inbound half of the link for the whole session. It is expected to
//! publish the hub-assigned [`ConnectionId`](crate::ConnectionId) through
//! [`ReceiverContext::session`] and to invoke [`CloseCallback::close`] once
//! the session ends. The connector re-enters its connect loop as soon as
//! `run` returns.
//!
//! [`FrameReceiver`] is the default pipeline. It dispatches decoded
//! messages to a [`MessageHandler`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio_util::task::TaskTracker;

use crate::{
    compression::Compressor,
    connection::ConnectionHandle,
    invocation::InvocationContext,
    message::MessageContext,
    session::SessionAssigner,
    transport::{CloseStatus, FrameStream},
};

mod frame_receiver;

pub use frame_receiver::FrameReceiver;

/// Close reason sent when the receive pipeline ends a session.
pub const RECEIVER_CLOSE_REASON: &str = "receiver closed";

/// Everything a receive pipeline needs for one session.
#[non_exhaustive]
pub struct ReceiverContext {
    /// Compressor used to decode inbound binary frames.
    pub compressor: Arc<dyn Compressor>,
    /// Context of the handshake that opened this session.
    pub invocation: InvocationContext,
    /// Inbound frames of the session.
    pub frames: FrameStream,
    /// Hook that closes the session's connection.
    pub closer: CloseCallback,
    /// Writer for the hub-assigned connection id.
    pub session: SessionAssigner,
    /// Generation of the connection handle backing this session.
    pub generation: u64,
}

impl std::fmt::Debug for ReceiverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverContext")
            .field("invocation", &self.invocation)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Consumer of a session's inbound frames.
#[async_trait]
pub trait ReceivePipeline: Send + Sync {
    /// Process inbound frames until the session ends.
    async fn run(&self, context: ReceiverContext);
}

/// Close hook bound to the connection of a single session.
#[derive(Clone)]
pub struct CloseCallback {
    handle: Arc<ConnectionHandle>,
    tracker: TaskTracker,
}

impl CloseCallback {
    pub(crate) fn new(handle: Arc<ConnectionHandle>, tracker: TaskTracker) -> Self {
        Self { handle, tracker }
    }

    /// Close the session's connection with a normal closure.
    ///
    /// The close frame is written in the background. Calling this more than
    /// once, or after the connection is already closing, has no effect.
    pub fn close(&self) {
        let status = CloseStatus::normal(RECEIVER_CLOSE_REASON);
        if !self.handle.begin_close(status, &self.tracker) {
            debug!(
                "close callback ignored: generation={}, state={:?}",
                self.handle.generation(),
                self.handle.state()
            );
        }
    }

    /// Record why the session ended, such as the status of a remote close
    /// frame. The first recorded status wins.
    pub fn record(&self, status: CloseStatus) { self.handle.record_close(status); }
}

impl std::fmt::Debug for CloseCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseCallback")
            .field("generation", &self.handle.generation())
            .finish_non_exhaustive()
    }
}

/// Application callbacks invoked by [`FrameReceiver`].
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle a text message other than the hub handshake.
    async fn on_text(&self, _context: MessageContext) {}

    /// Handle a decompressed binary payload.
    async fn on_binary(&self, _payload: Bytes) {}
}

/// Handler that discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

impl MessageHandler for NoopHandler {}
