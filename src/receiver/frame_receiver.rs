//! Default receive pipeline.

use std::ops::ControlFlow;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use log::{debug, warn};

use super::{MessageHandler, NoopHandler, ReceivePipeline, ReceiverContext};
use crate::{
    ConnectionId,
    compression::Compressor,
    error::ConnectorError,
    message::{Command, MessageContext},
    metrics::{self, Direction, FrameKind},
    session::SessionAssigner,
    transport::{CloseStatus, Frame, NO_STATUS_RECEIVED},
};

/// Receive pipeline speaking the hub's message protocol.
///
/// - A text frame whose command is [`Command::Handshake`] carries the
///   session's connection id in its `ConnectionId` header entry and is
///   consumed here.
/// - Any other text frame is parsed as a [`MessageContext`] and handed to
///   [`MessageHandler::on_text`]. Frames that do not parse are logged and
///   skipped.
/// - Binary frames are decompressed and handed to
///   [`MessageHandler::on_binary`]. A payload that fails to decompress ends
///   the session.
/// - A close frame, a stream error or the end of the stream ends the
///   session.
///
/// When the session ends the close callback is always invoked.
#[derive(Debug, Default)]
pub struct FrameReceiver<H = NoopHandler> {
    handler: H,
}

impl<H: MessageHandler> FrameReceiver<H> {
    /// Create a pipeline dispatching to `handler`.
    pub fn new(handler: H) -> Self { Self { handler } }

    /// Borrow the wrapped handler.
    pub fn handler(&self) -> &H { &self.handler }

    async fn on_frame(
        &self,
        frame: Frame,
        compressor: &dyn Compressor,
        session: &SessionAssigner,
    ) -> ControlFlow<CloseStatus> {
        match frame {
            Frame::Text(text) => {
                metrics::inc_frames(Direction::Inbound, FrameKind::Text);
                self.on_text(&text, session).await;
                ControlFlow::Continue(())
            }
            Frame::Binary(bytes) => {
                metrics::inc_frames(Direction::Inbound, FrameKind::Binary);
                match compressor.decompress(&bytes) {
                    Ok(payload) => {
                        self.handler.on_binary(Bytes::from(payload)).await;
                        ControlFlow::Continue(())
                    }
                    Err(e) => {
                        metrics::inc_errors(FrameKind::Binary);
                        let error = ConnectorError::from(e);
                        warn!(
                            "dropping session after undecodable payload: bytes={}, error={error}",
                            bytes.len()
                        );
                        ControlFlow::Break(CloseStatus::abnormal())
                    }
                }
            }
            Frame::Close(status) => ControlFlow::Break(
                status.unwrap_or_else(|| CloseStatus::new(NO_STATUS_RECEIVED, "")),
            ),
        }
    }

    async fn on_text(&self, text: &str, session: &SessionAssigner) {
        let context = match MessageContext::from_segment(text) {
            Ok(context) => context,
            Err(e) => {
                metrics::inc_errors(FrameKind::Text);
                warn!("skipping malformed message: bytes={}, error={e}", text.len());
                return;
            }
        };
        if context.command() != Command::Handshake {
            self.handler.on_text(context).await;
            return;
        }
        match context.connection_id() {
            Some(id) if !id.is_empty() => session.assign(ConnectionId::from(id)),
            _ => warn!(
                "handshake acknowledgement without connection id: header={:?}",
                context.header()
            ),
        }
    }
}

#[async_trait]
impl<H: MessageHandler> ReceivePipeline for FrameReceiver<H> {
    async fn run(&self, context: ReceiverContext) {
        let ReceiverContext {
            compressor,
            invocation,
            mut frames,
            closer,
            session,
            generation,
        } = context;
        debug!(
            "receive pipeline started: connector={}, generation={generation}",
            invocation.connector_name()
        );

        let status = loop {
            match frames.next().await {
                Some(Ok(frame)) => {
                    if let ControlFlow::Break(status) =
                        self.on_frame(frame, compressor.as_ref(), &session).await
                    {
                        break status;
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        "receive failed: connector={}, generation={generation}, error={e}",
                        invocation.connector_name()
                    );
                    break CloseStatus::abnormal();
                }
                None => break CloseStatus::abnormal(),
            }
        };

        debug!("receive pipeline ended: generation={generation}, status={status}");
        closer.record(status);
        closer.close();
    }
}
