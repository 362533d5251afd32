//! Message handler that forwards everything it receives to the test.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use socketlink::{MessageContext, MessageHandler};
use tokio::sync::mpsc;

/// [`MessageHandler`] forwarding each message to a [`Recorded`] receiver.
#[derive(Clone, Debug)]
pub struct RecordingHandler {
    texts: mpsc::UnboundedSender<MessageContext>,
    binaries: mpsc::UnboundedSender<Bytes>,
}

/// Receiving end of a [`RecordingHandler`].
#[derive(Debug)]
pub struct Recorded {
    texts: mpsc::UnboundedReceiver<MessageContext>,
    binaries: mpsc::UnboundedReceiver<Bytes>,
}

impl RecordingHandler {
    /// Create a handler and the receiver observing it.
    pub fn new() -> (Self, Recorded) {
        let (texts, texts_rx) = mpsc::unbounded_channel();
        let (binaries, binaries_rx) = mpsc::unbounded_channel();
        (
            Self { texts, binaries },
            Recorded {
                texts: texts_rx,
                binaries: binaries_rx,
            },
        )
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn on_text(&self, context: MessageContext) { let _ = self.texts.send(context); }

    async fn on_binary(&self, payload: Bytes) { let _ = self.binaries.send(payload); }
}

impl Recorded {
    /// Next text message handed to the handler.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within five seconds.
    pub async fn text(&mut self) -> MessageContext {
        tokio::time::timeout(Duration::from_secs(5), self.texts.recv())
            .await
            .expect("timed out waiting for a text message")
            .expect("handler dropped")
    }

    /// Next binary payload handed to the handler.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within five seconds.
    pub async fn binary(&mut self) -> Bytes {
        tokio::time::timeout(Duration::from_secs(5), self.binaries.recv())
            .await
            .expect("timed out waiting for a binary payload")
            .expect("handler dropped")
    }

    /// Return true if no binary payload has been recorded and not yet read.
    pub fn no_pending_binary(&mut self) -> bool { self.binaries.try_recv().is_err() }
}
