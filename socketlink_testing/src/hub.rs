//! Scripted in-memory transport and the simulated hub end of each link.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, channel::mpsc as link, future};
use serde_json::{Value, json};
use socketlink::{
    CONNECTION_ID_KEY,
    Command,
    InvocationContext,
    MessageContext,
    TransportError,
    transport::{CloseStatus, Frame, Transport, TransportLink},
};
use tokio::sync::mpsc;

/// Outcome of one scripted handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// Refuse the handshake.
    Fail,
    /// Accept the handshake and hand a [`HubPeer`] to the test.
    Accept,
}

/// Transport that plays back a script of handshake outcomes.
///
/// Once the script is exhausted, further handshakes never complete, which
/// leaves the connector waiting for cancellation. Clones share the script.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

struct Inner {
    script: Mutex<VecDeque<Attempt>>,
    contexts: Mutex<Vec<InvocationContext>>,
    peers_tx: mpsc::UnboundedSender<HubPeer>,
    peers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<HubPeer>>,
}

impl ScriptedTransport {
    /// Create a transport playing back `script`.
    pub fn new(script: impl IntoIterator<Item = Attempt>) -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(script.into_iter().collect()),
                contexts: Mutex::new(Vec::new()),
                peers_tx,
                peers_rx: tokio::sync::Mutex::new(peers_rx),
            }),
        }
    }

    /// Append an outcome to the script.
    pub fn push(&self, attempt: Attempt) {
        self.inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(attempt);
    }

    /// Invocation contexts of every handshake attempted so far.
    pub fn contexts(&self) -> Vec<InvocationContext> {
        self.inner
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of handshakes attempted so far.
    pub fn attempts(&self) -> usize {
        self.inner
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for the hub end of the next accepted handshake.
    ///
    /// # Panics
    ///
    /// Panics if no handshake is accepted within five seconds.
    pub async fn next_peer(&self) -> HubPeer {
        let mut peers = self.inner.peers_rx.lock().await;
        tokio::time::timeout(Duration::from_secs(5), peers.recv())
            .await
            .expect("timed out waiting for an accepted handshake")
            .expect("transport dropped")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, context: &InvocationContext) -> Result<TransportLink, TransportError> {
        self.inner
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(context.clone());
        let next = self
            .inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Attempt::Fail) => Err(TransportError::Other("scripted refusal".into())),
            Some(Attempt::Accept) => {
                let (to_client, from_hub) = link::unbounded();
                let (to_hub, from_client) = link::unbounded();
                let peer = HubPeer {
                    tx: to_client,
                    rx: from_client,
                    context: context.clone(),
                };
                self.inner
                    .peers_tx
                    .send(peer)
                    .map_err(|_| TransportError::Disconnected)?;
                let sink = to_hub.sink_map_err(|_| TransportError::Disconnected);
                Ok(TransportLink::new(Box::pin(sink), Box::pin(from_hub)))
            }
            None => future::pending().await,
        }
    }
}

/// The hub's end of one accepted link.
pub struct HubPeer {
    tx: link::UnboundedSender<Result<Frame, TransportError>>,
    rx: link::UnboundedReceiver<Frame>,
    context: InvocationContext,
}

impl HubPeer {
    /// Invocation context the connector used for this handshake.
    pub fn context(&self) -> &InvocationContext { &self.context }

    /// Deliver `frame` to the connector. Returns `false` once the connector
    /// has dropped its end.
    pub fn send(&self, frame: Frame) -> bool { self.tx.unbounded_send(Ok(frame)).is_ok() }

    /// Deliver `context` as a text frame.
    pub fn send_message(&self, context: &MessageContext) -> bool {
        self.send(Frame::Text(context.to_segment().expect("serialize context")))
    }

    /// Acknowledge the handshake, assigning `connection_id` to the session.
    pub fn send_handshake(&self, connection_id: &str) -> bool {
        let ack = MessageContext::new(Command::Handshake, Value::Null)
            .with_header(CONNECTION_ID_KEY, json!(connection_id));
        self.send_message(&ack)
    }

    /// Send a close frame and stop delivering frames.
    pub fn close(&self, status: CloseStatus) {
        let _ = self.send(Frame::Close(Some(status)));
        self.tx.close_channel();
    }

    /// Fail the connector's inbound stream with `error`.
    pub fn fail(&self, error: TransportError) { let _ = self.tx.unbounded_send(Err(error)); }

    /// Next frame written by the connector, or `None` once it closed its
    /// sink.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within five seconds.
    pub async fn recv(&mut self) -> Option<Frame> {
        tokio::time::timeout(Duration::from_secs(5), self.rx.next())
            .await
            .expect("timed out waiting for a frame from the connector")
    }
}

impl std::fmt::Debug for HubPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubPeer")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
