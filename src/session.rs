//! Session identity assigned by the hub.
//!
//! The hub acknowledges each handshake with a [`ConnectionId`]. The receive
//! pipeline is the only writer: it publishes the identifier through a
//! [`SessionAssigner`], and the connector reads it when injecting headers.
//! Readers may also [`subscribe`](SessionSlot::subscribe) to observe
//! assignments as they happen.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use log::debug;
use tokio::sync::watch;

/// Identifier the hub assigned to the current session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    /// Return true if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self { Self(value) }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Shared cell holding the current session's [`ConnectionId`].
///
/// The slot also tracks which session generation may write it, so an
/// assigner that outlives its session cannot overwrite its successor's id.
#[derive(Clone, Debug)]
pub(crate) struct SessionSlot(Arc<SlotInner>);

#[derive(Debug)]
struct SlotInner {
    id: watch::Sender<Option<ConnectionId>>,
    generation: AtomicU64,
}

impl SessionSlot {
    pub(crate) fn new() -> Self {
        let (id, _rx) = watch::channel(None);
        Self(Arc::new(SlotInner {
            id,
            generation: AtomicU64::new(0),
        }))
    }

    /// Identifier of the current session, if one has been assigned.
    pub(crate) fn current(&self) -> Option<ConnectionId> { self.0.id.borrow().clone() }

    /// Observe future assignments.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<ConnectionId>> {
        self.0.id.subscribe()
    }

    /// Hand the slot to session `generation` and forget the previous id.
    pub(crate) fn begin(&self, generation: u64) {
        self.0.generation.store(generation, Ordering::Release);
        self.0.id.send_replace(None);
    }

    /// Writer handed to the receive pipeline of a single session.
    pub(crate) fn assigner(&self, generation: u64) -> SessionAssigner {
        SessionAssigner {
            slot: self.clone(),
            generation,
        }
    }
}

/// Write capability for the session identifier, owned by a receive pipeline.
///
/// An assigner is bound to one session. Once the connector has moved on to a
/// newer session its assignments are ignored.
#[derive(Debug)]
pub struct SessionAssigner {
    slot: SessionSlot,
    generation: u64,
}

impl SessionAssigner {
    /// Publish the identifier the hub assigned to this session.
    ///
    /// Empty identifiers are ignored: an empty id can never be injected into
    /// outbound headers. Assignments from a session that is no longer
    /// current are ignored too.
    pub fn assign(&self, id: ConnectionId) {
        if id.is_empty() {
            debug!("ignoring empty connection id: generation={}", self.generation);
            return;
        }
        let inner = &self.slot.0;
        let written = inner.id.send_if_modified(|current| {
            if inner.generation.load(Ordering::Acquire) != self.generation {
                return false;
            }
            *current = Some(id.clone());
            true
        });
        if written {
            debug!(
                "connection id assigned: connection_id={id}, generation={}",
                self.generation
            );
        } else {
            debug!(
                "ignoring connection id from stale session: connection_id={id}, generation={}",
                self.generation
            );
        }
    }
}
