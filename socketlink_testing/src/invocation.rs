//! Invocation context provider that counts its calls.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use socketlink::{InvocationContext, InvocationContextProvider};

/// Provider returning a distinct endpoint for every handshake attempt.
///
/// The n-th call (starting at 1) returns `ws://hub.test/socket/<n>`. Clones
/// share the call counter.
#[derive(Clone, Debug)]
pub struct CountingContext {
    connector_name: String,
    calls: Arc<AtomicUsize>,
}

impl CountingContext {
    /// Create a provider for `connector_name`.
    pub fn new(connector_name: impl Into<String>) -> Self {
        Self {
            connector_name: connector_name.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of contexts handed out so far.
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl InvocationContextProvider for CountingContext {
    fn invocation_context(&self) -> InvocationContext {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        InvocationContext::new(
            self.connector_name.clone(),
            format!("ws://hub.test/socket/{n}"),
        )
    }
}
