//! Endpoint and connector-name resolution.
//!
//! The connector asks its [`InvocationContextProvider`] for a fresh
//! [`InvocationContext`] on every handshake attempt, so providers may rotate
//! endpoints or fail over between hubs without the connector caching a stale
//! address.

/// Handshake header carrying the connector name.
pub const CONNECTOR_NAME_HEADER: &str = "ConnectorName";

/// Endpoint and identity used for one handshake attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationContext {
    connector_name: String,
    endpoint: String,
}

impl InvocationContext {
    /// Create a context for `connector_name` targeting `endpoint`.
    ///
    /// # Examples
    ///
    /// ```
    /// use socketlink::InvocationContext;
    ///
    /// let ctx = InvocationContext::new("billing", "ws://127.0.0.1:7000/hub");
    /// assert_eq!(ctx.connector_name(), "billing");
    /// ```
    #[must_use]
    pub fn new(connector_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            connector_name: connector_name.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Stable name the hub uses to recognise this connector.
    #[must_use]
    pub fn connector_name(&self) -> &str { &self.connector_name }

    /// WebSocket URI of the hub.
    #[must_use]
    pub fn endpoint(&self) -> &str { &self.endpoint }
}

/// Strategy supplying the [`InvocationContext`] for each handshake attempt.
///
/// Closures returning an [`InvocationContext`] implement this trait, which
/// keeps simple configurations free of boilerplate types.
#[cfg_attr(test, mockall::automock)]
pub trait InvocationContextProvider: Send + Sync {
    /// Return the context for the next handshake attempt.
    fn invocation_context(&self) -> InvocationContext;
}

impl<F> InvocationContextProvider for F
where
    F: Fn() -> InvocationContext + Send + Sync,
{
    fn invocation_context(&self) -> InvocationContext { self() }
}

/// Provider that always returns the same context.
#[derive(Clone, Debug)]
pub struct StaticInvocationContext(InvocationContext);

impl StaticInvocationContext {
    /// Wrap a fixed context.
    #[must_use]
    pub fn new(context: InvocationContext) -> Self { Self(context) }
}

impl From<InvocationContext> for StaticInvocationContext {
    fn from(context: InvocationContext) -> Self { Self(context) }
}

impl InvocationContextProvider for StaticInvocationContext {
    fn invocation_context(&self) -> InvocationContext { self.0.clone() }
}
