//! Tracing configuration for connector operations.
//!
//! [`TracingConfig`] controls the level of the spans emitted around connect
//! attempts, sends and closes, and whether per-operation elapsed-time events
//! are recorded.

use tracing::Level;

/// Controls tracing span levels and per-operation timing for the connector.
///
/// By default, lifecycle operations (connect attempts, `close`) emit spans
/// at `INFO` level and sends emit spans at `DEBUG` level. Timing is disabled
/// for all operations by default.
///
/// Spans are always created at the configured level. When no `tracing`
/// subscriber is installed, span creation is a no-op. When timing is enabled
/// for an operation, an additional event recording `elapsed_us` is emitted
/// when the operation completes.
///
/// # Examples
///
/// ```
/// use socketlink::TracingConfig;
/// use tracing::Level;
///
/// let config = TracingConfig::default()
///     .with_connect_timing(true)
///     .with_send_level(Level::TRACE);
/// let _ = config;
/// ```
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub(crate) connect_level: Level,
    pub(crate) send_level: Level,
    pub(crate) close_level: Level,
    pub(crate) connect_timing: bool,
    pub(crate) send_timing: bool,
    pub(crate) close_timing: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            connect_level: Level::INFO,
            send_level: Level::DEBUG,
            close_level: Level::INFO,
            connect_timing: false,
            send_timing: false,
            close_timing: false,
        }
    }
}

impl TracingConfig {
    /// Set the tracing level for handshake attempts.
    #[must_use]
    pub fn with_connect_level(mut self, level: Level) -> Self {
        self.connect_level = level;
        self
    }

    /// Enable or disable timing for handshake attempts.
    ///
    /// When enabled, an event recording `elapsed_us` is emitted at `DEBUG`
    /// level when the attempt completes, whether it succeeded or not.
    #[must_use]
    pub fn with_connect_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self
    }

    /// Set the tracing level for `send_text` and `send_binary`.
    #[must_use]
    pub fn with_send_level(mut self, level: Level) -> Self {
        self.send_level = level;
        self
    }

    /// Enable or disable timing for `send_text` and `send_binary`.
    #[must_use]
    pub fn with_send_timing(mut self, enabled: bool) -> Self {
        self.send_timing = enabled;
        self
    }

    /// Set the tracing level for `close`.
    #[must_use]
    pub fn with_close_level(mut self, level: Level) -> Self {
        self.close_level = level;
        self
    }

    /// Enable or disable timing for `close`.
    #[must_use]
    pub fn with_close_timing(mut self, enabled: bool) -> Self {
        self.close_timing = enabled;
        self
    }

    /// Set the tracing level for all operations at once.
    #[must_use]
    pub fn with_all_levels(mut self, level: Level) -> Self {
        self.connect_level = level;
        self.send_level = level;
        self.close_level = level;
        self
    }

    /// Enable or disable timing for all operations at once.
    ///
    /// # Examples
    ///
    /// ```
    /// use socketlink::TracingConfig;
    ///
    /// let config = TracingConfig::default().with_all_timing(true);
    /// let _ = config;
    /// ```
    #[must_use]
    pub fn with_all_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self.send_timing = enabled;
        self.close_timing = enabled;
        self
    }
}
