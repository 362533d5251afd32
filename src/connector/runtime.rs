//! Connect/retry loop.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use log::{debug, info, warn};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{
    Connector,
    tracing_helpers::{connect_span, emit_timing_event, start_timer},
};
use crate::{
    connection::ConnectionHandle,
    error::ConnectorError,
    invocation::InvocationContext,
    metrics,
    receiver::{CloseCallback, RECEIVER_CLOSE_REASON, ReceiverContext},
    transport::{CloseStatus, FrameStream},
};

/// Marks the connector as driven by a connect loop until dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(running))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

/// Connection that completed its handshake and awaits a receive pipeline.
struct Session {
    handle: Arc<ConnectionHandle>,
    invocation: InvocationContext,
    frames: FrameStream,
}

impl Connector {
    /// Keep a session with the hub alive until `cancel` fires.
    ///
    /// Each iteration requests a fresh [`InvocationContext`], retries the
    /// handshake until it succeeds, then runs the receive pipeline until the
    /// session ends. Failed handshakes are logged and retried, immediately
    /// unless a [`BackoffConfig`](super::BackoffConfig) is configured.
    ///
    /// Cancellation aborts a pending handshake or back-off sleep. It does
    /// not interrupt a running receive pipeline; the loop stops once that
    /// session ends.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::AlreadyRunning`] if another task is already
    /// driving this connector (or one of its clones), and
    /// [`ConnectorError::ConnectionAbandoned`] if `cancel` fires before any
    /// session was established.
    pub async fn connect(&self, cancel: CancellationToken) -> Result<(), ConnectorError> {
        let Some(_running) = RunGuard::acquire(&self.shared.running) else {
            warn!("connect loop already running; rejecting second caller");
            return Err(ConnectorError::AlreadyRunning);
        };
        let mut sessions: u64 = 0;
        while let Some(session) = self.establish(&cancel).await {
            sessions += 1;
            self.run_session(session).await;
        }
        if sessions == 0 {
            info!("connect cancelled before any session was established");
            return Err(ConnectorError::ConnectionAbandoned);
        }
        debug!("connect loop stopped: sessions={sessions}");
        Ok(())
    }

    /// Retry the handshake until it succeeds. Returns `None` only when
    /// `cancel` fires.
    async fn establish(&self, cancel: &CancellationToken) -> Option<Session> {
        let backoff = self.shared.backoff;
        let mut delay = backoff.map(|cfg| cfg.initial_delay);
        let mut attempt: u64 = 0;

        while !cancel.is_cancelled() {
            attempt += 1;
            let handle = Arc::new(ConnectionHandle::connecting(self.next_generation()));
            self.install(handle.clone());
            let invocation = self.shared.provider.invocation_context();
            self.remember(&invocation);

            let span = connect_span(
                &self.shared.tracing_config,
                invocation.connector_name(),
                invocation.endpoint(),
                attempt,
            );
            let start = start_timer(self.shared.tracing_config.connect_timing);
            metrics::inc_handshake_attempts();
            let outcome = select! {
                biased;

                () = cancel.cancelled() => None,
                res = self.shared.transport.connect(&invocation).instrument(span.clone()) => Some(res),
            };
            span.in_scope(|| emit_timing_event(start));

            match outcome {
                None => {
                    span.record("result", "cancelled");
                    handle.mark_failed();
                    return None;
                }
                Some(Ok(link)) => {
                    span.record("result", "open");
                    let (sink, frames) = link.into_parts();
                    self.shared.session.begin(handle.generation());
                    handle.open(sink).await;
                    metrics::inc_connections();
                    info!(
                        "connection open: connector={}, endpoint={}, generation={}, attempt={attempt}",
                        invocation.connector_name(),
                        invocation.endpoint(),
                        handle.generation()
                    );
                    return Some(Session {
                        handle,
                        invocation,
                        frames,
                    });
                }
                Some(Err(source)) => {
                    span.record("result", "failed");
                    handle.mark_failed();
                    metrics::inc_handshake_failures();
                    let error = ConnectorError::HandshakeFailed {
                        endpoint: invocation.endpoint().to_owned(),
                        source,
                    };
                    warn!(
                        "connect attempt failed: connector={}, attempt={attempt}, error={error}",
                        invocation.connector_name()
                    );
                    if let (Some(cfg), Some(current)) = (backoff, delay) {
                        select! {
                            biased;

                            () = cancel.cancelled() => return None,
                            () = sleep(current) => {}
                        }
                        delay = Some(cfg.next_delay(current));
                    }
                }
            }
        }
        None
    }

    /// Run the receive pipeline for `session` and retire its handle.
    async fn run_session(&self, session: Session) {
        let Session {
            handle,
            invocation,
            frames,
        } = session;
        let generation = handle.generation();
        let context = ReceiverContext {
            compressor: self.shared.compressor.clone(),
            invocation: invocation.clone(),
            frames,
            closer: CloseCallback::new(handle.clone(), self.shared.close_tasks.clone()),
            session: self.shared.session.assigner(generation),
            generation,
        };

        self.shared.pipeline.run(context).await;

        handle.record_close(CloseStatus::abnormal());
        if handle.begin_close(
            CloseStatus::normal(RECEIVER_CLOSE_REASON),
            &self.shared.close_tasks,
        ) {
            debug!("receive pipeline returned without closing: generation={generation}");
        }
        handle.mark_closed();
        metrics::dec_connections();
        metrics::inc_reconnects();

        let status = handle.close_status().unwrap_or_else(CloseStatus::abnormal);
        info!(
            "session ended: connector={}, generation={generation}, status={status}",
            invocation.connector_name()
        );
    }
}
