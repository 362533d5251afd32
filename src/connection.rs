//! Connection handle and its lifecycle state.
//!
//! The connector owns exactly one [`ConnectionHandle`] at a time. A fresh
//! handle is created for every handshake attempt and discarded once it fails
//! or closes; handles are never reused.
//!
//! ```text
//! Connecting ──► Open ──► Closing ──► Closed
//!      │                     ▲
//!      ▼                     └── (remote close, stream end)
//!    Failed
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::SinkExt;
use log::{debug, warn};
use tokio_util::task::TaskTracker;

use crate::{
    error::ConnectorError,
    transport::{CloseStatus, Frame, FrameSink},
};

/// Lifecycle state of the connector's current connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No handle has been created yet.
    Idle,
    /// A handshake attempt is in progress.
    Connecting,
    /// The handshake succeeded; sends are accepted.
    Open,
    /// A close handshake has been issued.
    Closing,
    /// The session has ended.
    Closed,
    /// The handshake attempt failed.
    Failed,
}

struct Lifecycle {
    state: ConnectionState,
    close_status: Option<CloseStatus>,
}

/// The live socket resource for one handshake attempt.
pub(crate) struct ConnectionHandle {
    generation: u64,
    lifecycle: Mutex<Lifecycle>,
    sink: tokio::sync::Mutex<Option<FrameSink>>,
}

impl ConnectionHandle {
    /// Create a handle for a new handshake attempt.
    pub(crate) fn connecting(generation: u64) -> Self {
        Self {
            generation,
            lifecycle: Mutex::new(Lifecycle {
                state: ConnectionState::Connecting,
                close_status: None,
            }),
            sink: tokio::sync::Mutex::new(None),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn generation(&self) -> u64 { self.generation }

    pub(crate) fn state(&self) -> ConnectionState { self.lifecycle().state }

    pub(crate) fn close_status(&self) -> Option<CloseStatus> { self.lifecycle().close_status.clone() }

    /// Attach the outbound sink and accept sends.
    pub(crate) async fn open(&self, sink: FrameSink) {
        *self.sink.lock().await = Some(sink);
        self.lifecycle().state = ConnectionState::Open;
    }

    pub(crate) fn mark_failed(&self) { self.lifecycle().state = ConnectionState::Failed; }

    pub(crate) fn mark_closed(&self) { self.lifecycle().state = ConnectionState::Closed; }

    /// Record why the session ended. The first recorded status wins.
    pub(crate) fn record_close(&self, status: CloseStatus) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.close_status.is_none() {
            lifecycle.close_status = Some(status);
        }
    }

    /// Send one complete frame.
    ///
    /// Frames are written in the order callers acquire the sink.
    pub(crate) async fn send(&self, frame: Frame) -> Result<(), ConnectorError> {
        if self.state() != ConnectionState::Open {
            return Err(ConnectorError::NotConnected);
        }
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(ConnectorError::NotConnected)?;
        sink.send(frame).await?;
        Ok(())
    }

    /// Issue a close handshake without waiting for it to complete.
    ///
    /// The close frame is written from a task tracked by `tracker`; failures
    /// are logged. Returns `false` if the handle was not open.
    pub(crate) fn begin_close(
        self: &Arc<Self>,
        status: CloseStatus,
        tracker: &TaskTracker,
    ) -> bool {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.state != ConnectionState::Open {
                return false;
            }
            lifecycle.state = ConnectionState::Closing;
            if lifecycle.close_status.is_none() {
                lifecycle.close_status = Some(status.clone());
            }
        }

        let handle = self.clone();
        tracker.spawn(async move {
            let mut sink = handle.sink.lock().await;
            let Some(sink) = sink.as_mut() else {
                return;
            };
            let result = match sink.send(Frame::Close(Some(status.clone()))).await {
                Ok(()) => sink.close().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => debug!(
                    "close handshake sent: generation={}, status={status}",
                    handle.generation
                ),
                Err(e) => warn!(
                    "close handshake failed: generation={}, status={status}, error={e}",
                    handle.generation
                ),
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::{StreamExt, channel::mpsc};
    use log::Level;
    use rstest::{fixture, rstest};
    use serial_test::serial;
    use socketlink_testing::{LoggerHandle, logger};

    use super::*;
    use crate::error::TransportError;

    type Outbound = mpsc::UnboundedReceiver<Frame>;

    fn sink_pair() -> (FrameSink, Outbound) {
        let (tx, rx) = mpsc::unbounded();
        (Box::pin(tx.sink_map_err(|_| TransportError::Disconnected)), rx)
    }

    #[fixture]
    fn open_handle() -> (Arc<ConnectionHandle>, Outbound) {
        let handle = Arc::new(ConnectionHandle::connecting(7));
        let (sink, rx) = sink_pair();
        futures::executor::block_on(handle.open(sink));
        (handle, rx)
    }

    #[tokio::test]
    async fn connecting_handle_rejects_sends() {
        let handle = ConnectionHandle::connecting(1);
        assert_eq!(handle.state(), ConnectionState::Connecting);
        let err = handle
            .send(Frame::Text("early".into()))
            .await
            .expect_err("send before open must fail");
        assert!(matches!(err, ConnectorError::NotConnected));
    }

    #[rstest]
    #[tokio::test]
    async fn open_handle_forwards_frames_in_order(open_handle: (Arc<ConnectionHandle>, Outbound)) {
        let (handle, mut rx) = open_handle;
        handle.send(Frame::Text("one".into())).await.expect("send one");
        handle
            .send(Frame::Binary(Bytes::from_static(b"two")))
            .await
            .expect("send two");

        assert_eq!(rx.next().await, Some(Frame::Text("one".into())));
        assert_eq!(rx.next().await, Some(Frame::Binary(Bytes::from_static(b"two"))));
    }

    #[rstest]
    #[tokio::test]
    async fn begin_close_sends_close_frame_and_blocks_sends(
        open_handle: (Arc<ConnectionHandle>, Outbound),
    ) {
        let (handle, mut rx) = open_handle;
        let tracker = TaskTracker::new();

        assert!(handle.begin_close(CloseStatus::normal("done"), &tracker));
        assert_eq!(handle.state(), ConnectionState::Closing);
        assert!(!handle.begin_close(CloseStatus::normal("again"), &tracker));

        tracker.close();
        tracker.wait().await;

        assert_eq!(rx.next().await, Some(Frame::Close(Some(CloseStatus::normal("done")))));
        assert_eq!(rx.next().await, None, "sink should be closed after the close frame");
        assert!(matches!(
            handle.send(Frame::Text("late".into())).await,
            Err(ConnectorError::NotConnected)
        ));
    }

    #[test]
    fn first_close_status_wins() {
        let handle = ConnectionHandle::connecting(3);
        handle.record_close(CloseStatus::new(4000, "remote"));
        handle.record_close(CloseStatus::normal("local"));
        assert_eq!(handle.close_status(), Some(CloseStatus::new(4000, "remote")));
    }

    #[rstest]
    #[tokio::test]
    async fn send_failure_surfaces_transport_error(open_handle: (Arc<ConnectionHandle>, Outbound)) {
        let (handle, rx) = open_handle;
        drop(rx);
        let err = handle
            .send(Frame::Text("lost".into()))
            .await
            .expect_err("send to dropped peer must fail");
        assert!(matches!(err, ConnectorError::Transport(TransportError::Disconnected)));
    }

    #[rstest]
    #[serial(connector_logs)]
    #[tokio::test]
    async fn failed_close_handshake_is_logged(mut logger: LoggerHandle) {
        logger.clear();
        let handle = Arc::new(ConnectionHandle::connecting(41));
        let (sink, rx) = sink_pair();
        handle.open(sink).await;
        drop(rx);
        let tracker = TaskTracker::new();

        assert!(handle.begin_close(CloseStatus::normal("x"), &tracker));
        tracker.close();
        tracker.wait().await;

        let failures = logger.drain_matching("close handshake failed: generation=41");
        assert_eq!(failures.len(), 1, "{failures:?}");
        assert_eq!(failures[0].0, Level::Warn);
        assert!(failures[0].1.contains("status="), "{}", failures[0].1);
    }
}
