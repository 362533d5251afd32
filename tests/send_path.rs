//! Tests for outbound sends, session header injection and local close.

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use socketlink::{
    CONNECTION_ID_KEY,
    Command,
    ConnectionId,
    ConnectionState,
    Connector,
    ConnectorError,
    MessageContext,
    compression::{Compressor, GzipCompressor},
    transport::{CloseStatus, Frame},
};
use socketlink_testing::{
    Attempt,
    CountingContext,
    HubPeer,
    ScriptedTransport,
    wait_for,
    wait_for_connection_id,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Session {
    connector: Connector,
    transport: ScriptedTransport,
    peer: HubPeer,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), ConnectorError>>,
}

impl Session {
    async fn shutdown(self) {
        self.cancel.cancel();
        self.peer.close(CloseStatus::normal("shutdown"));
        self.task
            .await
            .expect("connect task")
            .expect("clean stop");
    }
}

/// Open a session and let the hub assign `c-1`.
#[fixture]
async fn session() -> Session {
    let transport = ScriptedTransport::new([Attempt::Accept]);
    let connector = Connector::builder(CountingContext::new("billing"))
        .transport(transport.clone())
        .build();
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let connector = connector.clone();
        let cancel = cancel.clone();
        async move { connector.connect(cancel).await }
    });
    let peer = transport.next_peer().await;
    peer.send_handshake("c-1");
    assert_eq!(
        wait_for_connection_id(&connector).await,
        ConnectionId::from("c-1")
    );
    Session {
        connector,
        transport,
        peer,
        cancel,
        task,
    }
}

fn parse(frame: Option<Frame>) -> Value {
    match frame {
        Some(Frame::Text(text)) => serde_json::from_str(&text).expect("valid json"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn session_id_is_injected(#[future] session: Session) {
    let mut s = session.await;

    s.connector
        .send_text(MessageContext::new(Command::DataSend, json!({"order": 7})))
        .await
        .expect("send");

    let raw = parse(s.peer.recv().await);
    assert_eq!(raw["Header"][CONNECTION_ID_KEY], json!("c-1"));
    assert_eq!(raw["Command"], json!(2));
    assert_eq!(raw["Value"], json!({"order": 7}));
    s.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn caller_connection_id_is_preserved(#[future] session: Session) {
    let mut s = session.await;

    let ctx = MessageContext::new(Command::DataSend, Value::Null)
        .with_header(CONNECTION_ID_KEY, json!("relay-9"));
    s.connector.send_text(ctx).await.expect("send");

    let raw = parse(s.peer.recv().await);
    assert_eq!(raw["Header"][CONNECTION_ID_KEY], json!("relay-9"));
    s.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn empty_caller_connection_id_is_rejected(#[future] session: Session) {
    let s = session.await;

    let ctx = MessageContext::new(Command::DataSend, Value::Null)
        .with_header(CONNECTION_ID_KEY, json!(""));
    let err = s.connector.send_text(ctx).await.expect_err("empty id");

    assert!(matches!(err, ConnectorError::InvalidSessionHeader));
    s.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn frames_leave_in_send_order(#[future] session: Session) {
    let mut s = session.await;

    for n in 0..5 {
        s.connector
            .send_text(MessageContext::new(Command::DataSend, json!(n)))
            .await
            .expect("send");
    }

    for n in 0..5 {
        assert_eq!(parse(s.peer.recv().await)["Value"], json!(n));
    }
    s.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn binary_payload_is_compressed(#[future] session: Session) {
    let mut s = session.await;
    let payload = vec![7u8; 4096];

    s.connector.send_binary(&payload).await.expect("send");

    let Some(Frame::Binary(bytes)) = s.peer.recv().await else {
        panic!("expected a binary frame");
    };
    assert!(bytes.len() < payload.len(), "payload should be compressed");
    let unpacked = GzipCompressor::default()
        .decompress(&bytes)
        .expect("peer decompresses");
    assert_eq!(unpacked, payload);
    s.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn close_sends_reason_and_blocks_further_sends(#[future] session: Session) {
    let mut s = session.await;

    s.connector.close("done").expect("close");
    assert_eq!(s.connector.state(), ConnectionState::Closing);
    assert_eq!(
        s.peer.recv().await,
        Some(Frame::Close(Some(CloseStatus::normal("done"))))
    );
    s.connector.wait_for_close_tasks().await;
    assert!(matches!(
        s.connector.send_binary(b"late").await,
        Err(ConnectorError::NotConnected)
    ));
    assert!(matches!(
        s.connector.close("again"),
        Err(ConnectorError::NotConnected)
    ));
    s.shutdown().await;
}

#[tokio::test]
async fn sends_wait_for_the_first_session() {
    let transport = ScriptedTransport::new(Vec::<Attempt>::new());
    let connector = Connector::builder(CountingContext::new("billing"))
        .transport(transport.clone())
        .build();

    assert!(matches!(
        connector.send_binary(b"early").await,
        Err(ConnectorError::NotConnected)
    ));
    assert!(matches!(
        connector
            .send_text(MessageContext::new(Command::DataSend, Value::Null))
            .await,
        Err(ConnectorError::NotConnected)
    ));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn text_before_handshake_ack_is_pending() {
    let transport = ScriptedTransport::new([Attempt::Accept]);
    let connector = Connector::builder(CountingContext::new("billing"))
        .transport(transport.clone())
        .build();
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let connector = connector.clone();
        let cancel = cancel.clone();
        async move { connector.connect(cancel).await }
    });
    let peer = transport.next_peer().await;
    wait_for(|| connector.state() == ConnectionState::Open).await;

    let err = connector
        .send_text(MessageContext::new(Command::DataSend, Value::Null))
        .await
        .expect_err("no id assigned yet");
    assert!(matches!(err, ConnectorError::SessionPending));
    connector.send_binary(b"binary needs no id").await.expect("send binary");

    cancel.cancel();
    peer.close(CloseStatus::normal("shutdown"));
    task.await.expect("connect task").expect("clean stop");
}

#[rstest]
#[tokio::test]
async fn connection_id_is_reset_on_reconnect(#[future] session: Session) {
    let s = session.await;
    s.transport.push(Attempt::Accept);

    s.peer.close(CloseStatus::new(4000, "maintenance"));
    let mut second = s.transport.next_peer().await;
    wait_for(|| s.connector.state() == ConnectionState::Open).await;

    assert_eq!(s.connector.connection_id(), None);
    second.send_handshake("c-2");
    assert_eq!(
        wait_for_connection_id(&s.connector).await,
        ConnectionId::from("c-2")
    );
    s.connector
        .send_text(MessageContext::new(Command::DataSend, Value::Null))
        .await
        .expect("send");
    assert_eq!(
        parse(second.recv().await)["Header"][CONNECTION_ID_KEY],
        json!("c-2")
    );

    s.cancel.cancel();
    second.close(CloseStatus::normal("shutdown"));
    s.task.await.expect("connect task").expect("clean stop");
}
