//! `tokio-tungstenite` implementation of [`Transport`].

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use log::debug;
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderName, HeaderValue},
        protocol::{CloseFrame, Message, WebSocketConfig, frame::coding::CloseCode},
    },
};

use super::{CloseStatus, Frame, NO_STATUS_RECEIVED, Transport, TransportLink};
use crate::{
    error::TransportError,
    invocation::{CONNECTOR_NAME_HEADER, InvocationContext},
};

/// WebSocket transport backed by `tokio-tungstenite`.
///
/// Ping and pong frames are answered by the library and never reach the
/// receive pipeline.
///
/// # Examples
///
/// ```
/// use socketlink::transport::WebSocketTransport;
///
/// let transport = WebSocketTransport::new().nodelay(true);
/// let _ = transport;
/// ```
#[derive(Clone, Debug, Default)]
pub struct WebSocketTransport {
    config: Option<WebSocketConfig>,
    nodelay: bool,
}

impl WebSocketTransport {
    /// Create a transport with the library's default socket configuration.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Override the WebSocket protocol limits (frame and message sizes).
    #[must_use]
    pub fn config(mut self, config: WebSocketConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Disable Nagle's algorithm on the underlying TCP stream.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, context: &InvocationContext) -> Result<TransportLink, TransportError> {
        let request = handshake_request(context)?;
        let (socket, response) = connect_async_with_config(request, self.config, self.nodelay).await?;
        debug!(
            "websocket handshake complete: endpoint={}, status={}",
            context.endpoint(),
            response.status()
        );

        let (sink, stream) = socket.split();
        let sink = sink.with(|frame: Frame| future::ready(Ok::<_, TransportError>(into_message(frame))));
        let stream = stream.filter_map(|item| {
            future::ready(match item {
                Ok(message) => from_message(message).map(Ok),
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });
        Ok(TransportLink::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Build the upgrade request for `context`, carrying the connector name.
pub(crate) fn handshake_request(context: &InvocationContext) -> Result<Request, TransportError> {
    let mut request = context.endpoint().into_client_request()?;
    let name = HeaderName::from_bytes(CONNECTOR_NAME_HEADER.as_bytes())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
    let value = HeaderValue::from_str(context.connector_name())
        .map_err(|e| TransportError::InvalidRequest(format!("connector name: {e}")))?;
    request.headers_mut().insert(name, value);
    Ok(request)
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes),
        Frame::Close(status) => Message::Close(status.map(|status| CloseFrame {
            code: CloseCode::from(status.code()),
            reason: status.reason().to_owned().into(),
        })),
    }
}

fn from_message(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.to_string())),
        Message::Binary(bytes) => Some(Frame::Binary(bytes)),
        Message::Close(frame) => Some(Frame::Close(Some(frame.map_or_else(
            || CloseStatus::new(NO_STATUS_RECEIVED, ""),
            |frame| CloseStatus::new(u16::from(frame.code), frame.reason.to_string()),
        )))),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use rstest::rstest;

    use super::*;

    #[test]
    fn request_carries_connector_name() {
        let ctx = InvocationContext::new("billing", "ws://127.0.0.1:9/hub");
        let request = handshake_request(&ctx).expect("build request");
        assert_eq!(request.uri(), "ws://127.0.0.1:9/hub");
        assert_eq!(
            request
                .headers()
                .get("connectorname")
                .and_then(|v| v.to_str().ok()),
            Some("billing")
        );
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let ctx = InvocationContext::new("billing", "not a uri");
        assert!(handshake_request(&ctx).is_err());
    }

    #[test]
    fn invalid_connector_name_is_rejected() {
        let ctx = InvocationContext::new("bad\nname", "ws://127.0.0.1:9/hub");
        let err = handshake_request(&ctx).expect_err("newline is not a header value");
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[rstest]
    #[case::text(Frame::Text("hi".into()))]
    #[case::binary(Frame::Binary(Bytes::from_static(&[1, 2, 3])))]
    #[case::close(Frame::Close(Some(CloseStatus::normal("bye"))))]
    fn frames_survive_message_mapping(#[case] frame: Frame) {
        assert_eq!(from_message(into_message(frame.clone())), Some(frame));
    }

    #[test]
    fn close_without_status_reports_no_status_code() {
        assert_eq!(
            from_message(Message::Close(None)),
            Some(Frame::Close(Some(CloseStatus::new(NO_STATUS_RECEIVED, ""))))
        );
    }

    #[test]
    fn control_frames_are_dropped() {
        assert_eq!(from_message(Message::Ping(Bytes::new())), None);
        assert_eq!(from_message(Message::Pong(Bytes::new())), None);
    }
}
