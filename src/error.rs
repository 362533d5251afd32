//! Canonical error types for the crate.
//!
//! [`ConnectorError`] is the surface returned by [`Connector`](crate::Connector)
//! operations. Transport and compression failures have their own types so the
//! [`Transport`](crate::transport::Transport) and
//! [`Compressor`](crate::compression::Compressor) seams can be implemented
//! without depending on the connector.

use std::error::Error as StdError;

/// Boxed error used for opaque transport and serializer sources.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors emitted by the transport seam.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The handshake request could not be built from the invocation context.
    #[error("invalid handshake request: {0}")]
    InvalidRequest(String),
    /// The WebSocket handshake or an established socket failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// The peer went away before the operation completed.
    #[error("connection closed by peer")]
    Disconnected,
    /// Any other transport-specific failure.
    #[error("transport error: {0}")]
    Other(#[source] BoxError),
}

/// Errors emitted by a [`Compressor`](crate::compression::Compressor).
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// Compressing an outbound payload failed.
    #[error("failed to compress payload: {0}")]
    Compress(#[source] std::io::Error),
    /// The inbound payload was not valid compressed data.
    #[error("failed to decompress payload: {0}")]
    Decompress(#[source] std::io::Error),
}

/// Errors emitted by [`Connector`](crate::Connector) operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// A handshake attempt failed. The connect loop absorbs this kind; it is
    /// only observable through logs and metrics.
    #[error("handshake with {endpoint} failed: {source}")]
    HandshakeFailed {
        /// Endpoint the attempt targeted.
        endpoint: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },
    /// Another task is already driving this connector's connect loop.
    #[error("connect loop is already running for this connector")]
    AlreadyRunning,
    /// The cancellation signal fired before any session was established.
    #[error("connection abandoned before a session was established")]
    ConnectionAbandoned,
    /// The message context could not be framed.
    #[error("invalid message context: {0}")]
    InvalidArgument(#[source] serde_json::Error),
    /// The caller supplied a `ConnectionId` header that is empty or not a
    /// string.
    #[error("message header carries an empty or non-string ConnectionId")]
    InvalidSessionHeader,
    /// No connection id has been assigned by the hub for the open session.
    #[error("no connection id has been assigned to the session yet")]
    SessionPending,
    /// No open connection is available for the operation.
    #[error("connector has no open connection")]
    NotConnected,
    /// An inbound binary payload failed to decompress.
    #[error(transparent)]
    DecompressionFailed(CompressionError),
    /// An outbound binary payload failed to compress.
    #[error(transparent)]
    CompressionFailed(CompressionError),
    /// Writing to the open connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<CompressionError> for ConnectorError {
    fn from(error: CompressionError) -> Self {
        match error {
            CompressionError::Compress(_) => Self::CompressionFailed(error),
            CompressionError::Decompress(_) => Self::DecompressionFailed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::compression::{Compressor, GzipCompressor};

    #[test]
    fn undecodable_payload_maps_to_decompression_failure() {
        let err = GzipCompressor::default()
            .decompress(b"not gzip")
            .expect_err("garbage must not decompress");
        let err = ConnectorError::from(err);
        assert!(matches!(err, ConnectorError::DecompressionFailed(_)), "{err:?}");
        assert!(err.to_string().starts_with("failed to decompress payload"), "{err}");
    }

    #[test]
    fn compress_failure_maps_to_compression_failure() {
        let err = ConnectorError::from(CompressionError::Compress(io::Error::other("full")));
        assert!(matches!(err, ConnectorError::CompressionFailed(_)), "{err:?}");
    }
}
