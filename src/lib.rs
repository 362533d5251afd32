#![doc(html_root_url = "https://docs.rs/socketlink/latest")]
//! Public API for the `socketlink` library.
//!
//! This crate provides a resilient client-side WebSocket connector. A
//! [`Connector`] keeps a session with a hub alive across disconnects,
//! identifies itself through a handshake header, tags outbound messages with
//! the hub-assigned [`ConnectionId`], and compresses binary payloads through
//! a pluggable [`Compressor`](compression::Compressor).

pub mod compression;
mod connection;
pub mod connector;
pub mod error;
pub mod invocation;
pub mod message;
pub mod metrics;
pub mod receiver;
mod session;
pub mod transport;

pub use connection::ConnectionState;
pub use connector::{BackoffConfig, Connector, ConnectorBuilder, TracingConfig};
pub use error::{CompressionError, ConnectorError, TransportError};
pub use invocation::{
    CONNECTOR_NAME_HEADER,
    InvocationContext,
    InvocationContextProvider,
    StaticInvocationContext,
};
pub use message::{CONNECTION_ID_KEY, Command, MessageContext};
pub use receiver::{
    CloseCallback,
    FrameReceiver,
    MessageHandler,
    NoopHandler,
    ReceivePipeline,
    ReceiverContext,
};
pub use session::{ConnectionId, SessionAssigner};
