//! Utilities for driving a [`Connector`](socketlink::Connector) against an
//! in-memory hub during tests.
//!
//! [`ScriptedTransport`] plays back a script of refused and accepted
//! handshakes. Every accepted handshake yields a [`HubPeer`] that stands in
//! for the hub's end of the connection.
//!
//! ```rust
//! use socketlink::Connector;
//! use socketlink_testing::{Attempt, CountingContext, ScriptedTransport};
//!
//! let transport = ScriptedTransport::new([Attempt::Fail, Attempt::Accept]);
//! let connector = Connector::builder(CountingContext::new("billing"))
//!     .transport(transport.clone())
//!     .build();
//! let _ = connector;
//! ```

pub mod handler;
pub mod hub;
pub mod invocation;
pub mod logging;
pub mod wait;

pub use handler::{Recorded, RecordingHandler};
pub use hub::{Attempt, HubPeer, ScriptedTransport};
pub use invocation::CountingContext;
pub use logging::{LoggerHandle, logger};
pub use wait::{wait_for, wait_for_connection_id};
