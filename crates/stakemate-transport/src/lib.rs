//! Transport abstraction layer for Stakemate.
//!
//! A [`Transport`] accepts connections; a [`Connection`] is split into an
//! independent writer and reader so one task can push server events while
//! another waits for client requests.
//!
//! Frames are text: the protocol layer speaks JSON and browsers read it
//! straight off the socket.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketReader, WebSocketTransport, WebSocketWriter,
};

use std::net::SocketAddr;

use stakemate_protocol::ConnectionId;

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single accepted connection, before it's split into halves.
pub trait Connection: Send + 'static {
    /// The half that writes frames to the peer.
    type Writer: Send + 'static;
    /// The half that reads frames from the peer.
    type Reader: Send + 'static;

    /// Returns the connection's identifier. Unique for the process lifetime.
    fn id(&self) -> ConnectionId;

    /// Splits the connection so reading and writing can happen in
    /// different tasks.
    fn split(self) -> (Self::Writer, Self::Reader);
}
