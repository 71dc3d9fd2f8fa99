//! Wire protocol for Stakemate.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ConnectionId`], [`RoomCode`], [`Side`], [`RoomSnapshot`], ...)
//!   shared by every layer above.
//! - **Frames** ([`ClientFrame`], [`ServerFrame`], [`ServerEvent`], [`Reply`]):
//!   the request/response pairs and server pushes that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames are converted
//!   to and from text.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about rooms or sockets. It only knows how
//! messages are shaped.
//!
//! ```text
//! Transport (text frames) → Protocol (ClientFrame / ServerFrame) → Coordinator
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    ClientFrame, ClientRequest, ErrorKind, Reply, ServerEvent, ServerFrame,
};
pub use types::{
    ConnectionId, PlayerView, RoomCode, RoomSnapshot, RoomStatus, Side,
    TerminationReason,
};

/// The protocol version announced in the `welcome` event.
pub const PROTOCOL_VERSION: u32 = 1;
