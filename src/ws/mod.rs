//! Hand-rolled WebSocket protocol layer (RFC 6455 subset).
//!
//! Implements the server side of the protocol from scratch: the HTTP upgrade
//! handshake ([`handshake`]), the binary frame codec ([`codec`]) and an owned
//! connection over the upgraded stream ([`connection`]). Fragmented messages,
//! extensions and compression are not supported; every frame is read or
//! written whole.

pub mod codec;
pub mod connection;
pub mod frame;
pub mod handshake;

pub use codec::{FrameCodec, MAX_PAYLOAD_SIZE};
pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use frame::{Frame, OpCode};
pub use handshake::{UpgradeFut, WsUpgrade, accept_key};

use thiserror::Error;

/// Protocol-layer errors. All of these are connection-fatal: the caller is
/// expected to drop the socket.
#[derive(Debug, Error)]
pub enum WebSocketError {
    /// A frame arrived with FIN=0; fragmented messages are not supported.
    #[error("fragmented frames not supported")]
    FragmentationUnsupported,

    /// The opcode nibble is not one of the six opcodes we accept.
    #[error("invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// The declared payload length exceeds [`codec::MAX_PAYLOAD_SIZE`].
    #[error("frame payload of {0} bytes is too large")]
    FrameTooLarge(u64),

    /// The peer went away mid-frame or the stream ended.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("http upgrade failed: {0}")]
    Upgrade(#[from] hyper::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
