//! Streaming Protocol
//!
//! Line-delimited JSON messages over TCP between a sample producer (the
//! server) and a consumer. The client side keeps reconnecting forever at a
//! fixed interval and feeds every received sample into a
//! [`LiveValueStore`](crate::live::LiveValueStore).

mod client;
pub mod codec;
mod error;
mod message;

pub use client::{ClientEvent, ConnectionState, StreamClient};
pub use codec::{decode_line, encode_line};
pub use error::ProtocolError;
pub use message::{
    EventPayload, InitPayload, MessageType, ProtocolMessage, VarDef, VarPayload,
};

/// Capacity of the client event channel. Slow subscribers that fall further
/// behind than this miss events (and are told so by `RecvError::Lagged`).
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
