//! # engine_net
//!
//! Client-facing transport for the authoritative server.
//!
//! This crate provides:
//!
//! - [`subjects`]: NATS subject hierarchy constants and builders.
//! - [`messages`]: server messages, client intents, and the handler table.
//! - [`codec`]: JSON and MessagePack wire formats.
//! - [`connection`]: NATS connection management.
//! - [`error`]: network-layer error types.

pub mod codec;
pub mod connection;
pub mod error;
pub mod messages;
pub mod subjects;

pub use codec::{WireFormat, decode, encode};
pub use connection::{DEFAULT_NATS_URL, NatsConnection};
pub use error::NetError;
pub use messages::{
    ClientIntent, ConnectReply, ConnectionId, HANDLERS, MovementIntent, Point, ServerMessage,
    decode_client_message,
};
