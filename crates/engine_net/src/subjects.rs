//! NATS subject hierarchy.
//!
//! All game subjects are prefixed with `game.`. Each client connection gets
//! its own inbound, outbound, and leave subject keyed by connection id.

use crate::messages::ConnectionId;

/// Root prefix for all game NATS subjects.
pub const PREFIX: &str = "game";

/// Connection handshake. Request/reply; the reply carries the new
/// connection id.
pub const CONNECT: &str = "game.connect";

/// Every client's inbound subject.
pub const CLIENT_IN_ALL: &str = "game.client.*.in";

/// Every client's leave subject.
pub const CLIENT_LEAVE_ALL: &str = "game.client.*.leave";

/// `game.client.<id>.in`: client → server messages.
#[must_use]
pub fn client_in(id: &ConnectionId) -> String {
    format!("game.client.{id}.in")
}

/// `game.client.<id>.out`: server → client messages.
#[must_use]
pub fn client_out(id: &ConnectionId) -> String {
    format!("game.client.{id}.out")
}

/// `game.client.<id>.leave`: explicit disconnect.
#[must_use]
pub fn client_leave(id: &ConnectionId) -> String {
    format!("game.client.{id}.leave")
}

/// Extract the connection id from a `game.client.<id>.<suffix>` subject.
#[must_use]
pub fn connection_id(subject: &str) -> Option<ConnectionId> {
    let mut parts = subject.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(PREFIX), Some("client"), Some(id), Some(_), None) => id.parse().ok(),
        _ => None,
    }
}
