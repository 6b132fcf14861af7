//! Messages exchanged between the server and its clients.
//!
//! Server → client messages are tagged by `type` and serialised directly.
//! Client → server messages are decoded in two steps: the payload is first
//! read as a dynamic value, then dispatched by its `type` field through
//! [`HANDLERS`], so each kind validates its own shape and an unknown kind is
//! reported without guessing.

use std::fmt;
use std::str::FromStr;

use engine_component::{Aim, Entity, Packet};
use engine_math::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NetError;

// ── Connection identity ─────────────────────────────────────────────────────

/// Identifies one client connection on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Allocate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Reply to a `game.connect` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectReply {
    pub connection_id: ConnectionId,
}

// ── Server → client ─────────────────────────────────────────────────────────

/// A message sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The state changes of one tick.
    Update { packet: Packet },
    /// Sent once, right after a connection opens.
    #[serde(rename_all = "camelCase")]
    Initialization {
        player_entity: Entity,
        catchup_packet: Packet,
    },
}

// ── Client → server ─────────────────────────────────────────────────────────

/// A 2D point as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl Point {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Movement request: a velocity, a target to walk to, or both (velocity
/// wins). Neither means stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MovementIntent {
    #[serde(default)]
    pub target: Option<Point>,
    #[serde(default)]
    pub velocity: Option<Point>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ShootPayload {
    #[serde(default)]
    angle: Option<f32>,
    #[serde(default)]
    target: Option<Entity>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct InteractPayload {
    target: Entity,
}

/// A validated client request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientIntent {
    Movement(MovementIntent),
    Shoot(Aim),
    Interact { target: Entity },
    /// Carries nothing; keeps an otherwise quiet connection alive.
    Heartbeat,
}

impl ClientIntent {
    /// The wire `type` of this intent.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ClientIntent::Movement(_) => "movement",
            ClientIntent::Shoot(_) => "shoot",
            ClientIntent::Interact { .. } => "interact",
            ClientIntent::Heartbeat => "heartbeat",
        }
    }
}

/// Decodes one kind of client message.
pub struct Handler {
    /// The `type` value this handler accepts.
    pub kind: &'static str,
    decode: fn(Value) -> Result<ClientIntent, NetError>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("kind", &self.kind).finish()
    }
}

/// Every client message kind the server accepts.
pub const HANDLERS: &[Handler] = &[
    Handler {
        kind: "movement",
        decode: decode_movement,
    },
    Handler {
        kind: "shoot",
        decode: decode_shoot,
    },
    Handler {
        kind: "interact",
        decode: decode_interact,
    },
    Handler {
        kind: "heartbeat",
        decode: decode_heartbeat,
    },
];

fn payload<T: serde::de::DeserializeOwned>(kind: &'static str, value: Value) -> Result<T, NetError> {
    serde_json::from_value(value).map_err(|e| NetError::Malformed {
        kind,
        reason: e.to_string(),
    })
}

fn decode_movement(value: Value) -> Result<ClientIntent, NetError> {
    let intent: MovementIntent = payload("movement", value)?;
    let finite = intent.target.is_none_or(|p| p.is_finite())
        && intent.velocity.is_none_or(|p| p.is_finite());
    if !finite {
        return Err(NetError::Malformed {
            kind: "movement",
            reason: "non-finite coordinate".into(),
        });
    }
    Ok(ClientIntent::Movement(intent))
}

fn decode_shoot(value: Value) -> Result<ClientIntent, NetError> {
    let shot: ShootPayload = payload("shoot", value)?;
    match (shot.angle, shot.target) {
        (Some(angle), _) if angle.is_finite() => Ok(ClientIntent::Shoot(Aim::Angle(angle))),
        (None, Some(target)) => Ok(ClientIntent::Shoot(Aim::Target(target))),
        _ => Err(NetError::Malformed {
            kind: "shoot",
            reason: "expected a finite `angle` or a `target`".into(),
        }),
    }
}

fn decode_interact(value: Value) -> Result<ClientIntent, NetError> {
    let interact: InteractPayload = payload("interact", value)?;
    Ok(ClientIntent::Interact {
        target: interact.target,
    })
}

fn decode_heartbeat(_: Value) -> Result<ClientIntent, NetError> {
    Ok(ClientIntent::Heartbeat)
}

/// Dispatch a decoded client payload to its handler by `type`.
///
/// # Errors
///
/// [`NetError::MissingType`] if there is no string `type`,
/// [`NetError::UnknownMessageType`] if no handler matches, and
/// [`NetError::Malformed`] if the handler rejects the payload.
pub fn decode_client_message(value: Value) -> Result<ClientIntent, NetError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(NetError::MissingType)?;
    let handler = HANDLERS
        .iter()
        .find(|h| h.kind == kind)
        .ok_or_else(|| NetError::UnknownMessageType(kind.to_string()))?;
    (handler.decode)(value)
}

#[cfg(test)]
mod tests {
    use engine_component::{ComponentKind, DiffBuilder};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_update_wire_shape() {
        let mut diff = DiffBuilder::new();
        diff.record_field(Entity(1), ComponentKind::Health, "current", json!(90.0));
        diff.record_destroy(Entity(2));
        let msg = ServerMessage::Update {
            packet: diff.drain(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "update",
                "packet": { "1": { "health": { "current": 90.0 } }, "2": null },
            })
        );
    }

    #[test]
    fn test_initialization_wire_shape() {
        let msg = ServerMessage::Initialization {
            player_entity: Entity(7),
            catchup_packet: Packet::new(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "initialization", "playerEntity": 7, "catchupPacket": {} })
        );
    }

    #[test]
    fn test_decode_movement() {
        let intent = decode_client_message(json!({
            "type": "movement",
            "target": { "x": 3.0, "y": 4.0 },
        }))
        .unwrap();
        assert_eq!(
            intent,
            ClientIntent::Movement(MovementIntent {
                target: Some(Point { x: 3.0, y: 4.0 }),
                velocity: None,
            })
        );
    }

    #[test]
    fn test_decode_shoot_by_angle_or_target() {
        assert_eq!(
            decode_client_message(json!({"type": "shoot", "angle": 0.5})).unwrap(),
            ClientIntent::Shoot(Aim::Angle(0.5))
        );
        assert_eq!(
            decode_client_message(json!({"type": "shoot", "target": 12})).unwrap(),
            ClientIntent::Shoot(Aim::Target(Entity(12)))
        );
    }

    #[test]
    fn test_shoot_without_aim_is_malformed() {
        assert!(matches!(
            decode_client_message(json!({"type": "shoot"})),
            Err(NetError::Malformed { kind: "shoot", .. })
        ));
    }

    #[test]
    fn test_interact_requires_target() {
        assert_eq!(
            decode_client_message(json!({"type": "interact", "target": 3})).unwrap(),
            ClientIntent::Interact { target: Entity(3) }
        );
        assert!(matches!(
            decode_client_message(json!({"type": "interact"})),
            Err(NetError::Malformed { kind: "interact", .. })
        ));
    }

    #[test]
    fn test_decode_heartbeat() {
        let intent = decode_client_message(json!({"type": "heartbeat"})).unwrap();
        assert_eq!(intent, ClientIntent::Heartbeat);
        assert_eq!(intent.kind(), "heartbeat");
    }

    #[test]
    fn test_unknown_and_missing_type() {
        assert!(matches!(
            decode_client_message(json!({"type": "dance"})),
            Err(NetError::UnknownMessageType(kind)) if kind == "dance"
        ));
        assert!(matches!(
            decode_client_message(json!({"angle": 1.0})),
            Err(NetError::MissingType)
        ));
    }

    #[test]
    fn test_handler_kinds_are_unique() {
        for (i, a) in HANDLERS.iter().enumerate() {
            assert!(HANDLERS[i + 1..].iter().all(|b| b.kind != a.kind));
        }
    }

    #[test]
    fn test_connection_id_display_parses_back() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string().parse::<ConnectionId>().unwrap(), id);
    }
}
