//! Network-layer error types.

/// Errors that can occur while encoding, decoding, or transporting messages.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A client message had no string `type` field.
    #[error("client message has no `type` field")]
    MissingType,

    /// A client message named a type with no registered handler.
    #[error("unknown client message type {0:?}")]
    UnknownMessageType(String),

    /// A client message of a known type failed validation.
    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: &'static str, reason: String },

    /// A connection's outbound buffer is full; the frame was dropped.
    #[error("outbound buffer full for connection {0}")]
    BufferFull(String),

    /// A connection's outbound channel is closed.
    #[error("outbound channel closed for connection {0}")]
    ChannelClosed(String),

    /// NATS subscription error.
    #[error("NATS subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),

    /// NATS publish error.
    #[error("NATS publish error: {0}")]
    Publish(#[from] async_nats::PublishError),

    /// NATS connection error.
    #[error("NATS connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),
}

impl NetError {
    /// Returns `true` for errors caused by a single bad client message.
    /// These are logged and dropped; the connection stays open.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            NetError::MissingType
                | NetError::UnknownMessageType(_)
                | NetError::Malformed { .. }
                | NetError::Decode(_)
                | NetError::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_faults() {
        assert!(NetError::UnknownMessageType("dance".into()).is_client_fault());
        assert!(
            NetError::Malformed {
                kind: "shoot",
                reason: "no aim".into()
            }
            .is_client_fault()
        );
        assert!(!NetError::BufferFull("c1".into()).is_client_fault());
    }

    #[test]
    fn test_display() {
        let err = NetError::UnknownMessageType("dance".into());
        assert_eq!(err.to_string(), "unknown client message type \"dance\"");
    }
}
