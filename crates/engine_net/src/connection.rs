//! NATS connection management.
//!
//! A thin wrapper around `async-nats` with the game's subject helpers and
//! wire format baked in.

use tracing::info;

use crate::codec::WireFormat;
use crate::error::NetError;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// An `async-nats` client paired with the wire format used for payloads.
#[derive(Debug, Clone)]
pub struct NatsConnection {
    client: async_nats::Client,
    format: WireFormat,
}

impl NatsConnection {
    /// Connect to NATS at the specified URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect_to(url: &str, format: WireFormat) -> Result<Self, NetError> {
        info!(url, %format, "connecting to NATS");
        let client = async_nats::connect(url).await?;
        info!("NATS connection established");
        Ok(Self { client, format })
    }

    /// Returns a reference to the underlying `async-nats` client.
    #[must_use]
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// The payload encoding in use.
    #[must_use]
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Publish pre-encoded bytes to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Publish`] if publishing fails.
    pub async fn publish_bytes(&self, subject: String, payload: Vec<u8>) -> Result<(), NetError> {
        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }

    /// Encode and publish a message to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or publishing fails.
    pub async fn publish<T: serde::Serialize>(&self, subject: String, message: &T) -> Result<(), NetError> {
        let payload = self.format.encode(message)?;
        self.publish_bytes(subject, payload).await
    }

    /// Subscribe to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, NetError> {
        let sub = self.client.subscribe(subject.to_string()).await?;
        Ok(sub)
    }
}
