//! Transport bridge between NATS and the tick loop.
//!
//! Subjects:
//!
//!   Request/Reply:
//!     game.connect               open a connection, reply carries its id
//!
//!   Per connection:
//!     game.client.<id>.in        client → server messages
//!     game.client.<id>.out       server → client messages
//!     game.client.<id>.leave     explicit disconnect
//!
//! The gateway never touches simulation state. It decodes and validates
//! inbound traffic, then forwards [`GatewayEvent`]s to the tick loop, which
//! applies them at the start of its next tick. Each connection's outbound
//! frames are published by a dedicated writer task. A writer ends when the
//! tick loop drops its session, whatever the reason, and reports back so the
//! gateway forgets the connection.

use std::collections::HashMap;
use std::future::Future;

use engine_net::{
    ClientIntent, ConnectReply, ConnectionId, NatsConnection, NetError, WireFormat,
    decode_client_message, subjects,
};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Something that happened on the transport, in arrival order.
#[derive(Debug)]
pub enum GatewayEvent {
    /// A new connection. Frames sent on `outbound` are published to the
    /// client.
    Connected {
        id: ConnectionId,
        outbound: mpsc::Sender<Vec<u8>>,
    },
    /// A validated client request.
    Message {
        id: ConnectionId,
        intent: ClientIntent,
    },
    /// The connection is gone.
    Disconnected { id: ConnectionId },
}

/// Decode one inbound payload into a client intent.
///
/// # Errors
///
/// Any decoding or validation failure; see [`decode_client_message`].
pub fn decode_inbound(format: WireFormat, payload: &[u8]) -> Result<ClientIntent, NetError> {
    let value: Value = format.decode(payload)?;
    decode_client_message(value)
}

/// NATS side of the client transport.
pub struct Gateway {
    conn: NatsConnection,
    events: mpsc::UnboundedSender<GatewayEvent>,
    outbound_capacity: usize,
    writers: HashMap<ConnectionId, JoinHandle<()>>,
}

impl Gateway {
    #[must_use]
    pub fn new(
        conn: NatsConnection,
        events: mpsc::UnboundedSender<GatewayEvent>,
        outbound_capacity: usize,
    ) -> Self {
        Self {
            conn,
            events,
            outbound_capacity,
            writers: HashMap::new(),
        }
    }

    /// Serve until NATS closes the subscriptions or the tick loop goes away.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if a subscription cannot be made.
    pub async fn run(mut self) -> Result<(), NetError> {
        let mut connects = self.conn.subscribe(subjects::CONNECT).await?;
        let mut inbound = self.conn.subscribe(subjects::CLIENT_IN_ALL).await?;
        let mut leaves = self.conn.subscribe(subjects::CLIENT_LEAVE_ALL).await?;
        let (finished_tx, mut finished) = mpsc::unbounded_channel();

        info!(format = %self.conn.format(), "gateway ready, listening for clients");

        loop {
            tokio::select! {
                Some(msg) = connects.next() => self.handle_connect(msg.reply, &finished_tx).await,
                Some(msg) = inbound.next() => self.handle_inbound(msg.subject.as_str(), &msg.payload),
                Some(msg) = leaves.next() => self.handle_leave(msg.subject.as_str()),
                Some(id) = finished.recv() => self.handle_writer_finished(id),
                else => break,
            }
            if self.events.is_closed() {
                info!("tick loop gone, gateway stopping");
                break;
            }
        }

        for (_, writer) in self.writers.drain() {
            writer.abort();
        }
        Ok(())
    }

    async fn handle_connect(
        &mut self,
        reply: Option<async_nats::Subject>,
        finished: &mpsc::UnboundedSender<ConnectionId>,
    ) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let conn = self.conn.clone();
        let subject = subjects::client_out(&id);
        let writer = tokio::spawn(write_frames(id, rx, finished.clone(), move |frame| {
            let conn = conn.clone();
            let subject = subject.clone();
            async move { conn.publish_bytes(subject, frame).await }
        }));
        self.writers.insert(id, writer);

        if self.events.send(GatewayEvent::Connected { id, outbound: tx }).is_err() {
            return;
        }
        info!(connection = %id, "client connected");

        match reply {
            Some(reply_to) => {
                let body = ConnectReply { connection_id: id };
                if let Err(e) = self.conn.publish(reply_to.to_string(), &body).await {
                    error!(connection = %id, %e, "failed to publish connect reply");
                }
            }
            None => warn!(connection = %id, "connect request without reply subject"),
        }
    }

    fn handle_inbound(&mut self, subject: &str, payload: &[u8]) {
        let Some(id) = subjects::connection_id(subject) else {
            warn!(subject, "inbound message on malformed subject");
            return;
        };
        if !self.writers.contains_key(&id) {
            warn!(connection = %id, "message from unknown connection dropped");
            return;
        }
        match decode_inbound(self.conn.format(), payload) {
            Ok(intent) => {
                debug!(connection = %id, kind = intent.kind(), "client intent");
                let _ = self.events.send(GatewayEvent::Message { id, intent });
            }
            Err(e) => warn!(connection = %id, error = %e, "client message dropped"),
        }
    }

    fn handle_leave(&mut self, subject: &str) {
        let Some(id) = subjects::connection_id(subject) else {
            warn!(subject, "leave on malformed subject");
            return;
        };
        let Some(writer) = self.writers.remove(&id) else {
            return;
        };
        // Stop publishing now; the tick loop tears the player down next tick.
        writer.abort();
        info!(connection = %id, "client left");
        let _ = self.events.send(GatewayEvent::Disconnected { id });
    }

    /// The tick loop closed this connection on its own: stop routing its
    /// inbound traffic.
    fn handle_writer_finished(&mut self, id: ConnectionId) {
        if self.writers.remove(&id).is_some() {
            info!(connection = %id, "connection closed by server");
        }
    }
}

/// Publish every frame queued for one connection until the tick loop drops
/// the sending half, then report `id` on `finished`.
async fn write_frames<P, Fut>(
    id: ConnectionId,
    mut frames: mpsc::Receiver<Vec<u8>>,
    finished: mpsc::UnboundedSender<ConnectionId>,
    mut publish: P,
) where
    P: FnMut(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<(), NetError>>,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = publish(frame).await {
            warn!(connection = %id, %e, "failed to publish frame");
        }
    }
    debug!(connection = %id, "writer finished");
    let _ = finished.send(id);
}
