//! Client sessions.
//!
//! A session is the tick loop's view of one client connection: its state,
//! the player entity it owns, and the sending half of its outbound buffer.
//! The transport drains the other half on its own task, so sending from the
//! tick loop never waits.
//!
//! Clients mirror state from a catch-up packet plus every update after it,
//! so a session that misses one update can no longer be trusted and is
//! closed. Dropping a session drops its sender, which ends the transport's
//! writer for it.

use std::collections::BTreeMap;

use engine_component::Entity;
use engine_net::{ConnectionId, NetError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Known to the transport, not yet initialised by the tick loop.
    Connecting,
    /// Received its initialization message; receives every update.
    Open,
    /// Gone. Its player entity is torn down at the next tick boundary.
    Closed,
}

/// One client connection.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    state: ConnectionState,
    player: Option<Entity>,
    outbound: mpsc::Sender<Vec<u8>>,
    /// Tick of the last inbound message, or of the connect.
    last_seen: u64,
}

impl Session {
    #[must_use]
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Vec<u8>>, now: u64) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            player: None,
            outbound,
            last_seen: now,
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The player entity owned by this connection, once open.
    #[must_use]
    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    #[must_use]
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Queue one frame without waiting.
    ///
    /// # Errors
    ///
    /// [`NetError::BufferFull`] if the client is not keeping up (the frame
    /// is dropped), [`NetError::ChannelClosed`] if the transport side is
    /// gone.
    pub fn try_send(&self, frame: Vec<u8>) -> Result<(), NetError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => NetError::BufferFull(self.id.to_string()),
            TrySendError::Closed(_) => NetError::ChannelClosed(self.id.to_string()),
        })
    }
}

/// Every session known to the tick loop, keyed by connection id.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: BTreeMap<ConnectionId, Session>,
    /// Player entities of closed sessions, awaiting teardown.
    teardown: Vec<Entity>,
}

impl SessionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection in the `Connecting` state at tick `now`.
    pub fn connect(&mut self, id: ConnectionId, outbound: mpsc::Sender<Vec<u8>>, now: u64) {
        debug!(connection = %id, "session connecting");
        self.sessions.insert(id, Session::new(id, outbound, now));
    }

    /// Record inbound traffic from `id` at tick `now`. Returns `false` for
    /// unknown ids.
    pub fn touch(&mut self, id: &ConnectionId, now: u64) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.last_seen = session.last_seen.max(now);
                true
            }
            None => false,
        }
    }

    /// Close every session that has been silent for `timeout` ticks or more.
    /// Returns the closed ids.
    pub fn close_idle(&mut self, now: u64, timeout: u64) -> Vec<ConnectionId> {
        let idle: Vec<ConnectionId> = self
            .sessions
            .values()
            .filter(|s| now.saturating_sub(s.last_seen) >= timeout)
            .map(Session::id)
            .collect();
        for &id in &idle {
            warn!(connection = %id, timeout_ticks = timeout, "session idle, closing");
            self.close(id);
        }
        idle
    }

    /// Send the initialization frame and move the session to `Open`.
    ///
    /// Returns `false` if the session is unknown, not `Connecting`, or the
    /// frame could not be queued (the session is closed instead).
    pub fn open(&mut self, id: ConnectionId, player: Entity, init_frame: Vec<u8>) -> bool {
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        if session.state != ConnectionState::Connecting {
            return false;
        }
        session.player = Some(player);
        match session.try_send(init_frame) {
            Ok(()) => {
                session.state = ConnectionState::Open;
                info!(connection = %id, player = player.id(), "session open");
                true
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "initialization not delivered");
                self.close(id);
                false
            }
        }
    }

    /// Remove a session from the broadcast set at once and queue its player
    /// entity for teardown. Returns the closed session; unknown or already
    /// closed ids yield `None`.
    pub fn close(&mut self, id: ConnectionId) -> Option<Session> {
        let mut session = self.sessions.remove(&id)?;
        session.state = ConnectionState::Closed;
        if let Some(player) = session.player {
            self.teardown.push(player);
        }
        info!(connection = %id, "session closed");
        Some(session)
    }

    /// Take the player entities waiting to be destroyed.
    pub fn take_teardown(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.teardown)
    }

    /// Queue `frame` for every open session.
    ///
    /// A session whose buffer is full or whose channel is closed misses the
    /// frame and is closed; the others are unaffected. Returns the number of
    /// sessions the frame reached.
    pub fn broadcast(&mut self, frame: &[u8]) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();
        for session in self.sessions.values() {
            if session.state != ConnectionState::Open {
                continue;
            }
            match session.try_send(frame.to_vec()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(connection = %session.id, error = %e, "update not delivered, closing session");
                    gone.push(session.id);
                }
            }
        }
        for id in gone {
            self.close(id);
        }
        delivered
    }

    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// The player entity of an open session.
    #[must_use]
    pub fn player_of(&self, id: &ConnectionId) -> Option<Entity> {
        self.sessions
            .get(id)
            .filter(|s| s.state == ConnectionState::Open)
            .and_then(Session::player)
    }

    /// Number of sessions in the broadcast set.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state == ConnectionState::Open)
            .count()
    }
}
