//! Fixed-rate tick loop.
//!
//! Each tick runs the same lifecycle:
//!
//! 1. Apply everything the gateway queued since the last tick: new
//!    connections, client intents, disconnects. Sessions silent for longer
//!    than the idle timeout are closed. Players of closed sessions are torn
//!    down here and nowhere else.
//! 2. Run every registered callback in registration order.
//! 3. Drain the update packet and queue it for every open session.
//! 4. Rebuild the collision index if this tick is on its cadence.
//! 5. Advance the tick counter.
//!
//! Client input never reaches the simulation mid-tick, and no step waits on
//! I/O: outbound frames are handed to per-connection buffers and published
//! by the gateway's writer tasks.

use std::future::Future;
use std::time::{Duration, Instant};

use engine_component::{Entity, MoveIntent, Packet, Weapon};
use engine_net::{ClientIntent, ConnectionId, ServerMessage, WireFormat};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SimConfig;
use crate::gateway::GatewayEvent;
use crate::registry::CallbackRegistry;
use crate::session::SessionTable;
use crate::sim::{Interaction, SimState};
use crate::spawn;

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Ticks without inbound traffic before a session is closed
    /// (0 = never).
    pub idle_timeout_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
            idle_timeout_ticks: 30 * 60,
        }
    }
}

/// The authoritative tick loop: simulation, callbacks, and sessions.
#[derive(Debug)]
pub struct TickLoop {
    /// The next tick to run.
    tick_id: u64,
    config: TickConfig,
    format: WireFormat,
    sim: SimState,
    registry: CallbackRegistry,
    sessions: SessionTable,
    events_tx: mpsc::UnboundedSender<GatewayEvent>,
    events_rx: mpsc::UnboundedReceiver<GatewayEvent>,
}

impl TickLoop {
    #[must_use]
    pub fn new(config: TickConfig, sim: SimConfig, format: WireFormat) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            tick_id: 0,
            config,
            format,
            sim: SimState::new(sim),
            registry: CallbackRegistry::new(),
            sessions: SessionTable::new(),
            events_tx,
            events_rx,
        }
    }

    /// A handle for feeding transport events into the loop.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<GatewayEvent> {
        self.events_tx.clone()
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn sim(&self) -> &SimState {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut SimState {
        &mut self.sim
    }

    pub fn registry_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Run one tick.
    pub fn tick(&mut self) {
        self.sim.tick = self.tick_id;
        debug!(tick = self.tick_id, "tick start");

        self.apply_events();
        if self.config.idle_timeout_ticks > 0 {
            self.sessions
                .close_idle(self.tick_id, self.config.idle_timeout_ticks);
        }
        for player in self.sessions.take_teardown() {
            if self.sim.world.destroy_entity(player) {
                debug!(tick = self.tick_id, player = player.id(), "player torn down");
            }
        }

        self.registry.run_all(&mut self.sim);

        let packet = self.sim.world.drain_update_packet();
        if !packet.is_empty() {
            self.dispatch(packet);
        }

        if self.sim.spatial.due(self.tick_id) {
            self.sim.spatial.rebuild(&self.sim.world, self.tick_id);
        }

        self.tick_id += 1;
    }

    /// Drive [`TickLoop::tick`] at the configured rate until `shutdown`
    /// resolves or `max_ticks` ticks have run.
    ///
    /// Ticks that overrun their budget are logged; missed ticks are skipped
    /// rather than run in a burst.
    pub async fn run_async(&mut self, shutdown: impl Future) {
        let budget = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let mut interval = tokio::time::interval(budget);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            format = %self.format,
            "starting tick loop"
        );

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(ticks, "shutdown requested");
                    break;
                }
                _ = interval.tick() => {}
            }

            let start = Instant::now();
            self.tick();
            ticks += 1;

            let elapsed = start.elapsed();
            if elapsed > budget {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }

            if self.config.max_ticks > 0 && ticks >= self.config.max_ticks {
                info!(ticks, "tick loop complete");
                break;
            }
        }
    }

    fn apply_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                GatewayEvent::Connected { id, outbound } => self.on_connected(id, outbound),
                GatewayEvent::Message { id, intent } => self.on_intent(id, intent),
                GatewayEvent::Disconnected { id } => {
                    self.sessions.close(id);
                }
            }
        }
    }

    fn on_connected(&mut self, id: ConnectionId, outbound: mpsc::Sender<Vec<u8>>) {
        self.sessions.connect(id, outbound, self.tick_id);
        let player = spawn::player(&mut self.sim.world, &self.sim.config, &id.to_string());

        // The catch-up covers every drained tick; the player's own spawn is
        // in this tick's update, which the session receives once open.
        let init = ServerMessage::Initialization {
            player_entity: player,
            catchup_packet: self.sim.world.catchup_packet().clone(),
        };
        match self.format.encode(&init) {
            Ok(frame) => {
                self.sessions.open(id, player, frame);
            }
            Err(e) => {
                error!(connection = %id, %e, "failed to encode initialization");
                self.sim.world.destroy_entity(player);
                self.sessions.close(id);
            }
        }
    }

    fn on_intent(&mut self, id: ConnectionId, intent: ClientIntent) {
        self.sessions.touch(&id, self.tick_id);
        let Some(player) = self.sessions.player_of(&id) else {
            warn!(connection = %id, kind = intent.kind(), "intent from unopened connection dropped");
            return;
        };
        let world = &mut self.sim.world;
        match intent {
            ClientIntent::Movement(movement) => {
                if let Some(mut intent) = world.write::<MoveIntent>(player) {
                    intent.set_velocity(movement.velocity.map(Into::into));
                    intent.set_target(movement.target.map(Into::into));
                }
            }
            ClientIntent::Shoot(aim) => {
                if let Some(mut weapon) = world.write::<Weapon>(player) {
                    weapon.set_pending(Some(aim));
                }
            }
            ClientIntent::Interact { target } => {
                self.sim.interactions.push(Interaction { player, target });
            }
            ClientIntent::Heartbeat => {}
        }
    }

    fn dispatch(&mut self, packet: Packet) {
        if self.sessions.open_count() == 0 {
            return;
        }
        let entities = packet.len();
        match self.format.encode(&ServerMessage::Update { packet }) {
            Ok(frame) => {
                let delivered = self.sessions.broadcast(&frame);
                debug!(
                    tick = self.tick_id,
                    entities,
                    bytes = frame.len(),
                    delivered,
                    "update dispatched"
                );
            }
            Err(e) => error!(tick = self.tick_id, %e, "failed to encode update"),
        }
    }

    /// The player entity owned by `id`, if its session is open.
    #[must_use]
    pub fn player_of(&self, id: &ConnectionId) -> Option<Entity> {
        self.sessions.player_of(id)
    }
}
