//! Simulation state.
//!
//! [`SimState`] is everything a tick callback may touch: the world, the
//! collision index, the tuning, and the inputs queued for this tick. It is
//! owned by the tick loop and handed to each callback in turn.

use engine_component::{Entity, World};
use engine_math::Vec2;
use engine_spatial::SpatialIndex;
use tracing::info;

use crate::config::SimConfig;
use crate::spawn;

/// A request to use an interactable, applied by the interaction system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub player: Entity,
    pub target: Entity,
}

/// The authoritative simulation.
#[derive(Debug)]
pub struct SimState {
    pub world: World,
    pub spatial: SpatialIndex,
    pub config: SimConfig,
    /// The tick currently being simulated.
    pub tick: u64,
    /// Interaction requests received since the last tick.
    pub interactions: Vec<Interaction>,
}

impl SimState {
    /// Create an empty simulation.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            world: World::new(),
            spatial: SpatialIndex::new(config.spatial),
            config,
            tick: 0,
            interactions: Vec::new(),
        }
    }

    /// Populate the arena with the configured boss and pickups.
    pub fn populate(&mut self) {
        if self.config.spawn_boss {
            let boss = spawn::boss(&mut self.world, &self.config, Vec2::ZERO);
            info!(entity = boss.id(), "boss spawned");
        }
        let count = self.config.pickups;
        let ring = self.config.arena_half_extent * 0.5;
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            let at = Vec2::from_angle(angle) * ring;
            spawn::pickup(&mut self.world, &self.config, at);
        }
    }

    /// Broad-phase padding covering drift since the last index rebuild.
    #[must_use]
    pub fn staleness_margin(&self) -> f32 {
        self.spatial
            .staleness_margin(self.config.max_speed(), self.config.dt)
    }

    /// Drop every entity and queued input, keeping the configuration.
    pub fn reset(&mut self) {
        self.world.reset();
        self.spatial.clear();
        self.interactions.clear();
        self.tick = 0;
    }
}
