//! Health resolution. Runs after every source of damage.

use engine_component::{ComponentKind, Health, MoveIntent, Position, Velocity, Weapon};
use engine_math::Vec2;
use tracing::info;

use crate::sim::SimState;

/// Players at zero health respawn at full health on the spawn point;
/// anything else at zero health is destroyed.
pub fn run(sim: &mut SimState) {
    let spawn_point = sim.config.spawn_point;
    sim.world.run_query(&[ComponentKind::Health], |world, entity| {
        let Some(health) = world.get::<Health>(entity).cloned() else {
            return;
        };
        if health.is_alive() {
            return;
        }

        if !world.has(entity, ComponentKind::Player) {
            let boss = world.has(entity, ComponentKind::Boss);
            world.destroy_entity(entity);
            info!(entity = entity.id(), boss, "entity destroyed");
            return;
        }

        if let Some(mut h) = world.write::<Health>(entity) {
            h.set_current(health.max);
        }
        if let Some(mut p) = world.write::<Position>(entity) {
            p.set_vec(spawn_point);
        }
        if let Some(mut v) = world.write::<Velocity>(entity) {
            v.set_vec(Vec2::ZERO);
        }
        if let Some(mut intent) = world.write::<MoveIntent>(entity) {
            intent.set_velocity(None);
            intent.set_target(None);
        }
        if let Some(mut weapon) = world.write::<Weapon>(entity) {
            weapon.set_pending(None);
        }
        info!(player = entity.id(), "player respawned");
    });
}
