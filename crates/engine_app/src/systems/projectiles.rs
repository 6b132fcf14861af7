//! Lifetime countdown.

use engine_component::{ComponentKind, Lifetime, Position};
use tracing::debug;

use crate::sim::SimState;

/// Destroy entities whose lifetime ran out, and projectiles that left the
/// arena.
pub fn run(sim: &mut SimState) {
    let h = sim.config.arena_half_extent;
    sim.world.run_query(&[ComponentKind::Lifetime], |world, entity| {
        let Some(remaining) = world.get::<Lifetime>(entity).map(|l| l.remaining_ticks) else {
            return;
        };
        let escaped = world.has(entity, ComponentKind::Projectile)
            && world
                .get::<Position>(entity)
                .is_some_and(|p| p.x.abs() > h || p.y.abs() > h);

        if remaining <= 1 || escaped {
            world.destroy_entity(entity);
            debug!(entity = entity.id(), escaped, "expired");
        } else if let Some(mut lifetime) = world.write::<Lifetime>(entity) {
            lifetime.set_remaining_ticks(remaining - 1);
        }
    });
}
