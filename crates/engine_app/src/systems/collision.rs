//! Projectile hits.
//!
//! Every live projectile asks the broad phase for overlapping entities,
//! padded by the index's staleness margin. Candidates come back already
//! re-checked against live positions, so a hit here is a real overlap.

use engine_component::{ComponentKind, Entity, Health, Projectile, Side, Team, World};
use tracing::debug;

use crate::sim::SimState;

pub fn run(sim: &mut SimState) {
    let margin = sim.staleness_margin();
    let SimState { world, spatial, .. } = sim;
    world.run_query(
        &[ComponentKind::Projectile, ComponentKind::Position, ComponentKind::Collider],
        |world, projectile| {
            let Some(shot) = world.get::<Projectile>(projectile).cloned() else {
                return;
            };
            let Some(side) = world.get::<Team>(projectile).map(|t| t.side) else {
                return;
            };
            let Some(victim) = spatial
                .collision_candidates(world, projectile, margin)
                .into_iter()
                .find(|&other| is_target(world, other, shot.owner, side))
            else {
                return;
            };

            if let Some(mut health) = world.write::<Health>(victim) {
                health.damage(shot.damage);
            }
            world.destroy_entity(projectile);
            debug!(
                projectile = projectile.id(),
                victim = victim.id(),
                damage = shot.damage,
                "projectile hit"
            );
        },
    );
}

/// Whether a projectile fired by `owner` for `side` may damage `other`.
fn is_target(world: &World, other: Entity, owner: Entity, side: Side) -> bool {
    other != owner
        && world.has(other, ComponentKind::Health)
        && !world.has(other, ComponentKind::Projectile)
        && world.get::<Team>(other).is_some_and(|t| t.side != side)
}
