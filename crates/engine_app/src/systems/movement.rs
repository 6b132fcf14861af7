//! Player steering and position integration.

use engine_component::{ComponentKind, MoveIntent, Player, Position, Velocity};
use engine_math::Vec2;

use crate::sim::SimState;

/// Below this distance a player counts as arrived at its target.
const ARRIVAL_EPSILON: f32 = 1e-3;

pub fn run(sim: &mut SimState) {
    steer_players(sim);
    integrate(sim);
}

/// Turn each player's move intent into a velocity.
fn steer_players(sim: &mut SimState) {
    let dt = sim.config.dt;
    sim.world.run_query(
        &[ComponentKind::Player, ComponentKind::MoveIntent, ComponentKind::Position],
        |world, entity| {
            let Some(speed) = world.get::<Player>(entity).map(|p| p.speed) else {
                return;
            };
            let Some(intent) = world.get::<MoveIntent>(entity).cloned() else {
                return;
            };
            let Some(at) = world.get::<Position>(entity).map(Position::vec) else {
                return;
            };

            let (velocity, arrived) = steer(&intent, at, speed, dt);
            if arrived {
                if let Some(mut intent) = world.write::<MoveIntent>(entity) {
                    intent.set_target(None);
                }
            }
            if let Some(mut v) = world.write::<Velocity>(entity) {
                v.set_vec(velocity);
            }
        },
    );
}

/// The velocity that follows `intent` this tick, and whether the target is
/// reached by the end of it.
fn steer(intent: &MoveIntent, at: Vec2, speed: f32, dt: f32) -> (Vec2, bool) {
    if let Some(velocity) = intent.velocity {
        return (velocity.clamp_length_max(speed), false);
    }
    let Some(target) = intent.target else {
        return (Vec2::ZERO, false);
    };
    let to = target - at;
    let distance = to.length();
    if distance < ARRIVAL_EPSILON {
        return (Vec2::ZERO, true);
    }
    let step = speed * dt;
    if distance <= step {
        // Land exactly on the target.
        (to / dt, true)
    } else {
        (to / distance * speed, false)
    }
}

/// Advance every moving entity by its velocity. Everything except
/// projectiles is kept inside the arena.
fn integrate(sim: &mut SimState) {
    let dt = sim.config.dt;
    let h = sim.config.arena_half_extent;
    sim.world
        .run_query(&[ComponentKind::Position, ComponentKind::Velocity], |world, entity| {
            let Some(velocity) = world.get::<Velocity>(entity).map(Velocity::vec) else {
                return;
            };
            if velocity == Vec2::ZERO {
                return;
            }
            let Some(at) = world.get::<Position>(entity).map(Position::vec) else {
                return;
            };
            let mut next = at + velocity * dt;
            if !world.has(entity, ComponentKind::Projectile) {
                next = next.clamp(Vec2::splat(-h), Vec2::splat(h));
            }
            if let Some(mut position) = world.write::<Position>(entity) {
                position.set_vec(next);
            }
        });
}
