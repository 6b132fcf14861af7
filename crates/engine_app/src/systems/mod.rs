//! Gameplay systems.
//!
//! Each system is a plain `fn(&mut SimState)` registered with the
//! [`CallbackRegistry`]. Client input is applied by the tick loop before any
//! of them runs.

pub mod boss;
pub mod collision;
pub mod health;
pub mod interaction;
pub mod movement;
pub mod projectiles;
pub mod weapons;

use crate::registry::CallbackRegistry;

/// Register the gameplay systems in their required order.
///
/// Movement integrates projectiles spawned by weapons and the boss in the
/// same tick; collision sees the integrated positions; health resolution
/// runs last so every source of damage this tick is counted.
pub fn register_default_systems(registry: &mut CallbackRegistry) {
    registry.register("boss", boss::run);
    registry.register("weapons", weapons::run);
    registry.register("movement", movement::run);
    registry.register("projectiles", projectiles::run);
    registry.register("collision", collision::run);
    registry.register("interaction", interaction::run);
    registry.register("health", health::run);
}
