//! Interact requests.

use engine_component::{Health, Interactable, Position};
use tracing::debug;

use crate::sim::{Interaction, SimState};

/// Apply every interact request received this tick.
///
/// A request is honoured when both entities still exist and the player is
/// within `interact_range` of the target. The target heals the player and
/// is consumed. Anything else is dropped.
pub fn run(sim: &mut SimState) {
    let range = sim.config.interact_range;
    let requests = std::mem::take(&mut sim.interactions);
    let world = &mut sim.world;

    for Interaction { player, target } in requests {
        let Some(heal) = world.get::<Interactable>(target).map(|i| i.heal) else {
            debug!(player = player.id(), target = target.id(), "interact target gone");
            continue;
        };
        let (Some(from), Some(to)) = (
            world.get::<Position>(player).map(Position::vec),
            world.get::<Position>(target).map(Position::vec),
        ) else {
            continue;
        };
        if from.distance(to) > range {
            debug!(player = player.id(), target = target.id(), "interact target out of range");
            continue;
        }

        if let Some(mut health) = world.write::<Health>(player) {
            health.heal(heal);
        }
        world.destroy_entity(target);
        debug!(player = player.id(), target = target.id(), heal, "pickup used");
    }
}

#[cfg(test)]
mod tests {
    use engine_component::Entity;
    use engine_math::Vec2;

    use super::*;
    use crate::config::SimConfig;
    use crate::spawn;

    fn wounded_player(sim: &mut SimState) -> Entity {
        let player = spawn::player(&mut sim.world, &sim.config, "ada");
        if let Some(mut h) = sim.world.write::<Health>(player) {
            h.damage(50.0);
        }
        player
    }

    fn current(sim: &SimState, e: Entity) -> f32 {
        sim.world.get::<Health>(e).unwrap().current
    }

    #[test]
    fn test_pickup_in_range_heals_and_is_consumed() {
        let mut sim = SimState::new(SimConfig::default());
        let player = wounded_player(&mut sim);
        let at = sim.config.spawn_point + Vec2::new(1.0, 0.0);
        let pickup = spawn::pickup(&mut sim.world, &sim.config, at);
        sim.interactions.push(Interaction { player, target: pickup });
        run(&mut sim);
        assert_eq!(current(&sim, player), 50.0 + sim.config.pickup_heal);
        assert!(!sim.world.is_alive(pickup));
        assert!(sim.interactions.is_empty());
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut sim = SimState::new(SimConfig::default());
        let player = wounded_player(&mut sim);
        let pickup = spawn::pickup(&mut sim.world, &sim.config, Vec2::ZERO);
        sim.interactions.push(Interaction { player, target: pickup });
        run(&mut sim);
        assert_eq!(current(&sim, player), 50.0);
        assert!(sim.world.is_alive(pickup));
    }

    #[test]
    fn test_heal_is_capped_and_second_request_finds_nothing() {
        let mut sim = SimState::new(SimConfig {
            pickup_heal: 80.0,
            ..SimConfig::default()
        });
        let player = wounded_player(&mut sim);
        let pickup = spawn::pickup(&mut sim.world, &sim.config, sim.config.spawn_point);
        sim.interactions.push(Interaction { player, target: pickup });
        sim.interactions.push(Interaction { player, target: pickup });
        run(&mut sim);
        assert_eq!(current(&sim, player), sim.config.player_health);
    }

    #[test]
    fn test_non_interactable_target_is_ignored() {
        let mut sim = SimState::new(SimConfig::default());
        let player = wounded_player(&mut sim);
        let other = spawn::player(&mut sim.world, &sim.config, "bob");
        sim.interactions.push(Interaction { player, target: other });
        run(&mut sim);
        assert!(sim.world.is_alive(other));
        assert_eq!(current(&sim, player), 50.0);
    }
}
