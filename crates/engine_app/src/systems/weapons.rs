//! Weapon cooldowns and firing.

use engine_component::{ComponentKind, Position, Side, Team, Weapon};
use tracing::debug;

use crate::sim::SimState;
use crate::spawn::{self, Shot};

/// Count every weapon's cooldown down and fire pending shots that are ready.
///
/// A shot requested while cooling down stays pending and fires as soon as
/// the cooldown allows. A shot whose aim cannot be resolved (dead target) is
/// discarded.
pub fn run(sim: &mut SimState) {
    let SimState { world, config, .. } = sim;
    world.run_query(&[ComponentKind::Weapon, ComponentKind::Position], |world, shooter| {
        let Some(weapon) = world.get::<Weapon>(shooter).cloned() else {
            return;
        };
        let remaining = weapon.remaining_ticks.saturating_sub(1);
        let Some(aim) = weapon.pending.filter(|_| remaining == 0) else {
            if let Some(mut w) = world.write::<Weapon>(shooter) {
                w.set_remaining_ticks(remaining);
            }
            return;
        };

        let Some(origin) = world.get::<Position>(shooter).map(Position::vec) else {
            return;
        };
        let side = world
            .get::<Team>(shooter)
            .map_or(Side::Players, |t| t.side);
        let direction = spawn::aim_direction(world, origin, aim);

        if let Some(mut w) = world.write::<Weapon>(shooter) {
            w.set_pending(None);
            w.set_remaining_ticks(if direction.is_some() { weapon.cooldown_ticks } else { 0 });
        }
        let Some(direction) = direction else {
            debug!(shooter = shooter.id(), ?aim, "shot discarded, aim unresolved");
            return;
        };

        let projectile = spawn::projectile(
            world,
            config,
            Shot {
                owner: shooter,
                side,
                origin,
                direction,
                speed: weapon.projectile_speed,
                damage: weapon.damage,
            },
        );
        debug!(shooter = shooter.id(), projectile = projectile.id(), "shot fired");
    });
}

#[cfg(test)]
mod tests {
    use engine_component::{Aim, Entity, Projectile, Velocity};
    use engine_math::Vec2;

    use super::*;
    use crate::config::SimConfig;

    fn setup() -> (SimState, Entity) {
        let mut sim = SimState::new(SimConfig::default());
        let player = spawn::player(&mut sim.world, &sim.config, "ada");
        (sim, player)
    }

    fn aim(sim: &mut SimState, player: Entity, aim: Aim) {
        if let Some(mut w) = sim.world.write::<Weapon>(player) {
            w.set_pending(Some(aim));
        }
    }

    fn projectiles(sim: &mut SimState) -> usize {
        sim.world.query(&[ComponentKind::Projectile]).len()
    }

    #[test]
    fn test_fires_along_angle() {
        let (mut sim, player) = setup();
        aim(&mut sim, player, Aim::Angle(0.0));
        run(&mut sim);
        let shot = sim.world.query(&[ComponentKind::Projectile]).entities()[0];
        let v = sim.world.get::<Velocity>(shot).unwrap().vec();
        assert!((v - Vec2::new(sim.config.projectile_speed, 0.0)).length() < 1e-4);
        assert_eq!(sim.world.get::<Projectile>(shot).unwrap().owner, player);
        assert_eq!(sim.world.get::<Team>(shot).unwrap().side, Side::Players);
        assert_eq!(sim.world.get::<Weapon>(player).unwrap().pending, None);
    }

    #[test]
    fn test_cooldown_delays_next_shot() {
        let (mut sim, player) = setup();
        let cooldown = sim.config.weapon_cooldown_ticks;
        aim(&mut sim, player, Aim::Angle(0.0));
        run(&mut sim);
        assert_eq!(projectiles(&mut sim), 1);

        aim(&mut sim, player, Aim::Angle(1.0));
        for _ in 1..cooldown {
            run(&mut sim);
        }
        assert_eq!(projectiles(&mut sim), 1);
        assert!(sim.world.get::<Weapon>(player).unwrap().pending.is_some());

        run(&mut sim);
        assert_eq!(projectiles(&mut sim), 2);
    }

    #[test]
    fn test_aim_at_entity() {
        let (mut sim, player) = setup();
        let target = sim.world.create_entity();
        sim.world.insert_component(
            target,
            Position::new(sim.config.spawn_point.x, sim.config.spawn_point.y - 10.0),
        );
        aim(&mut sim, player, Aim::Target(target));
        run(&mut sim);
        let shot = sim.world.query(&[ComponentKind::Projectile]).entities()[0];
        let v = sim.world.get::<Velocity>(shot).unwrap().vec();
        assert!(v.y < 0.0 && v.x.abs() < 1e-4);
    }

    #[test]
    fn test_unresolvable_aim_is_discarded() {
        let (mut sim, player) = setup();
        aim(&mut sim, player, Aim::Target(Entity(999)));
        run(&mut sim);
        assert_eq!(projectiles(&mut sim), 0);
        let weapon = sim.world.get::<Weapon>(player).unwrap();
        assert_eq!(weapon.pending, None);
        assert_eq!(weapon.remaining_ticks, 0);
    }

    #[test]
    fn test_idle_weapon_stays_ready() {
        let (mut sim, player) = setup();
        run(&mut sim);
        run(&mut sim);
        assert_eq!(sim.world.get::<Weapon>(player).unwrap().remaining_ticks, 0);
        assert_eq!(projectiles(&mut sim), 0);
    }
}
