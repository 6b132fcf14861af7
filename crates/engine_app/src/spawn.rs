//! Entity spawn routines.
//!
//! Each routine creates an entity and attaches its full component set in
//! one go, so the first update packet carrying the entity holds a complete
//! snapshot of every networked component.

use engine_component::{
    Aim, Boss, BossPattern, Collider, ColliderShape, ComponentDef, Entity, Health, Interactable,
    Lifetime, MoveIntent, Player, Position, Projectile, Side, Team, Velocity, Weapon, World,
};
use engine_math::Vec2;

use crate::config::SimConfig;

const AT_REST: ComponentDef<Velocity> = ComponentDef::new("at_rest", Velocity::ZERO);

const IDLE: ComponentDef<MoveIntent> = ComponentDef::new(
    "idle",
    MoveIntent {
        velocity: None,
        target: None,
    },
);

const PLAYERS: ComponentDef<Team> = ComponentDef::new("players", Team { side: Side::Players });

const ENEMIES: ComponentDef<Team> = ComponentDef::new("enemies", Team { side: Side::Enemies });

fn circle(radius: f32) -> Collider {
    Collider {
        shape: ColliderShape::Circle { radius },
    }
}

/// A player-controlled entity at the spawn point.
pub fn player(world: &mut World, config: &SimConfig, name: &str) -> Entity {
    let e = world.create_entity();
    world.insert_component(e, Position::new(config.spawn_point.x, config.spawn_point.y));
    world.add_component(e, &AT_REST);
    world.insert_component(e, circle(config.player_radius));
    world.insert_component(e, Health::full(config.player_health));
    world.add_component(e, &PLAYERS);
    world.insert_component(
        e,
        Player {
            name: name.to_string(),
            speed: config.player_speed,
        },
    );
    world.add_component(e, &IDLE);
    world.insert_component(
        e,
        Weapon {
            cooldown_ticks: config.weapon_cooldown_ticks,
            remaining_ticks: 0,
            projectile_speed: config.projectile_speed,
            damage: config.projectile_damage,
            pending: None,
        },
    );
    e
}

/// The boss, idle at `at`.
pub fn boss(world: &mut World, config: &SimConfig, at: Vec2) -> Entity {
    let e = world.create_entity();
    world.insert_component(e, Position::new(at.x, at.y));
    world.add_component(e, &AT_REST);
    world.insert_component(e, circle(config.boss_radius));
    world.insert_component(e, Health::full(config.boss_health));
    world.add_component(e, &ENEMIES);
    world.insert_component(
        e,
        Boss {
            pattern: BossPattern::RadialBurst,
            cooldown_ticks: config.boss_cooldown_ticks,
            volley: 0,
            speed: config.boss_speed,
        },
    );
    e
}

/// A health pickup at `at`.
pub fn pickup(world: &mut World, config: &SimConfig, at: Vec2) -> Entity {
    let e = world.create_entity();
    world.insert_component(e, Position::new(at.x, at.y));
    world.insert_component(e, circle(0.5));
    world.insert_component(
        e,
        Interactable {
            heal: config.pickup_heal,
        },
    );
    e
}

/// Parameters of one projectile.
#[derive(Debug, Clone, Copy)]
pub struct Shot {
    pub owner: Entity,
    pub side: Side,
    pub origin: Vec2,
    /// Unit direction of travel.
    pub direction: Vec2,
    pub speed: f32,
    pub damage: f32,
}

/// A projectile flying from `shot.origin` along `shot.direction`.
pub fn projectile(world: &mut World, config: &SimConfig, shot: Shot) -> Entity {
    let e = world.create_entity();
    let velocity = shot.direction * shot.speed;
    world.insert_component(e, Position::new(shot.origin.x, shot.origin.y));
    world.insert_component(
        e,
        Velocity {
            x: velocity.x,
            y: velocity.y,
        },
    );
    world.insert_component(e, circle(config.projectile_radius));
    world.insert_component(e, Team { side: shot.side });
    world.insert_component(
        e,
        Projectile {
            owner: shot.owner,
            damage: shot.damage,
        },
    );
    world.insert_component(
        e,
        Lifetime {
            remaining_ticks: config.projectile_lifetime_ticks,
        },
    );
    e
}

/// Unit direction for `aim` fired from `from`, or `None` if the aim cannot
/// be resolved (dead target, zero-length direction).
#[must_use]
pub fn aim_direction(world: &World, from: Vec2, aim: Aim) -> Option<Vec2> {
    match aim {
        Aim::Angle(angle) => Some(Vec2::from_angle(angle)),
        Aim::Target(target) => {
            let at = world.get::<Position>(target)?.vec();
            (at - from).try_normalize()
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_component::ComponentKind;

    use super::*;

    #[test]
    fn test_player_is_fully_networked_on_spawn() {
        let mut world = World::new();
        let config = SimConfig::default();
        let e = player(&mut world, &config, "ada");
        let packet = world.drain_update_packet();
        for kind in [
            ComponentKind::Position,
            ComponentKind::Velocity,
            ComponentKind::Collider,
            ComponentKind::Health,
            ComponentKind::Team,
            ComponentKind::Player,
        ] {
            assert!(packet.component(e, kind).is_some(), "{kind:?} missing");
        }
        assert!(packet.component(e, ComponentKind::Weapon).is_none());
        assert!(packet.component(e, ComponentKind::MoveIntent).is_none());
        assert!(world.has(e, ComponentKind::Weapon));
    }

    #[test]
    fn test_projectile_velocity_follows_direction() {
        let mut world = World::new();
        let config = SimConfig::default();
        let e = projectile(
            &mut world,
            &config,
            Shot {
                owner: Entity(1),
                side: Side::Players,
                origin: Vec2::ZERO,
                direction: Vec2::Y,
                speed: 10.0,
                damage: 5.0,
            },
        );
        assert_eq!(world.get::<Velocity>(e).map(Velocity::vec), Some(Vec2::new(0.0, 10.0)));
        assert_eq!(
            world.get::<Lifetime>(e).map(|l| l.remaining_ticks),
            Some(config.projectile_lifetime_ticks)
        );
    }

    #[test]
    fn test_aim_direction() {
        let mut world = World::new();
        let target = world.create_entity();
        world.insert_component(target, Position::new(0.0, 5.0));
        let dir = aim_direction(&world, Vec2::ZERO, Aim::Target(target)).unwrap();
        assert!((dir - Vec2::Y).length() < 1e-6);
        assert!(aim_direction(&world, Vec2::ZERO, Aim::Target(Entity(99))).is_none());
        assert!(aim_direction(&world, Vec2::new(0.0, 5.0), Aim::Target(target)).is_none());
        let angled = aim_direction(&world, Vec2::ZERO, Aim::Angle(0.0)).unwrap();
        assert!((angled - Vec2::X).length() < 1e-6);
    }
}
