//! Boss behaviour: seek the nearest player, fire attack patterns on a
//! cooldown, and move on to the next pattern after a fixed number of volleys.

use std::f32::consts::TAU;

use engine_component::{
    Boss, BossPattern, ComponentKind, Entity, Player, Position, Side, Velocity, World,
};
use engine_math::Vec2;
use tracing::debug;

use crate::config::SimConfig;
use crate::sim::SimState;
use crate::spawn::{self, Shot};

/// The boss stops closing in at this distance from its target.
const STAND_OFF: f32 = 8.0;
const RADIAL_COUNT: usize = 16;
const VOLLEY_COUNT: usize = 5;
/// Angle between neighbouring shots of an aimed volley, in radians.
const VOLLEY_SPREAD: f32 = 0.15;
const SPIRAL_ARMS: usize = 4;
/// Rotation of the spiral per volley, in radians.
const SPIRAL_STEP: f32 = 0.35;

pub fn run(sim: &mut SimState) {
    let players: Vec<Vec2> = sim
        .world
        .query_components::<(Player, Position)>()
        .into_iter()
        .map(|(_, (_, position))| position.vec())
        .collect();

    let SimState { world, config, .. } = sim;
    world.run_query(&[ComponentKind::Boss, ComponentKind::Position], |world, boss| {
        let Some(at) = world.get::<Position>(boss).map(Position::vec) else {
            return;
        };
        let Some(state) = world.get::<Boss>(boss).cloned() else {
            return;
        };
        let Some(target) = nearest(at, &players) else {
            if let Some(mut v) = world.write::<Velocity>(boss) {
                v.set_vec(Vec2::ZERO);
            }
            return;
        };

        seek(world, boss, at, target, state.speed);

        if state.cooldown_ticks > 0 {
            if let Some(mut b) = world.write::<Boss>(boss) {
                b.set_cooldown_ticks(state.cooldown_ticks - 1);
            }
            return;
        }

        let fired = fire(world, config, boss, at, target, &state);
        debug!(boss = boss.id(), pattern = ?state.pattern, volley = state.volley, fired, "boss volley");

        let volley = state.volley + 1;
        if let Some(mut b) = world.write::<Boss>(boss) {
            b.set_cooldown_ticks(config.boss_cooldown_ticks);
            if volley >= config.boss_volleys_per_pattern {
                b.set_pattern(state.pattern.next());
                b.set_volley(0);
            } else {
                b.set_volley(volley);
            }
        }
    });
}

fn nearest(from: Vec2, candidates: &[Vec2]) -> Option<Vec2> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
}

fn seek(world: &mut World, boss: Entity, at: Vec2, target: Vec2, speed: f32) {
    let to = target - at;
    let velocity = if to.length() > STAND_OFF {
        to.normalize_or_zero() * speed
    } else {
        Vec2::ZERO
    };
    if let Some(mut v) = world.write::<Velocity>(boss) {
        v.set_vec(velocity);
    }
}

/// Spawn one volley of `state.pattern`. Returns the number of projectiles.
fn fire(
    world: &mut World,
    config: &SimConfig,
    boss: Entity,
    at: Vec2,
    target: Vec2,
    state: &Boss,
) -> usize {
    let directions = pattern_directions(state.pattern, state.volley, target - at);
    for &direction in &directions {
        spawn::projectile(
            world,
            config,
            Shot {
                owner: boss,
                side: Side::Enemies,
                origin: at,
                direction,
                speed: config.boss_projectile_speed,
                damage: config.boss_projectile_damage,
            },
        );
    }
    directions.len()
}

/// Unit directions of one volley. `towards` points from the boss at its
/// target.
fn pattern_directions(pattern: BossPattern, volley: u32, towards: Vec2) -> Vec<Vec2> {
    match pattern {
        BossPattern::RadialBurst => {
            // Alternate volleys are offset by half a step to cover the gaps.
            let step = TAU / RADIAL_COUNT as f32;
            let offset = if volley % 2 == 1 { step / 2.0 } else { 0.0 };
            (0..RADIAL_COUNT)
                .map(|i| Vec2::from_angle(offset + step * i as f32))
                .collect()
        }
        BossPattern::AimedVolley => {
            let aim = towards.y.atan2(towards.x);
            let half = (VOLLEY_COUNT - 1) as f32 / 2.0;
            (0..VOLLEY_COUNT)
                .map(|i| Vec2::from_angle(aim + (i as f32 - half) * VOLLEY_SPREAD))
                .collect()
        }
        BossPattern::Spiral => {
            let base = volley as f32 * SPIRAL_STEP;
            (0..SPIRAL_ARMS)
                .map(|i| Vec2::from_angle(base + TAU * i as f32 / SPIRAL_ARMS as f32))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{Projectile, Team};

    use super::*;

    fn setup(boss_at: Vec2) -> (SimState, Entity) {
        let mut sim = SimState::new(SimConfig::default());
        let boss = spawn::boss(&mut sim.world, &sim.config, boss_at);
        (sim, boss)
    }

    fn boss_state(sim: &SimState, boss: Entity) -> Boss {
        sim.world.get::<Boss>(boss).cloned().unwrap()
    }

    fn projectiles(sim: &mut SimState) -> Vec<Entity> {
        sim.world.query(&[ComponentKind::Projectile]).entities().to_vec()
    }

    #[test]
    fn test_idle_without_players() {
        let (mut sim, boss) = setup(Vec2::ZERO);
        for _ in 0..100 {
            run(&mut sim);
        }
        assert!(projectiles(&mut sim).is_empty());
        assert_eq!(sim.world.get::<Velocity>(boss).unwrap().vec(), Vec2::ZERO);
    }

    #[test]
    fn test_seeks_nearest_player() {
        let (mut sim, boss) = setup(Vec2::ZERO);
        let near = spawn::player(&mut sim.world, &sim.config, "near");
        if let Some(mut p) = sim.world.write::<Position>(near) {
            p.set_vec(Vec2::new(-20.0, 0.0));
        }
        spawn::player(&mut sim.world, &sim.config, "far");
        run(&mut sim);
        let v = sim.world.get::<Velocity>(boss).unwrap().vec();
        assert!((v - Vec2::new(-sim.config.boss_speed, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_stops_within_stand_off() {
        let (mut sim, boss) = setup(sim_spawn_offset(STAND_OFF - 1.0));
        spawn::player(&mut sim.world, &sim.config, "ada");
        run(&mut sim);
        assert_eq!(sim.world.get::<Velocity>(boss).unwrap().vec(), Vec2::ZERO);
    }

    fn sim_spawn_offset(dy: f32) -> Vec2 {
        SimConfig::default().spawn_point - Vec2::new(0.0, dy)
    }

    #[test]
    fn test_cooldown_then_radial_burst() {
        let (mut sim, boss) = setup(Vec2::ZERO);
        spawn::player(&mut sim.world, &sim.config, "ada");
        let cooldown = sim.config.boss_cooldown_ticks;
        for _ in 0..cooldown {
            run(&mut sim);
        }
        assert!(projectiles(&mut sim).is_empty());
        run(&mut sim);
        let shots = projectiles(&mut sim);
        assert_eq!(shots.len(), RADIAL_COUNT);
        for shot in shots {
            assert_eq!(sim.world.get::<Projectile>(shot).unwrap().owner, boss);
            assert_eq!(sim.world.get::<Team>(shot).unwrap().side, Side::Enemies);
        }
        let state = boss_state(&sim, boss);
        assert_eq!(state.volley, 1);
        assert_eq!(state.cooldown_ticks, cooldown);
    }

    #[test]
    fn test_patterns_cycle_after_volleys() {
        let mut sim = SimState::new(SimConfig {
            boss_cooldown_ticks: 0,
            boss_volleys_per_pattern: 2,
            ..SimConfig::default()
        });
        let boss = spawn::boss(&mut sim.world, &sim.config, Vec2::ZERO);
        if let Some(mut b) = sim.world.write::<Boss>(boss) {
            b.set_cooldown_ticks(0);
        }
        spawn::player(&mut sim.world, &sim.config, "ada");

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(boss_state(&sim, boss).pattern);
            run(&mut sim);
        }
        assert_eq!(
            seen,
            vec![
                BossPattern::RadialBurst,
                BossPattern::RadialBurst,
                BossPattern::AimedVolley,
                BossPattern::AimedVolley,
                BossPattern::Spiral,
                BossPattern::Spiral,
            ]
        );
        assert_eq!(boss_state(&sim, boss).pattern, BossPattern::RadialBurst);
    }

    #[test]
    fn test_aimed_volley_is_centred_on_target() {
        let dirs = pattern_directions(BossPattern::AimedVolley, 0, Vec2::new(0.0, 10.0));
        assert_eq!(dirs.len(), VOLLEY_COUNT);
        let centre = dirs[VOLLEY_COUNT / 2];
        assert!((centre - Vec2::Y).length() < 1e-5);
        let sum: Vec2 = dirs.iter().copied().sum();
        assert!(sum.x.abs() < 1e-4);
    }

    #[test]
    fn test_spiral_rotates_between_volleys() {
        let first = pattern_directions(BossPattern::Spiral, 0, Vec2::X);
        let second = pattern_directions(BossPattern::Spiral, 1, Vec2::X);
        assert_eq!(first.len(), SPIRAL_ARMS);
        let turned = first[0].angle_to(second[0]);
        assert!((turned - SPIRAL_STEP).abs() < 1e-5);
    }

    #[test]
    fn test_radial_burst_alternates_offset() {
        let even = pattern_directions(BossPattern::RadialBurst, 0, Vec2::X);
        let odd = pattern_directions(BossPattern::RadialBurst, 1, Vec2::X);
        assert!((even[0] - Vec2::X).length() < 1e-6);
        assert!(even[0].angle_to(odd[0]) > 0.0);
    }
}
