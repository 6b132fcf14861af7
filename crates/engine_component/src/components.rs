//! The component kinds of the simulation.
//!
//! Kinds marked `networked: false` are simulation-only and never reach an
//! update or catch-up packet.

use engine_math::{Aabb, Circle, Shape, Vec2};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::tracked::Tracked;

/// Which side an entity fights for. Projectiles only damage the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Players,
    Enemies,
}

/// Collider geometry, relative to the entity's [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColliderShape {
    Circle { radius: f32 },
    Box { half_width: f32, half_height: f32 },
}

impl ColliderShape {
    /// Place the shape at a world position.
    #[must_use]
    pub fn at(&self, center: Vec2) -> Shape {
        match *self {
            ColliderShape::Circle { radius } => Shape::Circle(Circle::new(center, radius)),
            ColliderShape::Box {
                half_width,
                half_height,
            } => Shape::Aabb(Aabb::from_center(center, Vec2::new(half_width, half_height))),
        }
    }
}

/// How a weapon shot is aimed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aim {
    /// Radians, 0 = +x, counter-clockwise.
    Angle(f32),
    /// Fire at another entity's current position.
    Target(Entity),
}

/// Attack patterns a boss cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossPattern {
    /// Evenly spaced ring of projectiles.
    RadialBurst,
    /// Narrow fan aimed at the nearest player.
    AimedVolley,
    /// Rotating arms that advance with every volley.
    Spiral,
}

impl BossPattern {
    /// The pattern that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            BossPattern::RadialBurst => BossPattern::AimedVolley,
            BossPattern::AimedVolley => BossPattern::Spiral,
            BossPattern::Spiral => BossPattern::RadialBurst,
        }
    }
}

define_components! {
    /// World-space position.
    Position(Position) as "position", networked: true {
        x: f32 => set_x,
        y: f32 => set_y,
    }

    /// Linear velocity in world units per second.
    Velocity(Velocity) as "velocity", networked: true {
        x: f32 => set_x,
        y: f32 => set_y,
    }

    /// Collision geometry. Entities with a `Position` and a `Collider` are
    /// indexed by the broad phase.
    Collider(Collider) as "collider", networked: true {
        shape: ColliderShape => set_shape,
    }

    /// Hit points.
    Health(Health) as "health", networked: true {
        current: f32 => set_current,
        max: f32 => set_max,
    }

    Team(Team) as "team", networked: true {
        side: Side => set_side,
    }

    /// Marks an entity owned by a client connection.
    Player(Player) as "player", networked: true {
        name: String => set_name,
        /// Movement speed in world units per second.
        speed: f32 => set_speed,
    }

    /// The latest movement request from the owning client.
    MoveIntent(MoveIntent) as "move_intent", networked: false {
        velocity: Option<Vec2> => set_velocity,
        target: Option<Vec2> => set_target,
    }

    Weapon(Weapon) as "weapon", networked: false {
        cooldown_ticks: u32 => set_cooldown_ticks,
        remaining_ticks: u32 => set_remaining_ticks,
        projectile_speed: f32 => set_projectile_speed,
        damage: f32 => set_damage,
        /// A shot requested by the client, fired once the cooldown allows.
        pending: Option<Aim> => set_pending,
    }

    Projectile(Projectile) as "projectile", networked: true {
        owner: Entity => set_owner,
        damage: f32 => set_damage,
    }

    /// Ticks until the entity is destroyed.
    Lifetime(Lifetime) as "lifetime", networked: false {
        remaining_ticks: u32 => set_remaining_ticks,
    }

    Boss(Boss) as "boss", networked: true {
        pattern: BossPattern => set_pattern,
        /// Ticks until the next volley.
        cooldown_ticks: u32 => set_cooldown_ticks,
        /// Volleys fired in the current pattern.
        volley: u32 => set_volley,
        speed: f32 => set_speed,
    }

    /// Something a player can use by standing close and interacting.
    Interactable(Interactable) as "interactable", networked: true {
        heal: f32 => set_heal,
    }
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Velocity {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Health {
    /// Create a new health component at full HP.
    #[must_use]
    pub const fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Returns `true` if the entity is alive (HP > 0).
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }
}

impl Tracked<'_, Position> {
    /// Write both coordinates. Only coordinates that actually change are
    /// recorded.
    pub fn set_vec(&mut self, v: Vec2) {
        if self.x != v.x {
            self.set_x(v.x);
        }
        if self.y != v.y {
            self.set_y(v.y);
        }
    }
}

impl Tracked<'_, Velocity> {
    /// Write both components. Only components that actually change are
    /// recorded.
    pub fn set_vec(&mut self, v: Vec2) {
        if self.x != v.x {
            self.set_x(v.x);
        }
        if self.y != v.y {
            self.set_y(v.y);
        }
    }
}

impl Tracked<'_, Health> {
    /// Apply damage, clamping to zero.
    pub fn damage(&mut self, amount: f32) {
        let current = (self.current - amount).max(0.0);
        self.set_current(current);
    }

    /// Heal, clamping to max.
    pub fn heal(&mut self, amount: f32) {
        let current = (self.current + amount).min(self.max);
        self.set_current(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;

    #[test]
    fn test_networked_flags() {
        assert!(ComponentKind::Health.is_networked());
        assert!(ComponentKind::Position.is_networked());
        assert!(!ComponentKind::MoveIntent.is_networked());
        assert!(!ComponentKind::Lifetime.is_networked());
        assert!(!ComponentKind::Weapon.is_networked());
    }

    #[test]
    fn test_collider_shape_placement() {
        let shape = ColliderShape::Box {
            half_width: 1.0,
            half_height: 2.0,
        }
        .at(Vec2::new(5.0, 5.0));
        match shape {
            Shape::Aabb(b) => {
                assert_eq!(b.min, Vec2::new(4.0, 3.0));
                assert_eq!(b.max, Vec2::new(6.0, 7.0));
            }
            Shape::Circle(_) => panic!("expected a box"),
        }
    }

    #[test]
    fn test_nested_shape_serializes_as_one_field() {
        let fields = Collider {
            shape: ColliderShape::Circle { radius: 2.0 },
        }
        .into_data()
        .to_fields();
        assert_eq!(
            fields["shape"],
            serde_json::json!({ "shape": "circle", "radius": 2.0 })
        );
    }

    #[test]
    fn test_boss_pattern_cycles() {
        let start = BossPattern::RadialBurst;
        assert_eq!(start.next().next().next(), start);
    }

    #[test]
    fn test_health_alive() {
        assert!(Health::full(10.0).is_alive());
        assert!(!Health { current: 0.0, max: 10.0 }.is_alive());
    }
}
