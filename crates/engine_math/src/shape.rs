//! Collision shapes and exact overlap tests.
//!
//! These are the narrow-phase primitives: broad-phase candidates are always
//! re-checked here before being treated as real collisions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A circle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Centre of the circle.
    pub center: Vec2,
    /// Radius in world units.
    pub radius: f32,
}

impl Circle {
    /// Create a new circle.
    #[must_use]
    pub const fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Exact circle-circle overlap using squared distances.
    ///
    /// Touching circles count as overlapping.
    #[must_use]
    pub fn overlaps(&self, other: &Circle) -> bool {
        let combined = self.radius + other.radius;
        self.center.distance_squared(other.center) <= combined * combined
    }

    /// Exact circle-box overlap via the closest point on the box.
    #[must_use]
    pub fn overlaps_aabb(&self, aabb: &Aabb) -> bool {
        aabb.distance_squared_to(self.center) <= self.radius * self.radius
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner (inclusive).
    pub min: Vec2,
    /// Maximum corner (inclusive).
    pub max: Vec2,
}

impl Aabb {
    /// Create a box from its corners. The corners are normalised so that
    /// `min <= max` component-wise.
    #[must_use]
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box from its centre and half extents.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Centre point of the box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half the width and height.
    #[must_use]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Returns `true` if `point` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Exact AABB overlap. Shared edges count as overlapping.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// The point of the box nearest to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Squared distance from `point` to the nearest point of the box; zero
    /// when the point is inside.
    #[must_use]
    pub fn distance_squared_to(&self, point: Vec2) -> f32 {
        self.closest_point(point).distance_squared(point)
    }

    /// Split into four equal quadrants: NW, NE, SW, SE (y grows downwards,
    /// so "north" is the low-y half).
    #[must_use]
    pub fn quadrants(&self) -> [Aabb; 4] {
        let c = self.center();
        [
            Aabb::new(self.min, c),
            Aabb::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Aabb::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Aabb::new(c, self.max),
        ]
    }

    /// Grow the box so it also covers `point`.
    #[must_use]
    pub fn including(self, point: Vec2) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }
}

/// A positioned collision shape, the input of the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Aabb(Aabb),
}

impl Shape {
    /// Exact overlap between any two shapes.
    #[must_use]
    pub fn overlaps(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Circle(a), Shape::Circle(b)) => a.overlaps(b),
            (Shape::Circle(c), Shape::Aabb(b)) | (Shape::Aabb(b), Shape::Circle(c)) => {
                c.overlaps_aabb(b)
            }
            (Shape::Aabb(a), Shape::Aabb(b)) => a.overlaps(b),
        }
    }

    /// Radius of the smallest circle around the shape's centre that contains
    /// it. Used to insert boxes into the broad phase as points.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Aabb(b) => b.half_extents().length(),
        }
    }
}
