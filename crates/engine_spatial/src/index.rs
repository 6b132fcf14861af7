//! The collision broad phase.
//!
//! [`SpatialIndex`] holds a [`QuadTree`] of every entity with a `Position`
//! and a `Collider`, rebuilt from scratch every `rebuild_interval` ticks.
//! Between rebuilds the tree is stale by up to `rebuild_interval - 1` ticks:
//! moved entities are indexed at an old position, new entities are missing,
//! and destroyed ones are still present. Queries compensate by padding their
//! radius with [`SpatialIndex::staleness_margin`] and by re-checking every
//! candidate against live component data.

use engine_component::{Collider, ComponentKind, Entity, Position, World};
use engine_math::{Shape, Vec2};

use crate::quadtree::{QuadTree, QuadTreeConfig, SpatialPoint};

/// Broad-phase settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialConfig {
    pub tree: QuadTreeConfig,
    /// Ticks between full rebuilds. Must be at least 1.
    pub rebuild_interval: u64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            tree: QuadTreeConfig::default(),
            rebuild_interval: 4,
        }
    }
}

/// Periodically rebuilt quadtree over collidable entities.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: QuadTree,
    config: SpatialConfig,
    last_rebuild: Option<u64>,
}

impl SpatialIndex {
    #[must_use]
    pub fn new(config: SpatialConfig) -> Self {
        Self {
            tree: QuadTree::new(config.tree),
            config: SpatialConfig {
                rebuild_interval: config.rebuild_interval.max(1),
                ..config
            },
            last_rebuild: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Whether the tick loop should rebuild after `tick`.
    #[must_use]
    pub fn due(&self, tick: u64) -> bool {
        tick % self.config.rebuild_interval == 0
    }

    /// The tick of the last rebuild, if any.
    #[must_use]
    pub fn last_rebuild(&self) -> Option<u64> {
        self.last_rebuild
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Replace the tree with one built from the world's current contents.
    pub fn rebuild(&mut self, world: &World, tick: u64) {
        let points: Vec<SpatialPoint> = world
            .pool(ComponentKind::Collider)
            .entities()
            .iter()
            .filter_map(|&entity| {
                let shape = live_shape(world, entity)?;
                Some(SpatialPoint::new(entity, shape_center(&shape), shape.bounding_radius()))
            })
            .collect();
        self.tree = QuadTree::build(&points, self.config.tree);
        self.last_rebuild = Some(tick);
        tracing::debug!(tick, indexed = points.len(), depth = self.tree.depth(), "spatial index rebuilt");
    }

    /// Drop every indexed entity.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.last_rebuild = None;
    }

    /// How far an entity moving at up to `max_speed` units per second can
    /// drift from its indexed position before the next rebuild.
    #[must_use]
    pub fn staleness_margin(&self, max_speed: f32, dt: f32) -> f32 {
        max_speed * self.config.rebuild_interval as f32 * dt
    }

    /// Broad phase only: indexed points within `radius` of `center`, each
    /// grown by its own radius.
    #[must_use]
    pub fn query_circle(&self, center: Vec2, radius: f32) -> Vec<SpatialPoint> {
        self.tree.query_circle(center, radius)
    }

    /// Live entities whose collider overlaps `shape`.
    ///
    /// The broad-phase radius is the shape's bounding radius plus `margin`
    /// (normally [`SpatialIndex::staleness_margin`]). Every candidate is
    /// re-checked against its current `Position` and `Collider`; entities no
    /// longer alive or no longer collidable are dropped. `exclude` is never
    /// returned.
    #[must_use]
    pub fn overlapping(&self, world: &World, shape: &Shape, margin: f32, exclude: Option<Entity>) -> Vec<Entity> {
        let radius = shape.bounding_radius() + margin;
        self.tree
            .query_circle(shape_center(shape), radius)
            .into_iter()
            .filter(|p| Some(p.entity) != exclude)
            .filter(|p| {
                live_shape(world, p.entity).is_some_and(|other| shape.overlaps(&other))
            })
            .map(|p| p.entity)
            .collect()
    }

    /// Live entities whose collider overlaps `entity`'s collider.
    ///
    /// Empty if `entity` itself is dead or has no collider.
    #[must_use]
    pub fn collision_candidates(&self, world: &World, entity: Entity, margin: f32) -> Vec<Entity> {
        match live_shape(world, entity) {
            Some(shape) => self.overlapping(world, &shape, margin, Some(entity)),
            None => Vec::new(),
        }
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}

/// The entity's collider placed at its current position.
#[must_use]
pub fn live_shape(world: &World, entity: Entity) -> Option<Shape> {
    if !world.is_alive(entity) {
        return None;
    }
    let position = world.get::<Position>(entity)?;
    let collider = world.get::<Collider>(entity)?;
    Some(collider.shape.at(position.vec()))
}

fn shape_center(shape: &Shape) -> Vec2 {
    match shape {
        Shape::Circle(c) => c.center,
        Shape::Aabb(b) => b.center(),
    }
}
