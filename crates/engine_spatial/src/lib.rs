//! Collision broad phase.
//!
//! A quadtree over collidable entities, with narrow-phase re-validation of
//! every candidate against live component data.

mod index;
mod quadtree;

pub use index::{SpatialConfig, SpatialIndex, live_shape};
pub use quadtree::{QuadTree, QuadTreeConfig, QueryStats, SpatialPoint};
