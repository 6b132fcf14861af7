//! # engine_math
//!
//! 2D math for the authoritative simulation. Re-exports [`glam`] for vector
//! arithmetic and defines the collision shapes used by the narrow phase.

pub mod shape;

// Re-export glam types for convenience.
pub use glam::Vec2;

pub use shape::{Aabb, Circle, Shape};
