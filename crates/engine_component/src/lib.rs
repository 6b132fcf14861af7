//! Entity/component storage for the simulation.
//!
//! Components live in one pool per kind. Systems read them through
//! [`World::get`] and write them through [`Tracked`] handles, which record
//! every networked field change into the current tick's update packet. The
//! [`QueryCache`] memoises multi-kind joins and is maintained incrementally
//! as components come and go.

#[macro_use]
mod component;
mod components;
mod diff;
mod entity;
mod pool;
mod query;
mod tracked;
mod world;

pub use component::{Component, ComponentDef};
pub use components::{
    Aim, Boss, BossPattern, Collider, ColliderShape, ComponentData, ComponentKind, Health,
    Interactable, Lifetime, MoveIntent, Player, Position, Projectile, Side, Team, Velocity, Weapon,
};
pub use diff::{ComponentPatch, DiffBuilder, EntityPatch, Packet};
pub use entity::{Entity, EntityAllocator};
pub use pool::ComponentPool;
pub use query::{QueryCache, QueryKey, QueryResult};
pub use tracked::Tracked;
pub use world::{ComponentTuple, World};
