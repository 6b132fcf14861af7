//! Entity identifiers.
//!
//! An entity is a number and nothing else. On the wire it is written as that
//! bare number, or as its decimal string where it keys a packet map.

use serde::{Deserialize, Serialize};

/// An entity identifier. Ids start at 1 and are never reused by the
/// [`World`](crate::World) that issued them, even after a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub u64);

impl Entity {
    /// Never issued by an allocator.
    pub const NONE: Entity = Entity(0);

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out entity ids in increasing order.
#[derive(Debug)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> Entity {
        let entity = Entity(self.next);
        self.next += 1;
        entity
    }

    /// How many ids have been issued.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next - 1
    }

    /// Whether `entity` was issued by this allocator. Says nothing about
    /// whether it is still alive.
    #[must_use]
    pub fn issued_id(&self, entity: Entity) -> bool {
        (1..self.next).contains(&entity.0)
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
