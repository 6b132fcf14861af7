//! The pool store.
//!
//! [`World`] owns every component pool, the composed query cache, and the
//! diff builder. All structural changes go through it so the three stay
//! consistent: an add or remove updates the pool, every cached query that
//! covers the kind, and the live update packet before returning.
//!
//! Lookups never fail loudly. A missing entity or component is `None` (or
//! `false`) and callers branch on it; this is also how a system tolerates an
//! entity destroyed earlier in the same tick by another system.

use std::collections::BTreeSet;

use crate::component::{Component, ComponentDef};
use crate::components::{ComponentData, ComponentKind};
use crate::diff::{DiffBuilder, Packet};
use crate::entity::{Entity, EntityAllocator};
use crate::pool::ComponentPool;
use crate::query::{QueryCache, QueryKey, QueryResult};
use crate::tracked::Tracked;

/// A statically typed set of component kinds that can be fetched together.
///
/// Implemented for tuples of up to four component types.
pub trait ComponentTuple {
    /// The tuple of references produced for one entity.
    type Refs<'w>;

    /// The kinds making up the tuple.
    fn kinds() -> Vec<ComponentKind>;

    /// Fetch every component of the tuple for `entity`.
    fn fetch(world: &World, entity: Entity) -> Option<Self::Refs<'_>>;
}

macro_rules! impl_component_tuple {
    ($($t:ident),+) => {
        impl<$($t: Component),+> ComponentTuple for ($($t,)+) {
            type Refs<'w> = ($(&'w $t,)+);

            fn kinds() -> Vec<ComponentKind> {
                vec![$($t::KIND),+]
            }

            fn fetch(world: &World, entity: Entity) -> Option<Self::Refs<'_>> {
                Some(($(world.get::<$t>(entity)?,)+))
            }
        }
    };
}

impl_component_tuple!(A);
impl_component_tuple!(A, B);
impl_component_tuple!(A, B, C);
impl_component_tuple!(A, B, C, D);

/// Entity and component storage for one simulation.
#[derive(Debug)]
pub struct World {
    /// Entity ID allocator. Survives [`World::reset`].
    allocator: EntityAllocator,
    /// Live entities.
    alive: BTreeSet<Entity>,
    /// One pool per kind, indexed by [`ComponentKind::index`].
    pools: Vec<ComponentPool>,
    /// Composed query cache.
    queries: QueryCache,
    /// Update and catch-up packets.
    diff: DiffBuilder,
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            alive: BTreeSet::new(),
            pools: ComponentKind::ALL
                .iter()
                .map(|&kind| ComponentPool::new(kind))
                .collect(),
            queries: QueryCache::new(),
            diff: DiffBuilder::new(),
        }
    }

    // -- Entity lifecycle --

    /// Allocate a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.alive.insert(entity);
        entity
    }

    /// Destroy an entity: remove it from every pool and every cached query,
    /// and record one tombstone in the update packet.
    ///
    /// Unknown or already destroyed entities are ignored. Returns `true` if
    /// the entity was alive.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        for pool in &mut self.pools {
            pool.remove(entity);
        }
        self.queries.on_entity_destroyed(entity);
        self.diff.record_destroy(entity);
        tracing::debug!(entity = entity.id(), "entity destroyed");
        true
    }

    /// Returns `true` if `entity` exists.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.contains(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Iterate over live entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive.iter().copied()
    }

    // -- Component operations --

    /// Attach a fresh clone of `def`'s prototype to `entity`.
    ///
    /// Replaces any existing instance of the same kind. Returns `false` if
    /// the entity is not alive.
    pub fn add_component<T: Component>(&mut self, entity: Entity, def: &ComponentDef<T>) -> bool {
        self.insert_component(entity, def.instantiate())
    }

    /// Attach `value` to `entity`, recording a full snapshot for networked
    /// kinds.
    ///
    /// Replaces any existing instance of the same kind. Returns `false` if
    /// the entity is not alive.
    pub fn insert_component<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let data = value.into_data();
        if T::KIND.is_networked() {
            self.diff.record_add(entity, T::KIND, data.to_fields());
        }
        self.pools[T::KIND.index()].insert(entity, data);
        self.queries.on_component_added(entity, T::KIND, &self.pools);
        true
    }

    /// Detach `entity`'s component of type `T`, returning it.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let data = self.remove_kind(entity, T::KIND)?;
        T::from_data(&data).cloned()
    }

    /// Detach `entity`'s component of the given kind, returning it.
    pub fn remove_kind(&mut self, entity: Entity, kind: ComponentKind) -> Option<ComponentData> {
        let data = self.pools[kind.index()].remove(entity)?;
        self.queries.on_component_removed(entity, kind);
        self.diff.record_remove(entity, kind);
        Some(data)
    }

    /// Borrow `entity`'s component of type `T`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.pools[T::KIND.index()].get::<T>(entity)
    }

    /// Returns `true` if `entity` holds a component of `kind`.
    #[must_use]
    pub fn has(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.pools[kind.index()].contains(entity)
    }

    /// Kinds currently attached to `entity`.
    #[must_use]
    pub fn kinds_of(&self, entity: Entity) -> Vec<ComponentKind> {
        ComponentKind::ALL
            .iter()
            .copied()
            .filter(|k| self.has(entity, *k))
            .collect()
    }

    /// Diff-recording write access to `entity`'s component of type `T`.
    #[must_use]
    pub fn write<T: Component>(&mut self, entity: Entity) -> Option<Tracked<'_, T>> {
        let value = self.pools[T::KIND.index()].get_mut::<T>(entity)?;
        Some(Tracked::new(entity, value, &mut self.diff))
    }

    /// The pool holding `kind`.
    #[must_use]
    pub fn pool(&self, kind: ComponentKind) -> &ComponentPool {
        &self.pools[kind.index()]
    }

    // -- Queries --

    /// Entities holding every kind in `kinds`, memoised per kind set.
    pub fn query(&mut self, kinds: &[ComponentKind]) -> &QueryResult {
        let key = QueryKey::new(kinds);
        self.queries.get_or_build(&key, &self.pools)
    }

    /// Entities holding every component in `Q`, with references to those
    /// components.
    pub fn query_components<Q: ComponentTuple>(&mut self) -> Vec<(Entity, Q::Refs<'_>)> {
        let key = QueryKey::new(&Q::kinds());
        self.queries.get_or_build(&key, &self.pools);
        let world: &World = self;
        let Some(result) = world.queries.get(&key) else {
            return Vec::new();
        };
        result
            .entities()
            .iter()
            .filter_map(|&entity| Q::fetch(world, entity).map(|refs| (entity, refs)))
            .collect()
    }

    /// Invoke `f` for every entity holding all of `kinds`.
    ///
    /// The callback gets full access to the world. The matching set is
    /// captured up front; an entity destroyed (or stripped of a queried
    /// kind) earlier in the same pass is skipped when its turn comes, and
    /// entities that start matching during the pass are not visited.
    pub fn run_query<F>(&mut self, kinds: &[ComponentKind], mut f: F)
    where
        F: FnMut(&mut World, Entity),
    {
        let key = QueryKey::new(kinds);
        let snapshot = self
            .queries
            .get_or_build(&key, &self.pools)
            .entities()
            .to_vec();
        for entity in snapshot {
            let still_matches =
                self.is_alive(entity) && key.kinds().all(|kind| self.has(entity, kind));
            if still_matches {
                f(self, entity);
            }
        }
    }

    /// Number of composed queries currently cached.
    #[must_use]
    pub fn cached_query_count(&self) -> usize {
        self.queries.len()
    }

    // -- Network diff --

    /// Take this tick's update packet, merging it into the catch-up packet.
    pub fn drain_update_packet(&mut self) -> Packet {
        self.diff.drain()
    }

    /// Everything recorded since the last drain.
    #[must_use]
    pub fn pending_packet(&self) -> &Packet {
        self.diff.live()
    }

    /// Cumulative state of every drained update packet.
    #[must_use]
    pub fn catchup_packet(&self) -> &Packet {
        self.diff.catchup()
    }

    /// Remove every entity and component and both packets. Entity IDs keep
    /// increasing across resets.
    pub fn reset(&mut self) {
        self.alive.clear();
        for pool in &mut self.pools {
            pool.clear();
        }
        self.queries.invalidate();
        self.diff.reset();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
