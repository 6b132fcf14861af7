//! Composed query cache.
//!
//! A composed query joins several component pools into the list of entities
//! holding all of the requested kinds. Each distinct kind set is computed
//! once, on first access, and from then on kept in step with every add,
//! remove, and destroy instead of being recomputed per tick.
//!
//! Entities appear in the order in which they came to match the query; for
//! a freshly built entry that is the insertion order of the lowest kind's
//! pool.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::components::ComponentKind;
use crate::entity::Entity;
use crate::pool::ComponentPool;

/// A sorted, de-duplicated set of component kinds identifying one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(BTreeSet<ComponentKind>);

impl QueryKey {
    /// Build a key from kinds given in any order.
    #[must_use]
    pub fn new(kinds: &[ComponentKind]) -> Self {
        Self(kinds.iter().copied().collect())
    }

    /// The kinds in this key, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.0.iter().copied()
    }

    /// Returns `true` if the key contains `kind`.
    #[must_use]
    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.0.contains(&kind)
    }

    /// Returns `true` if the key has no kinds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The memoised result of one composed query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    entities: Vec<Entity>,
    members: HashSet<Entity>,
}

impl QueryResult {
    /// Matching entities.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns `true` if `entity` matches.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn push(&mut self, entity: Entity) {
        if self.members.insert(entity) {
            self.entities.push(entity);
        }
    }

    fn remove(&mut self, entity: Entity) {
        if self.members.remove(&entity) {
            self.entities.retain(|&e| e != entity);
        }
    }
}

/// Cache of composed queries keyed by kind set.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, QueryResult>,
}

impl QueryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of kind sets currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` has a built entry.
    #[must_use]
    pub fn is_cached(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the entry for `key`, building it from `pools` on first access.
    ///
    /// `pools` must be indexed by [`ComponentKind::index`].
    pub fn get_or_build(&mut self, key: &QueryKey, pools: &[ComponentPool]) -> &QueryResult {
        if !self.entries.contains_key(key) {
            let result = Self::build(key, pools);
            tracing::debug!(kinds = ?key.0, matches = result.len(), "built composed query");
            self.entries.insert(key.clone(), result);
        }
        &self.entries[key]
    }

    /// Look up a built entry without building it.
    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<&QueryResult> {
        self.entries.get(key)
    }

    fn build(key: &QueryKey, pools: &[ComponentPool]) -> QueryResult {
        let mut result = QueryResult::default();
        let mut kinds = key.kinds();
        let Some(first) = kinds.next() else {
            return result;
        };
        let rest: Vec<ComponentKind> = kinds.collect();
        for &entity in pools[first.index()].entities() {
            if rest.iter().all(|k| pools[k.index()].contains(entity)) {
                result.push(entity);
            }
        }
        result
    }

    /// `entity` gained `kind`. Every cached query containing `kind` picks
    /// the entity up if it now holds all of that query's kinds.
    pub fn on_component_added(&mut self, entity: Entity, kind: ComponentKind, pools: &[ComponentPool]) {
        for (key, result) in &mut self.entries {
            if key.contains(kind) && key.kinds().all(|k| pools[k.index()].contains(entity)) {
                result.push(entity);
            }
        }
    }

    /// `entity` lost `kind`. Every cached query containing `kind` drops it.
    pub fn on_component_removed(&mut self, entity: Entity, kind: ComponentKind) {
        for (key, result) in &mut self.entries {
            if key.contains(kind) {
                result.remove(entity);
            }
        }
    }

    /// `entity` was destroyed. Every cached query drops it.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        for result in self.entries.values_mut() {
            result.remove(entity);
        }
    }

    /// Drop every entry; each is rebuilt lazily on next access.
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::components::{Health, Position, Velocity};

    fn pools() -> Vec<ComponentPool> {
        ComponentKind::ALL.iter().map(|&k| ComponentPool::new(k)).collect()
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = QueryKey::new(&[ComponentKind::Velocity, ComponentKind::Position]);
        let b = QueryKey::new(&[ComponentKind::Position, ComponentKind::Velocity, ComponentKind::Position]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_joins_pools() {
        let mut pools = pools();
        pools[ComponentKind::Position.index()].insert(Entity(1), Position::new(0.0, 0.0).into_data());
        pools[ComponentKind::Position.index()].insert(Entity(2), Position::new(0.0, 0.0).into_data());
        pools[ComponentKind::Velocity.index()].insert(Entity(2), Velocity::ZERO.into_data());

        let mut cache = QueryCache::new();
        let key = QueryKey::new(&[ComponentKind::Position, ComponentKind::Velocity]);
        assert_eq!(cache.get_or_build(&key, &pools).entities(), &[Entity(2)]);
        assert!(cache.is_cached(&key));
    }

    #[test]
    fn test_incremental_add_and_remove() {
        let mut pools = pools();
        let mut cache = QueryCache::new();
        let key = QueryKey::new(&[ComponentKind::Position, ComponentKind::Health]);
        assert!(cache.get_or_build(&key, &pools).is_empty());

        pools[ComponentKind::Position.index()].insert(Entity(3), Position::new(0.0, 0.0).into_data());
        cache.on_component_added(Entity(3), ComponentKind::Position, &pools);
        assert!(cache.get(&key).unwrap().is_empty());

        pools[ComponentKind::Health.index()].insert(Entity(3), Health::full(1.0).into_data());
        cache.on_component_added(Entity(3), ComponentKind::Health, &pools);
        assert_eq!(cache.get(&key).unwrap().entities(), &[Entity(3)]);

        cache.on_component_removed(Entity(3), ComponentKind::Health);
        assert!(!cache.get(&key).unwrap().contains(Entity(3)));
    }

    #[test]
    fn test_unrelated_kind_does_not_touch_entry() {
        let mut pools = pools();
        let mut cache = QueryCache::new();
        let key = QueryKey::new(&[ComponentKind::Position]);
        pools[ComponentKind::Position.index()].insert(Entity(1), Position::new(0.0, 0.0).into_data());
        cache.get_or_build(&key, &pools);
        cache.on_component_removed(Entity(1), ComponentKind::Velocity);
        assert!(cache.get(&key).unwrap().contains(Entity(1)));
    }

    #[test]
    fn test_invalidate_rebuilds_lazily() {
        let mut pools = pools();
        let mut cache = QueryCache::new();
        let key = QueryKey::new(&[ComponentKind::Position]);
        cache.get_or_build(&key, &pools);
        pools[ComponentKind::Position.index()].insert(Entity(9), Position::new(0.0, 0.0).into_data());
        cache.invalidate();
        assert!(!cache.is_cached(&key));
        assert_eq!(cache.get_or_build(&key, &pools).entities(), &[Entity(9)]);
    }
}
