//! Per-kind component storage.
//!
//! A [`ComponentPool`] owns every instance of one component kind. Instances
//! are stored densely with entity IDs in a parallel vector, so iteration
//! follows insertion order.

use std::collections::HashMap;

use crate::component::Component;
use crate::components::{ComponentData, ComponentKind};
use crate::entity::Entity;

/// Storage for all instances of one component kind.
#[derive(Debug, Clone)]
pub struct ComponentPool {
    /// The kind stored in this pool.
    kind: ComponentKind,
    /// Entity IDs in insertion order. `entities[i]` owns `data[i]`.
    entities: Vec<Entity>,
    /// Component instances, parallel with `entities`.
    data: Vec<ComponentData>,
    /// Row lookup.
    rows: HashMap<Entity, usize>,
}

impl ComponentPool {
    /// Create a new empty pool for the given kind.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            entities: Vec::new(),
            data: Vec::new(),
            rows: HashMap::new(),
        }
    }

    /// The kind stored in this pool.
    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Returns the number of instances stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if this pool holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns `true` if `entity` has an instance in this pool.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Insert or replace `entity`'s instance. A replaced instance keeps its
    /// position in iteration order. Returns the previous instance, if any.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `data` is of a different kind.
    pub fn insert(&mut self, entity: Entity, data: ComponentData) -> Option<ComponentData> {
        debug_assert_eq!(data.kind(), self.kind, "component kind mismatch");
        if let Some(&row) = self.rows.get(&entity) {
            return Some(std::mem::replace(&mut self.data[row], data));
        }
        self.rows.insert(entity, self.entities.len());
        self.entities.push(entity);
        self.data.push(data);
        None
    }

    /// Remove `entity`'s instance, preserving the order of the remaining
    /// instances.
    pub fn remove(&mut self, entity: Entity) -> Option<ComponentData> {
        let row = self.rows.remove(&entity)?;
        self.entities.remove(row);
        let removed = self.data.remove(row);
        for e in &self.entities[row..] {
            if let Some(r) = self.rows.get_mut(e) {
                *r -= 1;
            }
        }
        Some(removed)
    }

    /// Borrow `entity`'s instance as type-erased data.
    #[must_use]
    pub fn get_data(&self, entity: Entity) -> Option<&ComponentData> {
        let row = *self.rows.get(&entity)?;
        self.data.get(row)
    }

    /// Borrow `entity`'s instance as `T`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        T::from_data(self.get_data(entity)?)
    }

    /// Mutably borrow `entity`'s instance as `T`.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let row = *self.rows.get(&entity)?;
        T::from_data_mut(self.data.get_mut(row)?)
    }

    /// Entities in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate over `(entity, instance)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &ComponentData)> {
        self.entities.iter().copied().zip(self.data.iter())
    }

    /// Drop every instance.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.data.clear();
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Health, Position};

    fn pos(x: f32) -> ComponentData {
        Position::new(x, 0.0).into_data()
    }

    #[test]
    fn test_insert_and_get() {
        let mut pool = ComponentPool::new(ComponentKind::Position);
        pool.insert(Entity(1), pos(3.0));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get::<Position>(Entity(1)).map(|p| p.x), Some(3.0));
        assert!(pool.get::<Position>(Entity(2)).is_none());
        assert!(pool.get::<Health>(Entity(1)).is_none());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut pool = ComponentPool::new(ComponentKind::Position);
        pool.insert(Entity(1), pos(1.0));
        pool.insert(Entity(2), pos(2.0));
        let previous = pool.insert(Entity(1), pos(10.0));
        assert_eq!(previous, Some(pos(1.0)));
        assert_eq!(pool.entities(), &[Entity(1), Entity(2)]);
        assert_eq!(pool.get::<Position>(Entity(1)).map(|p| p.x), Some(10.0));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut pool = ComponentPool::new(ComponentKind::Position);
        for i in 1..=4 {
            pool.insert(Entity(i), pos(i as f32));
        }
        assert_eq!(pool.remove(Entity(2)), Some(pos(2.0)));
        assert_eq!(pool.entities(), &[Entity(1), Entity(3), Entity(4)]);
        // Row lookup still resolves after the shift.
        assert_eq!(pool.get::<Position>(Entity(4)).map(|p| p.x), Some(4.0));
        assert_eq!(pool.get::<Position>(Entity(3)).map(|p| p.x), Some(3.0));
        assert!(pool.remove(Entity(2)).is_none());
    }

    #[test]
    fn test_get_mut() {
        let mut pool = ComponentPool::new(ComponentKind::Position);
        pool.insert(Entity(7), pos(0.0));
        if let Some(p) = pool.get_mut::<Position>(Entity(7)) {
            p.x = 5.0;
        }
        assert_eq!(pool.get::<Position>(Entity(7)).map(|p| p.x), Some(5.0));
    }
}
