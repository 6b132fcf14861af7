//! Write access to component instances.
//!
//! [`Tracked`] is the only way to obtain mutable access to a pooled
//! component. Reads go through `Deref`; writes go through the generated
//! `set_<field>` methods, each of which stamps the update packet before
//! performing the write.

use std::ops::Deref;

use serde::Serialize;

use crate::component::Component;
use crate::diff::DiffBuilder;
use crate::entity::Entity;

/// A mutable, diff-recording handle to one component instance.
///
/// Obtained from [`World::write`](crate::World::write).
pub struct Tracked<'w, T: Component> {
    entity: Entity,
    value: &'w mut T,
    diff: &'w mut DiffBuilder,
}

impl<'w, T: Component> Tracked<'w, T> {
    pub(crate) fn new(entity: Entity, value: &'w mut T, diff: &'w mut DiffBuilder) -> Self {
        Self {
            entity,
            value,
            diff,
        }
    }

    /// The entity that owns this component.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Record a field write in the current update packet. A no-op for
    /// simulation-only kinds.
    pub(crate) fn stamp<V: Serialize>(&mut self, field: &'static str, value: &V) {
        if !T::KIND.is_networked() {
            return;
        }
        match serde_json::to_value(value) {
            Ok(value) => self.diff.record_field(self.entity, T::KIND, field, value),
            Err(e) => tracing::warn!(
                entity = self.entity.id(),
                kind = T::KIND.name(),
                field,
                %e,
                "failed to serialise field write"
            ),
        }
    }

    pub(crate) fn value_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<T: Component> Deref for Tracked<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: Component + std::fmt::Debug> std::fmt::Debug for Tracked<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked")
            .field("entity", &self.entity)
            .field("value", &self.value)
            .finish()
    }
}
