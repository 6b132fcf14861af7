//! Network diff building.
//!
//! The [`DiffBuilder`] records every externally visible mutation of the
//! current tick into a sparse [`Packet`]:
//!
//! - adding a component records a full snapshot of its fields,
//! - a field write records that field's new value,
//! - removing a component records a component tombstone,
//! - destroying an entity records an entity tombstone, which replaces any
//!   earlier entry for that entity.
//!
//! Draining hands the live packet to the caller, merges a copy into the
//! cumulative catch-up packet, and leaves an empty live packet behind. The
//! catch-up packet only ever describes live entities: a destroyed entity
//! leaves it entirely, so its size follows the world, not its history.
//!
//! ## Wire shape
//!
//! ```text
//! { "<entity>": null | { "<kind>": null | { "<field>": <value>, ... } } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::components::ComponentKind;
use crate::entity::Entity;

/// The change recorded for one component of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentPatch {
    /// The component was removed. Serialises as `null`.
    Removed,
    /// Field values that were added or changed.
    Fields(Map<String, Value>),
}

/// The change recorded for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityPatch {
    /// The entity was destroyed. Serialises as `null`.
    Destroyed,
    /// Per-component changes.
    Components(BTreeMap<ComponentKind, ComponentPatch>),
}

impl EntityPatch {
    /// Returns the component map, or `None` for a tombstone.
    #[must_use]
    pub fn components(&self) -> Option<&BTreeMap<ComponentKind, ComponentPatch>> {
        match self {
            EntityPatch::Destroyed => None,
            EntityPatch::Components(map) => Some(map),
        }
    }
}

/// A sparse entity → component → fields mapping.
///
/// Used both for per-tick update packets and for the cumulative catch-up
/// packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Packet {
    entities: BTreeMap<Entity, EntityPatch>,
}

impl Packet {
    /// Create an empty packet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// The entry for `entity`, if any.
    #[must_use]
    pub fn entity(&self, entity: Entity) -> Option<&EntityPatch> {
        self.entities.get(&entity)
    }

    /// The entry for one component of `entity`, if any.
    #[must_use]
    pub fn component(&self, entity: Entity, kind: ComponentKind) -> Option<&ComponentPatch> {
        self.entities.get(&entity)?.components()?.get(&kind)
    }

    /// The recorded value of one field, if any.
    #[must_use]
    pub fn field(&self, entity: Entity, kind: ComponentKind, field: &str) -> Option<&Value> {
        match self.component(entity, kind)? {
            ComponentPatch::Fields(fields) => fields.get(field),
            ComponentPatch::Removed => None,
        }
    }

    /// Returns `true` if `entity` carries an entity tombstone.
    #[must_use]
    pub fn is_destroyed(&self, entity: Entity) -> bool {
        matches!(self.entities.get(&entity), Some(EntityPatch::Destroyed))
    }

    /// Iterate over every entity entry in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &EntityPatch)> {
        self.entities.iter().map(|(e, p)| (*e, p))
    }

    /// Slot for `entity`'s component map. `None` if the entity is
    /// tombstoned: nothing may be recorded for it after destruction.
    fn components_mut(
        &mut self,
        entity: Entity,
    ) -> Option<&mut BTreeMap<ComponentKind, ComponentPatch>> {
        match self
            .entities
            .entry(entity)
            .or_insert_with(|| EntityPatch::Components(BTreeMap::new()))
        {
            EntityPatch::Destroyed => None,
            EntityPatch::Components(map) => Some(map),
        }
    }

    /// Apply a newer packet on top of this one, as a client mirror would.
    ///
    /// - An entity tombstone drops everything known about the entity. A
    ///   mirror built from the result has never heard of it, so it cannot
    ///   come back from here.
    /// - A component tombstone drops the component.
    /// - Field maps are shallow-merged: top-level fields overwrite, nested
    ///   values are replaced wholesale.
    ///
    /// Entity ids are never reused and a destroyed entity accepts no further
    /// writes, so no newer packet carries components for a dropped entity.
    pub fn merge(&mut self, newer: &Packet) {
        for (&entity, patch) in &newer.entities {
            match patch {
                EntityPatch::Destroyed => {
                    self.entities.remove(&entity);
                }
                EntityPatch::Components(components) => {
                    let Some(known) = self.components_mut(entity) else {
                        continue;
                    };
                    for (&kind, component) in components {
                        match component {
                            ComponentPatch::Removed => {
                                known.remove(&kind);
                            }
                            ComponentPatch::Fields(fields) => {
                                let slot = known
                                    .entry(kind)
                                    .or_insert_with(|| ComponentPatch::Fields(Map::new()));
                                match slot {
                                    ComponentPatch::Fields(existing) => {
                                        for (name, value) in fields {
                                            existing.insert(name.clone(), value.clone());
                                        }
                                    }
                                    ComponentPatch::Removed => {
                                        *slot = ComponentPatch::Fields(fields.clone());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Records mutations into the live update packet and maintains the catch-up
/// packet.
///
/// Only networked component kinds are recorded.
#[derive(Debug, Default)]
pub struct DiffBuilder {
    live: Packet,
    catchup: Packet,
}

impl DiffBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly added component as a full snapshot.
    pub fn record_add(&mut self, entity: Entity, kind: ComponentKind, fields: Map<String, Value>) {
        if !kind.is_networked() {
            return;
        }
        if let Some(components) = self.live.components_mut(entity) {
            components.insert(kind, ComponentPatch::Fields(fields));
        }
    }

    /// Record a single field write.
    pub fn record_field(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        field: &'static str,
        value: Value,
    ) {
        if !kind.is_networked() {
            return;
        }
        let Some(components) = self.live.components_mut(entity) else {
            return;
        };
        let slot = components
            .entry(kind)
            .or_insert_with(|| ComponentPatch::Fields(Map::new()));
        match slot {
            ComponentPatch::Fields(fields) => {
                fields.insert(field.to_string(), value);
            }
            ComponentPatch::Removed => {
                let mut fields = Map::new();
                fields.insert(field.to_string(), value);
                *slot = ComponentPatch::Fields(fields);
            }
        }
    }

    /// Record a component removal.
    pub fn record_remove(&mut self, entity: Entity, kind: ComponentKind) {
        if !kind.is_networked() {
            return;
        }
        if let Some(components) = self.live.components_mut(entity) {
            components.insert(kind, ComponentPatch::Removed);
        }
    }

    /// Record an entity destruction. Replaces anything recorded earlier in
    /// the tick for that entity.
    pub fn record_destroy(&mut self, entity: Entity) {
        self.live.entities.insert(entity, EntityPatch::Destroyed);
    }

    /// The packet accumulated since the last drain, without draining it.
    #[must_use]
    pub fn live(&self) -> &Packet {
        &self.live
    }

    /// Take the live packet, merge it into the catch-up packet, and reset
    /// the live packet to empty.
    ///
    /// The returned packet is owned: no later write can land in it.
    pub fn drain(&mut self) -> Packet {
        let drained = std::mem::take(&mut self.live);
        self.catchup.merge(&drained);
        drained
    }

    /// Cumulative state of every drained packet.
    #[must_use]
    pub fn catchup(&self) -> &Packet {
        &self.catchup
    }

    /// Drop both packets.
    pub fn reset(&mut self) {
        self.live = Packet::new();
        self.catchup = Packet::new();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    const A: Entity = Entity(1);
    const B: Entity = Entity(2);

    #[test]
    fn test_add_records_full_snapshot() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Health, fields(json!({"current": 100.0, "max": 100.0})));
        let packet = diff.drain();
        assert_eq!(packet.field(A, ComponentKind::Health, "current"), Some(&json!(100.0)));
        assert_eq!(packet.field(A, ComponentKind::Health, "max"), Some(&json!(100.0)));
    }

    #[test]
    fn test_non_networked_kinds_are_ignored() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Lifetime, fields(json!({"remaining_ticks": 3})));
        diff.record_field(A, ComponentKind::MoveIntent, "target", Value::Null);
        diff.record_remove(A, ComponentKind::Weapon);
        assert!(diff.live().is_empty());
    }

    #[test]
    fn test_destroy_overrides_earlier_entries() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Position, fields(json!({"x": 1.0, "y": 2.0})));
        diff.record_destroy(A);
        diff.record_field(A, ComponentKind::Position, "x", json!(5.0));
        let packet = diff.drain();
        assert!(packet.is_destroyed(A));
        assert_eq!(packet.len(), 1);
    }

    #[test]
    fn test_drain_is_idempotent() {
        let mut diff = DiffBuilder::new();
        diff.record_field(A, ComponentKind::Health, "current", json!(90.0));
        assert!(!diff.drain().is_empty());
        assert!(diff.drain().is_empty());
    }

    #[test]
    fn test_catchup_shallow_merges_fields() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Health, fields(json!({"current": 100.0, "max": 100.0})));
        diff.drain();
        diff.record_field(A, ComponentKind::Health, "current", json!(90.0));
        diff.drain();
        let catchup = diff.catchup();
        assert_eq!(catchup.field(A, ComponentKind::Health, "current"), Some(&json!(90.0)));
        assert_eq!(catchup.field(A, ComponentKind::Health, "max"), Some(&json!(100.0)));
    }

    #[test]
    fn test_catchup_replaces_nested_values_wholesale() {
        let mut catchup = Packet::new();
        let mut first = DiffBuilder::new();
        first.record_add(
            A,
            ComponentKind::Collider,
            fields(json!({"shape": {"shape": "box", "half_width": 1.0, "half_height": 2.0}})),
        );
        catchup.merge(&first.drain());
        first.record_field(
            A,
            ComponentKind::Collider,
            "shape",
            json!({"shape": "circle", "radius": 3.0}),
        );
        catchup.merge(&first.drain());
        assert_eq!(
            catchup.field(A, ComponentKind::Collider, "shape"),
            Some(&json!({"shape": "circle", "radius": 3.0}))
        );
    }

    #[test]
    fn test_destroyed_entity_leaves_catchup() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Position, fields(json!({"x": 0.0, "y": 0.0})));
        diff.record_add(B, ComponentKind::Position, fields(json!({"x": 1.0, "y": 1.0})));
        diff.drain();
        diff.record_destroy(A);
        let update = diff.drain();

        // The update still tells existing mirrors; the catch-up forgets A.
        assert!(update.is_destroyed(A));
        assert!(diff.catchup().entity(A).is_none());
        assert!(diff.catchup().entity(B).is_some());
        assert!(diff.catchup().iter().all(|(_, p)| p.components().is_some()));
    }

    #[test]
    fn test_spawn_and_destroy_in_one_tick_never_reaches_catchup() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Position, fields(json!({"x": 0.0, "y": 0.0})));
        diff.record_destroy(A);
        assert!(diff.drain().is_destroyed(A));
        assert!(diff.catchup().is_empty());
    }

    #[test]
    fn test_component_removal_drops_from_catchup() {
        let mut diff = DiffBuilder::new();
        diff.record_add(A, ComponentKind::Health, fields(json!({"current": 5.0, "max": 5.0})));
        diff.drain();
        diff.record_remove(A, ComponentKind::Health);
        let packet = diff.drain();
        assert_eq!(packet.component(A, ComponentKind::Health), Some(&ComponentPatch::Removed));
        assert!(diff.catchup().component(A, ComponentKind::Health).is_none());
    }

    #[test]
    fn test_wire_shape() {
        let mut diff = DiffBuilder::new();
        diff.record_field(A, ComponentKind::Health, "current", json!(90.0));
        diff.record_remove(A, ComponentKind::Boss);
        diff.record_destroy(B);
        let value = serde_json::to_value(diff.drain()).unwrap();
        assert_eq!(
            value,
            json!({
                "1": { "health": { "current": 90.0 }, "boss": null },
                "2": null,
            })
        );
    }
}
