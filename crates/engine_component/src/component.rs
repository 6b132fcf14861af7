//! Core [`Component`] trait and component definitions.
//!
//! The set of component kinds is closed: every kind is declared once through
//! [`define_components!`], which generates the [`ComponentKind`] tag, the
//! [`ComponentData`] payload enum, the payload structs, and the tracked
//! setters used to mutate them. Dispatch on kind is therefore checked at
//! compile time instead of going through string-keyed lookups.
//!
//! [`ComponentKind`]: crate::ComponentKind
//! [`ComponentData`]: crate::ComponentData

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::components::{ComponentData, ComponentKind};

/// The core component trait.
///
/// Implemented only by the payload structs generated in
/// [`components`](crate::components). Components must be serialisable so the
/// diff builder can snapshot them for network transport.
pub trait Component: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The kind tag for this component type.
    const KIND: ComponentKind;

    /// Wrap this value in the type-erased payload enum.
    fn into_data(self) -> ComponentData;

    /// Borrow this type out of a payload, if the payload holds it.
    fn from_data(data: &ComponentData) -> Option<&Self>;

    /// Mutably borrow this type out of a payload, if the payload holds it.
    fn from_data_mut(data: &mut ComponentData) -> Option<&mut Self>;
}

/// An immutable, named component prototype.
///
/// A definition is both a type key (through `T::KIND`) and an initialiser:
/// [`World::add_component`](crate::World::add_component) clones the
/// prototype into the entity's slot.
///
/// ```rust
/// use engine_component::{ComponentDef, Health};
///
/// const GRUNT_HEALTH: ComponentDef<Health> =
///     ComponentDef::new("grunt_health", Health { current: 40.0, max: 40.0 });
/// assert_eq!(GRUNT_HEALTH.name(), "grunt_health");
/// ```
#[derive(Debug, Clone)]
pub struct ComponentDef<T: Component> {
    name: &'static str,
    prototype: T,
}

impl<T: Component> ComponentDef<T> {
    /// Create a new definition.
    #[must_use]
    pub const fn new(name: &'static str, prototype: T) -> Self {
        Self { name, prototype }
    }

    /// The definition's name, used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The kind of component this definition produces.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        T::KIND
    }

    /// Borrow the prototype.
    #[must_use]
    pub const fn prototype(&self) -> &T {
        &self.prototype
    }

    /// Produce a fresh instance.
    #[must_use]
    pub fn instantiate(&self) -> T {
        self.prototype.clone()
    }
}

/// Declares the closed set of component kinds.
///
/// For each entry this generates the payload struct (public fields, read via
/// `&T`), its [`Component`] impl, a `set_<field>` method on
/// [`Tracked`](crate::Tracked) for every field, and one variant in both
/// `ComponentKind` and `ComponentData`.
macro_rules! define_components {
    ($(
        $(#[$meta:meta])*
        $kind:ident($name:ident) as $wire:literal, networked: $net:literal {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty => $setter:ident ),* $(,)?
        }
    )*) => {
        /// Tag identifying a component type.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum ComponentKind {
            $( $kind, )*
        }

        impl ComponentKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [ComponentKind] = &[ $( ComponentKind::$kind, )* ];

            /// Whether instances of this kind are replicated to clients.
            #[must_use]
            pub const fn is_networked(self) -> bool {
                match self {
                    $( ComponentKind::$kind => $net, )*
                }
            }

            /// The wire name of this kind.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $( ComponentKind::$kind => $wire, )*
                }
            }

            /// Dense index of this kind, used to address its pool.
            #[must_use]
            pub const fn index(self) -> usize {
                self as usize
            }
        }

        /// A component instance of any kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ComponentData {
            $( $kind($name), )*
        }

        impl ComponentData {
            /// The kind tag of the held payload.
            #[must_use]
            pub fn kind(&self) -> ComponentKind {
                match self {
                    $( ComponentData::$kind(_) => ComponentKind::$kind, )*
                }
            }

            /// Serialise every field of the payload.
            #[must_use]
            pub fn to_fields(&self) -> serde_json::Map<String, serde_json::Value> {
                let value = match self {
                    $( ComponentData::$kind(inner) => serde_json::to_value(inner), )*
                };
                match value {
                    Ok(serde_json::Value::Object(fields)) => fields,
                    Ok(_) => serde_json::Map::new(),
                    Err(e) => {
                        tracing::warn!(kind = self.kind().name(), %e, "failed to snapshot component");
                        serde_json::Map::new()
                    }
                }
            }
        }

        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
            pub struct $name {
                $( $(#[$fmeta])* pub $field: $ty, )*
            }

            impl $crate::component::Component for $name {
                const KIND: ComponentKind = ComponentKind::$kind;

                fn into_data(self) -> ComponentData {
                    ComponentData::$kind(self)
                }

                fn from_data(data: &ComponentData) -> Option<&Self> {
                    match data {
                        ComponentData::$kind(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_data_mut(data: &mut ComponentData) -> Option<&mut Self> {
                    match data {
                        ComponentData::$kind(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl<'w> $crate::tracked::Tracked<'w, $name> {
                $(
                    #[doc = concat!("Write `", stringify!($field), "` and record it in the update packet.")]
                    pub fn $setter(&mut self, value: $ty) {
                        self.stamp(stringify!($field), &value);
                        self.value_mut().$field = value;
                    }
                )*
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Health, Position};

    const TEST_HEALTH: ComponentDef<Health> =
        ComponentDef::new("test_health", Health { current: 10.0, max: 10.0 });

    #[test]
    fn test_definition_is_type_key_and_template() {
        assert_eq!(TEST_HEALTH.kind(), ComponentKind::Health);
        let a = TEST_HEALTH.instantiate();
        let b = TEST_HEALTH.instantiate();
        assert_eq!(a, b);
        assert_eq!(a, *TEST_HEALTH.prototype());
    }

    #[test]
    fn test_data_roundtrip_through_enum() {
        let data = Position { x: 1.0, y: 2.0 }.into_data();
        assert_eq!(data.kind(), ComponentKind::Position);
        assert_eq!(Position::from_data(&data), Some(&Position { x: 1.0, y: 2.0 }));
        assert!(Health::from_data(&data).is_none());
    }

    #[test]
    fn test_wire_name_matches_serde_tag() {
        for kind in ComponentKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str(), Some(kind.name()));
        }
    }

    #[test]
    fn test_index_is_dense() {
        for (i, kind) in ComponentKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_to_fields_snapshots_all_fields() {
        let fields = Health { current: 90.0, max: 100.0 }.into_data().to_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["current"], serde_json::json!(90.0));
    }
}
