//! Declarative entity descriptors.
//!
//! Instead of re-deriving field metadata through reflection on every call,
//! each entity type carries a descriptor table built once at compile time
//! (usually by `#[derive(Entity)]`) and interpreted by the registry and the
//! flattening codec.

use std::any::{Any, TypeId};

use crate::error::NeomapError;

/// An entity type that can be registered with an
/// [`EntityRegistry`](crate::registry::EntityRegistry).
///
/// Usually implemented via `#[derive(Entity)]` from `neomap-macros`, which
/// builds the [`EntityDescriptor`] from struct and field attributes. Manual
/// implementations are perfectly fine for tests or exotic layouts.
///
/// Entities must also implement `serde::Serialize` and
/// `serde::de::DeserializeOwned` for the flattening codec to operate on
/// them; the descriptor's [`deserialize`](EntityDescriptor::deserialize)
/// hook is the erased entry point used for polymorphic reconstruction.
pub trait Entity: 'static {
    /// The Neo4j label for this entity (e.g. `"Person"`).
    const LABEL: &'static str;

    /// Build this type's field descriptor table.
    fn descriptor() -> EntityDescriptor;
}

/// Classifies how a field participates in the flat record.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Stored directly under its serialized name.
    Scalar,
    /// A value-object field whose scalar leaves are spliced into the parent
    /// record under `parent_child` names. Carries the complex type's
    /// descriptor so the registry can register and expand it.
    Complex(fn() -> EntityDescriptor),
    /// A relationship field, excluded from the flat record entirely.
    Navigation,
}

impl FieldKind {
    pub fn is_complex(&self) -> bool {
        matches!(self, FieldKind::Complex(_))
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, FieldKind::Navigation)
    }
}

impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Scalar => f.write_str("Scalar"),
            FieldKind::Complex(_) => f.write_str("Complex"),
            FieldKind::Navigation => f.write_str("Navigation"),
        }
    }
}

/// One declared field of an entity type.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    /// The Rust field name.
    pub name: &'static str,
    /// The serialized name (defaults to `name`; overridden by
    /// `#[entity(rename = "...")]`).
    pub serialized: &'static str,
    /// Scalar, complex, or navigation.
    pub kind: FieldKind,
    /// For navigation fields: the explicitly declared foreign-key field
    /// name. When absent, the `{name}_id` convention applies.
    pub foreign_key: Option<&'static str>,
}

impl FieldDescriptor {
    /// A scalar field serialized under its own name.
    pub fn scalar(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            serialized: name,
            kind: FieldKind::Scalar,
            foreign_key: None,
        }
    }

    /// A complex (value-object) field backed by `descriptor`.
    pub fn complex(name: &'static str, descriptor: fn() -> EntityDescriptor) -> Self {
        FieldDescriptor {
            name,
            serialized: name,
            kind: FieldKind::Complex(descriptor),
            foreign_key: None,
        }
    }

    /// A navigation (relationship) field, excluded from the flat record.
    pub fn navigation(name: &'static str) -> Self {
        FieldDescriptor {
            name,
            serialized: name,
            kind: FieldKind::Navigation,
            foreign_key: None,
        }
    }

    /// Override the serialized name.
    pub fn renamed(mut self, serialized: &'static str) -> Self {
        self.serialized = serialized;
        self
    }

    /// Declare an explicit foreign key for a navigation field.
    pub fn with_foreign_key(mut self, fk: &'static str) -> Self {
        self.foreign_key = Some(fk);
        self
    }
}

/// Erased deserializer: flat JSON object in, boxed entity out.
pub type ErasedDeserialize = fn(serde_json::Value) -> Result<Box<dyn Any + Send>, NeomapError>;

/// The compile-time-built metadata table for one entity type.
///
/// Immutable once constructed; [`EntityRegistry`](crate::registry::EntityRegistry)
/// resolves it into an [`EntityMetadata`](crate::metadata::EntityMetadata)
/// with computed flat names.
#[derive(Clone)]
pub struct EntityDescriptor {
    /// Runtime identity of the described type.
    pub type_id: TypeId,
    /// Human-readable type name, used in errors and tie-breaking.
    pub type_name: &'static str,
    /// Neo4j label.
    pub label: &'static str,
    /// Declared base type, if any.
    pub extends: Option<fn() -> EntityDescriptor>,
    /// Declared fields, in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Erased serde-based constructor for polymorphic reconstruction.
    pub deserialize: ErasedDeserialize,
}

impl EntityDescriptor {
    /// Convenience constructor for hand-built descriptors.
    pub fn new<T>(
        type_name: &'static str,
        label: &'static str,
        fields: Vec<FieldDescriptor>,
    ) -> Self
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        EntityDescriptor {
            type_id: TypeId::of::<T>(),
            type_name,
            label,
            extends: None,
            fields,
            deserialize: |value| {
                let entity: T = serde_json::from_value(value)?;
                Ok(Box::new(entity) as Box<dyn Any + Send>)
            },
        }
    }

    /// Declare this type as extending `base`.
    pub fn extending(mut self, base: fn() -> EntityDescriptor) -> Self {
        self.extends = Some(base);
        self
    }

    /// Number of bases in the extends chain. More-derived types have a
    /// greater depth; the registry sorts candidates by this, descending.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.extends;
        while let Some(base) = current {
            depth += 1;
            current = base().extends;
        }
        depth
    }

    /// Walk `self` and its extends chain, bases first.
    pub fn lineage(&self) -> Vec<EntityDescriptor> {
        let mut chain = vec![self.clone()];
        let mut current = self.extends;
        while let Some(base) = current {
            let base = base();
            current = base.extends;
            chain.push(base);
        }
        chain.reverse();
        chain
    }
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("type_name", &self.type_name)
            .field("label", &self.label)
            .field("fields", &self.fields)
            .finish()
    }
}
