//! Procedural macros for neomap.
//!
//! This crate is not meant to be used directly — use the [`neomap`] facade
//! crate which re-exports the derive.

extern crate proc_macro;

use proc_macro::TokenStream;

mod entity;

/// Derive [`Entity`](neomap_core::descriptor::Entity) for a struct.
///
/// Builds the declarative [`EntityDescriptor`](neomap_core::descriptor::EntityDescriptor)
/// table from struct and field attributes. The struct must also derive
/// `serde::Serialize` and `serde::Deserialize` for the flattening codec.
///
/// # Attributes
///
/// **Struct-level:**
/// - `#[entity(label = "...")]` — set the Neo4j label. Defaults to the
///   struct name.
/// - `#[entity(extends = Base)]` — declare `Base` (itself an `Entity`) as
///   the base type for polymorphic matching.
///
/// **Field-level:**
/// - `#[entity(rename = "...")]` — override the serialized name (default:
///   field name). Pair it with `#[serde(rename = "...")]` so the codec and
///   the descriptor agree.
/// - `#[entity(complex)]` — a value-object field whose leaves flatten into
///   `parent_child` keys. The field's type must implement `Entity`.
/// - `#[entity(navigation)]` — a relationship field, excluded from the flat
///   record. Optionally `#[entity(navigation, foreign_key = "...")]` to
///   name the scalar acting as its foreign key (default convention:
///   `{field}_id`).
/// - `#[entity(skip)]` — exclude the field from the descriptor entirely.
///
/// # Example
///
/// ```rust,ignore
/// use neomap::prelude::*;
///
/// #[derive(Entity, Serialize, Deserialize)]
/// #[entity(label = "Person")]
/// struct Person {
///     id: i64,
///     name: String,
///     #[entity(complex)]
///     address: Address,
///     #[entity(navigation, foreign_key = "employer_id")]
///     employer: Option<EmployerRef>,
///     employer_id: i64,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity(input: TokenStream) -> TokenStream {
    entity::expand(input)
}
