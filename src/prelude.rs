//! Convenience re-exports for common neomap usage.
//!
//! ```rust
//! use neomap::prelude::*;
//! ```
//!
//! This imports the `Entity` derive macro and trait, the registry and its
//! builder, the expression types, the flatten codec, the query builder with
//! its fragment enums, the error type, and [`EntityStream`].

pub use crate::query::{BuiltQuery, GraphQuery};
pub use crate::stream::EntityStream;
pub use crate::Entity;
pub use neomap_core::descriptor::{Entity as EntityTrait, EntityDescriptor, FieldDescriptor, FieldKind};
pub use neomap_core::error::NeomapError;
pub use neomap_core::expr::Expr;
pub use neomap_core::flatten::{flatten, unflatten, unflatten_dynamic, FlatRecord};
pub use neomap_core::fragment::{Direction, Fragment, FragmentWriter, ParamMode};
pub use neomap_core::metadata::{EntityMetadata, NameResolver, NULL_SENTINEL};
pub use neomap_core::projection::{Pair, PairValue, Pairs};
pub use neomap_core::registry::{EntityRegistry, RegistryBuilder};
