//! Core engine for neomap: entity descriptors and registry, metadata
//! resolution, the flattening codec, the expression projection engine, and
//! the query-fragment writer.
//!
//! This crate is not meant to be used directly — use the [`neomap`] facade
//! crate instead, which re-exports everything you need.

pub mod descriptor;
pub mod error;
pub mod expr;
pub mod flatten;
pub mod fragment;
pub mod metadata;
pub mod projection;
pub mod registry;
pub mod value;

pub use descriptor::{Entity, EntityDescriptor, FieldDescriptor, FieldKind};
pub use error::NeomapError;
pub use expr::Expr;
pub use flatten::FlatRecord;
pub use fragment::{Direction, Fragment, FragmentWriter, ParamMode};
pub use metadata::{EntityMetadata, NameResolver, NULL_SENTINEL};
pub use projection::{Pair, PairValue, Pairs};
pub use registry::EntityRegistry;
