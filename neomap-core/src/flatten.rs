//! Flattening and unflattening of entities.
//!
//! The wire/storage form of an entity is a single-level key-value map in
//! which each complex field's scalar leaves appear under `parent_child`
//! keys. The store drops null-valued keys, so a side list of logically-null
//! field names travels with every record (folded into the
//! [`NULL_SENTINEL`] key on the wire).

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::NeomapError;
use crate::metadata::{EntityMetadata, NULL_SENTINEL};
use crate::registry::EntityRegistry;

/// The serialized form of an entity: a flat key-value map plus the
/// null-tracking side list.
///
/// Null-valued fields never appear in `values`; their flat names are listed
/// in `null_keys` instead, so an intentional null survives the store's
/// null-stripping and round-trips back to a logical null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatRecord {
    pub values: BTreeMap<String, Value>,
    pub null_keys: Vec<String>,
}

impl FlatRecord {
    pub fn new() -> Self {
        FlatRecord::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Insert a present value. Nulls belong in `null_keys`, not here.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn is_null(&self, key: &str) -> bool {
        self.null_keys.iter().any(|k| k == key)
    }

    /// All known keys: present values plus tracked nulls. This is the key
    /// set polymorphic matching runs against.
    pub fn key_set(&self) -> BTreeSet<String> {
        self.values
            .keys()
            .cloned()
            .chain(self.null_keys.iter().cloned())
            .collect()
    }

    /// Fold the null side list into the sentinel key, producing the map
    /// that actually goes to the store.
    pub fn to_wire(&self) -> BTreeMap<String, Value> {
        let mut out = self.values.clone();
        let nulls: Vec<Value> = self
            .null_keys
            .iter()
            .map(|k| Value::String(k.clone()))
            .collect();
        out.insert(NULL_SENTINEL.to_owned(), Value::Array(nulls));
        out
    }

    /// Extract the sentinel key back out of a wire map. Unknown sentinel
    /// payload shapes are a mapping error, not silently dropped.
    pub fn from_wire(mut map: BTreeMap<String, Value>) -> Result<Self, NeomapError> {
        let null_keys = match map.remove(NULL_SENTINEL) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    other => Err(NeomapError::Mapping(format!(
                        "null-tracking sentinel contains a non-string entry: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(NeomapError::Mapping(format!(
                    "null-tracking sentinel is not a list: {other}"
                )));
            }
        };
        // Stored nulls (if any survived) count as tracked nulls too.
        let mut values = BTreeMap::new();
        let mut null_keys = null_keys;
        for (k, v) in map {
            if v.is_null() {
                if !null_keys.iter().any(|n| n == &k) {
                    null_keys.push(k);
                }
            } else {
                values.insert(k, v);
            }
        }
        Ok(FlatRecord { values, null_keys })
    }
}

/// Flatten `entity` into its flat record and null side list.
///
/// Scalar fields serialize directly. Each complex field must be non-null
/// ([`NeomapError::ComplexNull`] otherwise); its concrete variant is chosen
/// by structurally matching the nested object's keys against the declared
/// type and its registered subtypes, and leaves belonging only to *other*
/// subtypes are skipped entirely rather than reported null. A leaf whose
/// serialized value is still an object means true nesting and fails with
/// [`NeomapError::NestedComplex`].
pub fn flatten<T: serde::Serialize>(
    entity: &T,
    meta: &EntityMetadata,
) -> Result<FlatRecord, NeomapError> {
    let tree = serde_json::to_value(entity)?;
    flatten_value(&tree, meta)
}

/// Flatten an already-serialized JSON tree. The entry point used by the
/// facade when the entity was produced dynamically.
pub fn flatten_value(tree: &Value, meta: &EntityMetadata) -> Result<FlatRecord, NeomapError> {
    let obj = tree.as_object().ok_or_else(|| {
        NeomapError::Mapping(format!(
            "{} did not serialize to an object",
            meta.type_name
        ))
    })?;

    let mut record = FlatRecord::new();
    // Chosen concrete variant per complex field, decided when the excluded
    // parent entry is visited (parents precede their leaves in field order).
    let mut chosen: BTreeMap<&str, &BTreeSet<String>> = BTreeMap::new();

    for field in &meta.fields {
        if field.flat_name == NULL_SENTINEL {
            continue;
        }
        if field.excluded {
            // The complex field itself: must be a non-null object.
            let parent = field.path[0].as_str();
            let nested = match obj.get(parent) {
                Some(Value::Object(nested)) => nested,
                Some(Value::Null) | None => {
                    return Err(NeomapError::complex_null(field.field_name));
                }
                Some(_) => {
                    return Err(NeomapError::Mapping(format!(
                        "complex field '{}' did not serialize to an object",
                        field.field_name
                    )));
                }
            };
            let keys: BTreeSet<String> = nested.keys().cloned().collect();
            let variants = meta
                .complex_variants
                .get(parent)
                .ok_or_else(|| NeomapError::Mapping(format!(
                    "no variant table for complex field '{}'",
                    field.field_name
                )))?;
            let variant = variants
                .iter()
                .find(|v| v.leaf_names.is_subset(&keys))
                .ok_or_else(|| {
                    NeomapError::no_matching_type(
                        field.source_type_name,
                        keys.iter().map(String::as_str),
                    )
                })?;
            chosen.insert(parent, &variant.leaf_names);
            continue;
        }
        match field.path.as_slice() {
            [name] => {
                copy_leaf(&mut record, &field.flat_name, obj.get(name), field.field_name)?;
            }
            [parent, child] => {
                // Skip leaves that do not apply to the concrete variant
                // actually present.
                let applies = chosen
                    .get(parent.as_str())
                    .map(|leaves| leaves.contains(child))
                    .unwrap_or(false);
                if !applies {
                    continue;
                }
                let nested = obj.get(parent).and_then(Value::as_object);
                let value = nested.and_then(|n| n.get(child));
                copy_leaf(&mut record, &field.flat_name, value, field.field_name)?;
            }
            _ => {}
        }
    }

    Ok(record)
}

fn copy_leaf(
    record: &mut FlatRecord,
    flat_name: &str,
    value: Option<&Value>,
    field_name: &str,
) -> Result<(), NeomapError> {
    match value {
        None | Some(Value::Null) => {
            record.null_keys.push(flat_name.to_owned());
        }
        Some(Value::Object(_)) => {
            return Err(NeomapError::nested_complex(field_name, flat_name));
        }
        Some(v) => {
            record.values.insert(flat_name.to_owned(), v.clone());
        }
    }
    Ok(())
}

/// Rebuild the nested JSON tree a flat record came from.
///
/// Tracked null keys are re-added as explicit nulls before grouping, so a
/// field intentionally set to null upstream deserializes to a logical null
/// rather than appearing never-emitted.
pub fn nest(record: &FlatRecord, meta: &EntityMetadata) -> Result<Value, NeomapError> {
    let mut effective: BTreeMap<&str, Value> = record
        .values
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    for key in &record.null_keys {
        effective.entry(key.as_str()).or_insert(Value::Null);
    }

    let mut obj = Map::new();
    for field in &meta.fields {
        if field.flat_name == NULL_SENTINEL {
            continue;
        }
        if field.excluded {
            obj.entry(field.path[0].clone())
                .or_insert_with(|| Value::Object(Map::new()));
            continue;
        }
        let Some(value) = effective.remove(field.flat_name.as_str()) else {
            continue;
        };
        match field.path.as_slice() {
            [name] => {
                obj.insert(name.clone(), value);
            }
            [parent, child] => {
                let slot = obj
                    .entry(parent.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(nested) = slot {
                    nested.insert(child.clone(), value);
                }
            }
            _ => {}
        }
    }
    Ok(Value::Object(obj))
}

/// Reconstruct a typed entity from its flat record.
pub fn unflatten<T: serde::de::DeserializeOwned>(
    record: &FlatRecord,
    meta: &EntityMetadata,
) -> Result<T, NeomapError> {
    let tree = nest(record, meta)?;
    Ok(serde_json::from_value(tree)?)
}

/// Polymorphic reconstruction: match `record` against the registered types
/// under `base` (most-specific-first) and build the winner through its
/// erased deserialize hook.
pub fn unflatten_dynamic(
    record: &FlatRecord,
    base: TypeId,
    registry: &EntityRegistry,
) -> Result<Box<dyn Any + Send>, NeomapError> {
    let meta = registry.match_concrete(base, &record.key_set())?;
    let tree = nest(record, &meta)?;
    (meta.descriptor.deserialize)(tree)
}
