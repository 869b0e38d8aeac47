//! Resolved per-type metadata: the flat field-name map.
//!
//! An [`EntityMetadata`] is computed once per registered type from its
//! [`EntityDescriptor`](crate::descriptor::EntityDescriptor): inherited
//! fields are folded in (bases first), complex fields are exploded into
//! `parent_child` leaves, navigation fields are excluded, and the
//! null-tracking sentinel is appended last. The result is immutable and
//! shared behind an `Arc` for unsynchronized concurrent reads.

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind};
use crate::error::NeomapError;

/// Reserved key carrying the serialized null-tracking side list.
///
/// The store drops null-valued keys, so the list of logically-null field
/// names travels under this versioned sentinel. It must never collide with
/// a real field name and is excluded from ordinary field iteration.
pub const NULL_SENTINEL: &str = "__neomap_nulls_v1__";

/// Separator joining a complex field's name to its leaf names.
pub const NAME_SEPARATOR: &str = "_";

/// Pluggable naming hook: how does the serializer name a field?
///
/// The contract-resolver analog from the source system. The default
/// implementation, [`DescriptorNames`], trusts the descriptor table (which
/// the derive macro fills from `#[entity(rename = "...")]` attributes).
pub trait NameResolver: Send + Sync {
    fn serialized_name(&self, owner: &EntityDescriptor, field: &FieldDescriptor) -> String;
}

/// Default naming strategy: use the descriptor's declared serialized names.
pub struct DescriptorNames;

impl NameResolver for DescriptorNames {
    fn serialized_name(&self, _owner: &EntityDescriptor, field: &FieldDescriptor) -> String {
        field.serialized.to_owned()
    }
}

/// One resolved entry in the flat field-name map.
#[derive(Clone, Debug)]
pub struct ResolvedField {
    /// The flat record key (`name` or `parent_child`).
    pub flat_name: String,
    /// Serialized path segments into the nested JSON form: one segment for
    /// scalars, two (`[parent, child]`) for spliced complex leaves.
    pub path: Vec<String>,
    /// The Rust field name this entry originates from.
    pub field_name: &'static str,
    /// The type owning this entry. For complex leaves spliced from a derived
    /// type of the complex field's declared type, this is that derived type.
    pub source_type: TypeId,
    pub source_type_name: &'static str,
    /// True for the complex field itself: its content appears only via its
    /// spliced leaves, never directly.
    pub excluded: bool,
    /// True only for this leaf when it was spliced from a derived type
    /// rather than the complex field's declared type. Such leaves are
    /// optional at match time and never reported as null when absent.
    pub from_derived: bool,
    /// Set on a scalar acting as the foreign key of a navigation field.
    pub foreign_key_for: Option<&'static str>,
}

/// A candidate concrete type for a complex field's value, with the leaf
/// names it contributes. Ordered most-specific-first.
#[derive(Clone, Debug)]
pub struct ComplexVariant {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Serialized leaf names inside the nested object (not prefixed).
    pub leaf_names: BTreeSet<String>,
}

/// The resolved, immutable metadata of one entity type.
#[derive(Clone, Debug)]
pub struct EntityMetadata {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub label: &'static str,
    /// Extends-chain depth; greater is more specific.
    pub depth: usize,
    /// All resolved entries in declaration order (bases first), with the
    /// null sentinel appended last.
    pub fields: Vec<ResolvedField>,
    /// Flat names required for a structural match against this type:
    /// scalars plus the declared-type leaves of each complex field.
    /// Derived-spliced leaves and the sentinel are not required.
    pub match_names: BTreeSet<String>,
    /// Per complex field (keyed by its serialized parent name), the
    /// candidate concrete types most-specific-first.
    pub complex_variants: BTreeMap<String, Vec<ComplexVariant>>,
    /// The descriptor this metadata was resolved from, kept for the erased
    /// deserialize hook.
    pub descriptor: EntityDescriptor,
}

impl EntityMetadata {
    /// Iterate the ordinary leaves of the flat record: everything except
    /// excluded complex parents and the sentinel.
    pub fn leaves(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields
            .iter()
            .filter(|f| !f.excluded && f.flat_name != NULL_SENTINEL)
    }

    /// Look up a leaf by the serialized path of Rust-declared segments.
    pub fn leaf_by_path(&self, path: &[&str]) -> Option<&ResolvedField> {
        self.leaves()
            .find(|f| f.path.len() == path.len() && f.path.iter().zip(path).all(|(a, b)| a == b))
    }

    /// Resolve a directly-declared field (a scalar or the excluded complex
    /// parent entry) by its Rust field name.
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields
            .iter()
            .find(|f| f.field_name == name && f.path.len() == 1)
    }

    /// The leaves spliced under a complex field's serialized name.
    pub fn complex_leaves<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a ResolvedField> {
        self.leaves()
            .filter(move |f| f.path.len() == 2 && f.path[0] == parent)
    }

    /// True when every required flat name of this type appears in `keys`.
    pub fn matches_keys(&self, keys: &BTreeSet<String>) -> bool {
        self.match_names.iter().all(|name| keys.contains(name))
    }
}

/// Source of derived-type descriptors for a given base, supplied by the
/// registry during resolution.
pub(crate) type DerivedLookup<'a> = &'a dyn Fn(TypeId) -> Vec<EntityDescriptor>;

/// Resolve a descriptor into its flat field-name map.
///
/// Fails with [`NeomapError::NestedComplex`] when a complex field's own
/// field set contains another complex or navigation field, with
/// [`NeomapError::SentinelCollision`] when a field resolves to the reserved
/// sentinel name, and with [`NeomapError::MissingForeignKey`] when an
/// explicitly declared foreign key does not exist on the type.
pub(crate) fn resolve(
    descriptor: &EntityDescriptor,
    naming: &dyn NameResolver,
    derived_of: DerivedLookup<'_>,
) -> Result<EntityMetadata, NeomapError> {
    let lineage = descriptor.lineage();
    let mut fields: Vec<ResolvedField> = Vec::new();
    let mut match_names = BTreeSet::new();
    let mut complex_variants: BTreeMap<String, Vec<ComplexVariant>> = BTreeMap::new();

    // First pass: scalar names, for foreign-key lookups.
    let mut scalar_names: BTreeMap<String, usize> = BTreeMap::new();

    for owner in &lineage {
        for field in &owner.fields {
            let serialized = naming.serialized_name(owner, field);
            if serialized == NULL_SENTINEL {
                return Err(NeomapError::SentinelCollision {
                    field: field.name.to_owned(),
                });
            }
            match field.kind {
                FieldKind::Scalar => {
                    scalar_names.insert(serialized.clone(), fields.len());
                    match_names.insert(serialized.clone());
                    fields.push(ResolvedField {
                        flat_name: serialized.clone(),
                        path: vec![serialized],
                        field_name: field.name,
                        source_type: owner.type_id,
                        source_type_name: owner.type_name,
                        excluded: false,
                        from_derived: false,
                        foreign_key_for: None,
                    });
                }
                FieldKind::Complex(nested_fn) => {
                    let nested = nested_fn();
                    // The complex field itself is excluded from direct
                    // serialization; only its spliced leaves appear.
                    fields.push(ResolvedField {
                        flat_name: serialized.clone(),
                        path: vec![serialized.clone()],
                        field_name: field.name,
                        source_type: nested.type_id,
                        source_type_name: nested.type_name,
                        excluded: true,
                        from_derived: false,
                        foreign_key_for: None,
                    });
                    let variants = splice_complex(
                        &mut fields,
                        &mut match_names,
                        &serialized,
                        &nested,
                        naming,
                        derived_of,
                    )?;
                    complex_variants.insert(serialized, variants);
                }
                FieldKind::Navigation => {
                    // Excluded from the flat record; only its foreign key
                    // (explicit or by convention) leaves a trace.
                    let fk = field
                        .foreign_key
                        .map(|fk| fk.to_owned())
                        .unwrap_or_else(|| format!("{}{}id", field.name, NAME_SEPARATOR));
                    match scalar_names.get(&fk) {
                        Some(&idx) => fields[idx].foreign_key_for = Some(field.name),
                        None if field.foreign_key.is_some() => {
                            return Err(NeomapError::MissingForeignKey {
                                field: field.name.to_owned(),
                                expected: fk,
                            });
                        }
                        // Convention-based inference is best-effort only.
                        None => {}
                    }
                }
            }
        }
    }

    // Synthetic null-tracking pseudo-field, appended last.
    fields.push(ResolvedField {
        flat_name: NULL_SENTINEL.to_owned(),
        path: Vec::new(),
        field_name: "",
        source_type: descriptor.type_id,
        source_type_name: descriptor.type_name,
        excluded: false,
        from_derived: false,
        foreign_key_for: None,
    });

    Ok(EntityMetadata {
        type_id: descriptor.type_id,
        type_name: descriptor.type_name,
        label: descriptor.label,
        depth: descriptor.depth(),
        fields,
        match_names,
        complex_variants,
        descriptor: descriptor.clone(),
    })
}

/// Splice the scalar leaves of a complex type (and of its registered
/// derived types) into the parent's field list under joined names.
fn splice_complex(
    fields: &mut Vec<ResolvedField>,
    match_names: &mut BTreeSet<String>,
    parent: &str,
    nested: &EntityDescriptor,
    naming: &dyn NameResolver,
    derived_of: DerivedLookup<'_>,
) -> Result<Vec<ComplexVariant>, NeomapError> {
    let mut variants: Vec<ComplexVariant> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    // Declared type first, then registered derived types most-specific-first.
    // Leaves owned by the declared type are required for a structural match;
    // derived-contributed leaves are optional.
    let mut candidates = vec![(nested.clone(), false)];
    for derived in derived_of(nested.type_id) {
        if derived.type_id != nested.type_id {
            candidates.push((derived, true));
        }
    }

    for (candidate, from_derived) in &candidates {
        let mut leaf_names = BTreeSet::new();
        for owner in candidate.lineage() {
            for leaf in &owner.fields {
                if !matches!(leaf.kind, FieldKind::Scalar) {
                    return Err(NeomapError::nested_complex(leaf.name, candidate.type_name));
                }
                let serialized = naming.serialized_name(&owner, leaf);
                leaf_names.insert(serialized.clone());
                if !seen.insert(serialized.clone()) {
                    continue;
                }
                let flat_name = format!("{parent}{NAME_SEPARATOR}{serialized}");
                if !from_derived {
                    match_names.insert(flat_name.clone());
                }
                fields.push(ResolvedField {
                    flat_name,
                    path: vec![parent.to_owned(), serialized],
                    field_name: leaf.name,
                    source_type: candidate.type_id,
                    source_type_name: candidate.type_name,
                    excluded: false,
                    from_derived: *from_derived,
                    foreign_key_for: None,
                });
            }
        }
        variants.push(ComplexVariant {
            type_id: candidate.type_id,
            type_name: candidate.type_name,
            leaf_names,
        });
    }

    // Most-specific-first, tie-broken by name; the declared type naturally
    // sorts after its own derived types.
    variants.sort_by(|a, b| {
        let da = candidates
            .iter()
            .find(|(c, _)| c.type_id == a.type_id)
            .map(|(c, _)| c.depth())
            .unwrap_or(0);
        let db = candidates
            .iter()
            .find(|(c, _)| c.type_id == b.type_id)
            .map(|(c, _)| c.depth())
            .unwrap_or(0);
        db.cmp(&da).then_with(|| a.type_name.cmp(b.type_name))
    });

    Ok(variants)
}
