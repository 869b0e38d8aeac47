//! The entity type registry.
//!
//! A long-lived, explicitly-passed registry instance (never ambient global
//! state) tracking which types are entities, their declared base/derived
//! relationships, and their lazily-resolved metadata. Registration walks a
//! type's complex field types and base type recursively, so registering the
//! roots of a model is usually enough.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::descriptor::{Entity, EntityDescriptor, FieldKind};
use crate::error::NeomapError;
use crate::metadata::{self, DescriptorNames, EntityMetadata, NameResolver};

/// Serializer-probe hook: performs a real serialization of the described
/// type and reports `(field name, serialized name)` pairs observed in the
/// output. The alternative to a [`NameResolver`]; exactly one of the two
/// may be configured.
pub type SerializerProbe =
    Arc<dyn Fn(&EntityDescriptor) -> Result<Vec<(String, String)>, NeomapError> + Send + Sync>;

/// Adapts a [`SerializerProbe`] into the [`NameResolver`] interface.
struct ProbeNames {
    probe: SerializerProbe,
}

impl NameResolver for ProbeNames {
    fn serialized_name(
        &self,
        owner: &EntityDescriptor,
        field: &crate::descriptor::FieldDescriptor,
    ) -> String {
        match (self.probe)(owner) {
            Ok(pairs) => pairs
                .into_iter()
                .find(|(name, _)| name == field.name)
                .map(|(_, serialized)| serialized)
                .unwrap_or_else(|| field.serialized.to_owned()),
            Err(_) => field.serialized.to_owned(),
        }
    }
}

/// Builder for an [`EntityRegistry`] with an explicit naming strategy.
///
/// Exactly one of [`name_resolver`](Self::name_resolver) or
/// [`serializer_probe`](Self::serializer_probe) must be supplied; both or
/// neither is a [`NeomapError::Config`] error.
#[derive(Default)]
pub struct RegistryBuilder {
    resolver: Option<Arc<dyn NameResolver>>,
    probe: Option<SerializerProbe>,
}

impl RegistryBuilder {
    /// Use a contract-resolver-style naming hook.
    pub fn name_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Use a serializer probe to discover field names.
    pub fn serializer_probe(mut self, probe: SerializerProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn build(self) -> Result<EntityRegistry, NeomapError> {
        let naming: Arc<dyn NameResolver> = match (self.resolver, self.probe) {
            (Some(_), Some(_)) => {
                return Err(NeomapError::Config(
                    "name_resolver and serializer_probe are mutually exclusive".to_owned(),
                ));
            }
            (None, None) => {
                return Err(NeomapError::Config(
                    "a naming strategy is required: supply name_resolver or serializer_probe"
                        .to_owned(),
                ));
            }
            (Some(resolver), None) => resolver,
            (None, Some(probe)) => Arc::new(ProbeNames { probe }),
        };
        Ok(EntityRegistry {
            naming,
            inner: Mutex::new(Inner::default()),
        })
    }
}

#[derive(Default)]
struct Inner {
    descriptors: HashMap<TypeId, EntityDescriptor>,
    resolved: HashMap<TypeId, Arc<EntityMetadata>>,
}

impl Inner {
    /// All registered descriptors assignable to `base` (the base itself and
    /// every transitive subtype), most-specific-first.
    fn derived_descriptors(&self, base: TypeId) -> Vec<EntityDescriptor> {
        let all: Vec<EntityDescriptor> = self.descriptors.values().cloned().collect();
        sorted_assignable(&all, base)
    }
}

/// Filter `descriptors` down to the types assignable to `base` and sort
/// most-specific-first: extends-chain depth descending, then type name
/// ascending. Polymorphic matching commits to the first structural hit, so
/// this order is load-bearing.
fn sorted_assignable(descriptors: &[EntityDescriptor], base: TypeId) -> Vec<EntityDescriptor> {
    let mut out: Vec<EntityDescriptor> = descriptors
        .iter()
        .filter(|d| d.lineage().iter().any(|a| a.type_id == base))
        .cloned()
        .collect();
    out.sort_by(|a, b| {
        b.depth()
            .cmp(&a.depth())
            .then_with(|| a.type_name.cmp(b.type_name))
    });
    out
}

/// Process-scoped set of known entity types plus derived-type indexes.
///
/// All mutating and derived-type-computing operations are serialized behind
/// one lock; resolved [`EntityMetadata`] is immutable behind `Arc` and safe
/// for unsynchronized concurrent reads.
pub struct EntityRegistry {
    naming: Arc<dyn NameResolver>,
    inner: Mutex<Inner>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    /// A registry with the default descriptor-backed naming strategy.
    pub fn new() -> Self {
        EntityRegistry {
            naming: Arc::new(DescriptorNames),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// A builder for configuring an explicit naming strategy.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Register `T`, its complex field types, and its base chain.
    /// Idempotent: re-registering a known type is a no-op.
    pub fn register<T: Entity>(&self) {
        self.register_descriptor(T::descriptor());
    }

    /// Register an explicit descriptor (and, recursively, the descriptors
    /// of its complex fields and bases).
    pub fn register_descriptor(&self, descriptor: EntityDescriptor) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        register_locked(&mut inner, descriptor);
    }

    /// True if `T` is registered exactly.
    pub fn contains<T: Entity>(&self) -> bool {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.descriptors.contains_key(&TypeId::of::<T>())
    }

    /// True if `T` or any of its declared bases is registered.
    pub fn contains_with_bases<T: Entity>(&self) -> bool {
        let inner = self.inner.lock().expect("registry lock poisoned");
        T::descriptor()
            .lineage()
            .iter()
            .any(|a| inner.descriptors.contains_key(&a.type_id))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a registered type. Rarely needed; drops the cached metadata
    /// of every type so derived-type splices are recomputed.
    pub fn remove(&self, type_id: TypeId) -> bool {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let removed = inner.descriptors.remove(&type_id).is_some();
        if removed {
            inner.resolved.clear();
        }
        removed
    }

    /// Resolved metadata for all registered types assignable to `base`,
    /// sorted most-specific-first (depth descending, name ascending).
    pub fn derived_types(&self, base: TypeId) -> Result<Vec<Arc<EntityMetadata>>, NeomapError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let candidates = inner.derived_descriptors(base);
        candidates
            .iter()
            .map(|d| resolve_locked(&mut inner, self.naming.as_ref(), d.type_id))
            .collect()
    }

    /// Resolved metadata for `T`, computing and caching it on first use.
    pub fn metadata<T: Entity>(&self) -> Result<Arc<EntityMetadata>, NeomapError> {
        self.register::<T>();
        self.metadata_of(TypeId::of::<T>())
    }

    /// Resolved metadata for an already-registered type.
    pub fn metadata_of(&self, type_id: TypeId) -> Result<Arc<EntityMetadata>, NeomapError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        resolve_locked(&mut inner, self.naming.as_ref(), type_id)
    }

    /// Find the most specific registered type under `base` whose full flat
    /// field-name set is satisfied by `keys`. Candidates are tried in
    /// derived order and the first structural match wins; no match is a
    /// hard error, never a silent fallback.
    pub fn match_concrete(
        &self,
        base: TypeId,
        keys: &BTreeSet<String>,
    ) -> Result<Arc<EntityMetadata>, NeomapError> {
        let candidates = self.derived_types(base)?;
        let base_name = candidates
            .iter()
            .find(|m| m.type_id == base)
            .map(|m| m.type_name)
            .unwrap_or("<unregistered>");
        for candidate in &candidates {
            if candidate.matches_keys(keys) {
                return Ok(Arc::clone(candidate));
            }
        }
        Err(NeomapError::no_matching_type(
            base_name,
            keys.iter().map(String::as_str),
        ))
    }
}

fn register_locked(inner: &mut Inner, descriptor: EntityDescriptor) {
    if inner.descriptors.contains_key(&descriptor.type_id) {
        return;
    }
    debug!(entity = descriptor.type_name, label = descriptor.label, "registering entity type");
    let complex: Vec<EntityDescriptor> = descriptor
        .fields
        .iter()
        .filter_map(|f| match f.kind {
            FieldKind::Complex(nested) => Some(nested()),
            _ => None,
        })
        .collect();
    let base = descriptor.extends.map(|b| b());
    inner.descriptors.insert(descriptor.type_id, descriptor);
    // Registering a type invalidates resolved metadata: an existing type's
    // complex splice may now see new derived leaves.
    inner.resolved.clear();
    for nested in complex {
        register_locked(inner, nested);
    }
    if let Some(base) = base {
        register_locked(inner, base);
    }
}

fn resolve_locked(
    inner: &mut Inner,
    naming: &dyn NameResolver,
    type_id: TypeId,
) -> Result<Arc<EntityMetadata>, NeomapError> {
    if let Some(meta) = inner.resolved.get(&type_id) {
        return Ok(Arc::clone(meta));
    }
    let descriptor = inner
        .descriptors
        .get(&type_id)
        .cloned()
        .ok_or_else(|| NeomapError::Mapping("type is not registered as an entity".to_owned()))?;
    // Snapshot the descriptor set so the derived lookup does not hold a
    // borrow of the maps while we cache the result.
    let snapshot: Vec<EntityDescriptor> = inner.descriptors.values().cloned().collect();
    let derived_of = |base: TypeId| sorted_assignable(&snapshot, base);
    debug!(entity = descriptor.type_name, "resolving entity metadata");
    let meta = Arc::new(metadata::resolve(&descriptor, naming, &derived_of)?);
    inner.resolved.insert(type_id, Arc::clone(&meta));
    Ok(meta)
}
