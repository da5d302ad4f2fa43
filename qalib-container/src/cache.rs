//! Instance cache keyed by type, variant and parameters.
//!
//! Identical keys return the same instance until [`InstanceCache::clear`].
//! Parameters are folded into the key through [`stable_hash`], which only
//! depends on the map's content, never on insertion order.

use std::fmt;
use std::hash::{Hash, Hasher};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::key::{TypeKey, VariantKey};
use crate::value::{Instance, Params};

/// Deterministic digest of a parameter map.
///
/// ```
/// use qalib_container::cache::stable_hash;
/// use qalib_container::params;
///
/// let a = params! { "text" => "Save", "style" => "primary" };
/// let b = params! { "style" => "primary", "text" => "Save" };
/// assert_eq!(stable_hash(&a), stable_hash(&b));
/// assert_ne!(stable_hash(&a), stable_hash(&params! { "text" => "Save" }));
/// ```
pub fn stable_hash(params: &Params) -> String {
    let mut hasher = Sha256::new();
    hasher.update(params.canonical_bytes());
    hex::encode(hasher.finalize())
}

/// `(type, variant, stable_hash(params))`.
///
/// Instance parameters hash by address, so the key holds them: while the
/// key is stored, no other instance can be allocated at the same address.
/// Only `slot` and `params_hash` take part in equality and hashing.
#[derive(Clone)]
pub struct CacheKey {
    slot: VariantKey,
    params_hash: String,
    held: Vec<Instance>,
}

impl CacheKey {
    pub fn new(type_key: TypeKey, variant: &str, params: &Params) -> Self {
        Self {
            slot: type_key.variant(variant),
            params_hash: stable_hash(params),
            held: params.instances(),
        }
    }

    pub fn slot(&self) -> &VariantKey {
        &self.slot
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.params_hash == other.params_hash
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.hash(state);
        self.params_hash.hash(state);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({}, {})", self.slot, &self.params_hash[..12.min(self.params_hash.len())])
    }
}

/// Memoized instances.
#[derive(Default)]
pub struct InstanceCache {
    entries: DashMap<CacheKey, Instance>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Instance> {
        let hit = self.entries.get(key).map(|entry| entry.value().clone());
        trace!(key = ?key, hit = hit.is_some(), "Cache lookup");
        hit
    }

    /// Stores `instance` unless another caller got there first, and
    /// returns whichever instance is now cached.
    pub fn insert(&self, key: CacheKey, instance: Instance) -> Instance {
        self.entries.entry(key).or_insert(instance).value().clone()
    }

    pub fn clear(&self) {
        trace!(entries = self.entries.len(), "Clearing cache");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache").field("entries", &self.len()).finish()
    }
}
