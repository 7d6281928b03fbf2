//! Provider storage for the registry
//!
//! Uses DashMap for concurrent access. Each key owns a [`ProviderSlot`]
//! holding the provider and its memoized value; slots are handed out as
//! `Arc`s so a provider can run without holding a map shard lock.

use crate::bindings::{Key, Value};
use crate::reflect::Class;
use crate::scope::ScopeId;
use crate::{DiError, MissingKeyPolicy, Provider, Result};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use std::sync::Arc;

/// A registered provider and its memoized result
pub(crate) struct ProviderSlot {
    pub(crate) provider: Provider,
    pub(crate) value: OnceCell<Value>,
}

impl ProviderSlot {
    #[inline]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            value: OnceCell::new(),
        }
    }

    /// Check if the provider has already run
    #[inline]
    pub fn is_memoized(&self) -> bool {
        self.value.get().is_some()
    }
}

/// Shard count scaled to the expected number of keys.
///
/// Default DashMap uses num_cpus * 4 shards which is overkill for
/// typical registries with <50 providers.
#[inline]
fn shard_amount(capacity: usize) -> usize {
    if capacity <= 16 {
        8
    } else if capacity <= 64 {
        16
    } else {
        32
    }
}

/// Thread-safe storage for one registry scope
pub(crate) struct ProviderStorage {
    /// Map from key to provider slot
    slots: DashMap<Key, Arc<ProviderSlot>, RandomState>,
    /// Classes declared by name
    classes: DashMap<String, Class, RandomState>,
    /// Optional parent storage for fallback lookup
    parent: Option<Arc<ProviderStorage>>,
    /// Scope identity
    scope: ScopeId,
    /// Distance from the root scope
    depth: u32,
    /// What to do when a key is registered nowhere in the chain
    policy: MissingKeyPolicy,
}

impl ProviderStorage {
    /// Create root storage
    pub fn new(capacity: usize, policy: MissingKeyPolicy) -> Self {
        Self {
            slots: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount(capacity),
            ),
            classes: DashMap::with_hasher(RandomState::new()),
            parent: None,
            scope: ScopeId::new(),
            depth: 0,
            policy,
        }
    }

    /// Create a child storage inheriting the parent's policy
    pub fn child(self: &Arc<Self>) -> Self {
        Self {
            slots: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
            classes: DashMap::with_hasher(RandomState::new()),
            parent: Some(Arc::clone(self)),
            scope: ScopeId::new(),
            depth: self.depth + 1,
            policy: self.policy,
        }
    }

    /// Insert a provider, replacing any previous slot and its memoized value
    #[inline]
    pub fn insert(&self, key: Key, provider: Provider) -> bool {
        self.slots.insert(key, Arc::new(ProviderSlot::new(provider))).is_some()
    }

    /// Slot registered directly in this scope
    #[inline]
    pub fn slot(&self, key: &str) -> Option<Arc<ProviderSlot>> {
        self.slots.get(key).map(|slot| Arc::clone(slot.value()))
    }

    /// Check if key exists in this scope
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Check if a key exists in this storage or any parent.
    pub fn contains_in_chain(&self, key: &str) -> bool {
        let mut current = Some(self);
        while let Some(storage) = current {
            if storage.contains(key) {
                return true;
            }
            current = storage.parent.as_deref();
        }
        false
    }

    /// Check if the key's provider has run in this scope
    #[inline]
    pub fn is_memoized(&self, key: &str) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.is_memoized())
    }

    /// Declare a class under its name
    #[inline]
    pub fn declare(&self, class: Class) {
        use crate::reflect::Reflect;
        self.classes.insert(class.name().to_owned(), class);
    }

    /// Find a declared class, walking the parent chain
    pub fn class_in_chain(&self, name: &str) -> Option<Class> {
        let mut current = Some(self);
        while let Some(storage) = current {
            if let Some(class) = storage.classes.get(name) {
                return Some(class.value().clone());
            }
            current = storage.parent.as_deref();
        }
        None
    }

    /// Get reference to parent storage (if any)
    #[inline]
    pub fn parent(&self) -> Option<&Arc<ProviderStorage>> {
        self.parent.as_ref()
    }

    #[inline]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn policy(&self) -> MissingKeyPolicy {
        self.policy
    }

    /// Get number of registered keys
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Clear all providers (preserves parent reference and declared classes)
    #[inline]
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Remove a provider
    #[inline]
    pub fn remove(&self, key: &str) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Get all registered keys
    pub fn keys(&self) -> Vec<Key> {
        self.slots.iter().map(|r| r.key().clone()).collect()
    }
}

thread_local! {
    /// Keys whose providers are running on this thread, outermost first
    static RESOLVING: RefCell<Vec<(ScopeId, Key)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as in progress for as long as it lives.
///
/// Entering a key that is already in progress in the same scope on this
/// thread fails with [`DiError::CyclicDependency`].
pub(crate) struct ResolutionGuard;

impl ResolutionGuard {
    pub fn enter(scope: ScopeId, key: &str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(start) = stack.iter().position(|(s, k)| *s == scope && k == key) {
                let mut path: Vec<String> = stack[start..].iter().map(|(_, k)| k.clone()).collect();
                path.push(key.to_owned());
                return Err(DiError::cyclic(key, path));
            }

            stack.push((scope, key.to_owned()));
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl std::fmt::Debug for ProviderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderStorage")
            .field("scope", &self.scope)
            .field("count", &self.len())
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Arc<ProviderStorage> {
        Arc::new(ProviderStorage::new(0, MissingKeyPolicy::Silent))
    }

    #[test]
    fn test_storage_insert_and_contains() {
        let storage = root();
        assert!(!storage.contains("a"));

        let replaced = storage.insert("a".into(), Provider::constant(1u8));
        assert!(!replaced);
        assert!(storage.contains("a"));
        assert_eq!(storage.keys(), ["a"]);
    }

    #[test]
    fn test_reinsert_clears_memo() {
        let storage = root();
        storage.insert("a".into(), Provider::constant(1u8));

        let slot = storage.slot("a").unwrap();
        let _ = slot.value.set(Arc::new(1u8));
        assert!(storage.is_memoized("a"));

        assert!(storage.insert("a".into(), Provider::constant(2u8)));
        assert!(!storage.is_memoized("a"));
    }

    #[test]
    fn test_storage_remove() {
        let storage = root();
        storage.insert("a".into(), Provider::constant(0u8));
        assert!(storage.remove("a"));
        assert!(!storage.contains("a"));
        assert!(!storage.remove("a"));
    }

    #[test]
    fn test_child_chain() {
        let parent = root();
        parent.insert("a".into(), Provider::constant(0u8));
        parent.declare(Class::new("Unit", Vec::<Key>::new(), |_| Ok(())));

        let child = Arc::new(parent.child());
        let grandchild = child.child();

        assert_eq!(grandchild.depth(), 2);
        assert!(grandchild.contains_in_chain("a"));
        assert!(!grandchild.contains("a"));
        assert!(grandchild.class_in_chain("Unit").is_some());
        assert!(grandchild.class_in_chain("Other").is_none());
        assert_ne!(child.scope(), grandchild.scope());
    }

    #[test]
    fn test_resolution_guard_detects_reentry() {
        let scope = ScopeId::new();

        let outer = ResolutionGuard::enter(scope, "a").unwrap();
        let inner = ResolutionGuard::enter(scope, "b").unwrap();

        match ResolutionGuard::enter(scope, "a") {
            Err(DiError::CyclicDependency { key, path }) => {
                assert_eq!(key, "a");
                assert_eq!(path, ["a", "b", "a"]);
            }
            other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
        }

        // Same key in another scope is a different slot
        let elsewhere = ResolutionGuard::enter(ScopeId::new(), "a").unwrap();

        drop(elsewhere);
        drop(inner);
        drop(outer);
        assert!(ResolutionGuard::enter(scope, "a").is_ok());
    }

    #[test]
    fn test_shard_amount_scales() {
        assert_eq!(shard_amount(0), 8);
        assert_eq!(shard_amount(40), 16);
        assert_eq!(shard_amount(1000), 32);
    }
}
