//! Keyed provider registry
//!
//! The `Container` maps string keys to providers, evaluates each provider at
//! most once, and falls back to its parent scope for keys it does not know.

use crate::bindings::{Injection, Key, OverrideMap, Value};
use crate::injector::{Injector, ScopeHandle, INJECT_KEY, INSTANCE_KEY};
use crate::keys::merge_keys;
use crate::reflect::{Class, ClassRef, Constructible, Function, Reflect, Target};
use crate::scope::ScopeId;
use crate::storage::{ProviderSlot, ProviderStorage, ResolutionGuard};
use crate::values::{resolve_values, Arguments};
use crate::{DiError, Injectable, Provider, Result};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// What a fetch does with a key registered nowhere in the scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Yield an absent value
    #[default]
    Silent,
    /// Fail with [`DiError::NotFound`]
    Fatal,
}

/// Builder for a root [`Container`].
///
/// # Examples
///
/// ```rust
/// use slinpin::{Container, DiError, MissingKeyPolicy};
///
/// let container = Container::builder()
///     .missing_keys(MissingKeyPolicy::Fatal)
///     .with_capacity(32)
///     .build();
///
/// assert!(matches!(container.fetch("nope"), Err(DiError::NotFound { .. })));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    capacity: usize,
    policy: MissingKeyPolicy,
}

impl ContainerBuilder {
    /// Set the missing-key policy; child scopes inherit it
    #[inline]
    pub fn missing_keys(mut self, policy: MissingKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pre-size the provider map
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the root container.
    ///
    /// The root starts out with a [`ScopeHandle`] under `"inject"` and
    /// `"instance"`; both are ordinary registrations and may be overridden.
    pub fn build(self) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "slinpin",
            capacity = self.capacity,
            policy = ?self.policy,
            "Creating new root container"
        );

        let container = Container {
            storage: Arc::new(ProviderStorage::new(self.capacity, self.policy)),
        };

        let handle = ScopeHandle::new(&container);
        container.constant(INJECT_KEY, handle.clone());
        container.constant(INSTANCE_KEY, handle);

        container
    }
}

/// Keyed dependency injection container.
///
/// Providers are registered under string keys. Function and constructor
/// parameters are matched to keys by name, optionally redirected by key
/// overrides, and filled from value overrides before the registry is asked.
///
/// Cloning a `Container` is cheap and yields a handle to the same registry.
///
/// # Examples
///
/// ```rust
/// use slinpin::{Container, Function, Injection};
///
/// let container = Container::new();
/// container.constant("host", "localhost");
/// container.constant("port", 5432u16);
/// container.variable(
///     "dsn",
///     Function::new("dsn", ["host", "port"], |args| {
///         Ok(format!("postgres://{}:{}", args.get::<&str>(0)?, args.get::<u16>(1)?))
///     }),
///     Injection::none(),
/// );
///
/// let dsn = container.fetch_as::<String>("dsn").unwrap().unwrap();
/// assert_eq!(*dsn, "postgres://localhost:5432");
/// ```
#[derive(Clone)]
pub struct Container {
    storage: Arc<ProviderStorage>,
}

impl Container {
    /// Create a new root container with the default configuration.
    #[inline]
    pub fn new() -> Self {
        ContainerBuilder::default().build()
    }

    /// Start configuring a root container.
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    /// Create a root container with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        ContainerBuilder::default().with_capacity(capacity).build()
    }

    /// Create a child scope.
    ///
    /// The child sees every key of its ancestors and may shadow any of them.
    /// It never writes to its parent: keys it delegates upward are evaluated
    /// and memoized by the scope that registered them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slinpin::Container;
    ///
    /// let root = Container::new();
    /// root.constant("env", "prod");
    ///
    /// let request = root.scope();
    /// request.constant("user", 42u64);
    ///
    /// assert!(request.contains("env"));
    /// assert!(!root.contains("user"));
    /// ```
    pub fn scope(&self) -> Self {
        let child = self.storage.child();

        #[cfg(feature = "logging")]
        debug!(
            target: "slinpin",
            parent = %self.storage.scope(),
            scope = %child.scope(),
            depth = child.depth(),
            "Creating child scope"
        );

        Self {
            storage: Arc::new(child),
        }
    }

    /// Alias for `scope()`.
    #[inline]
    pub fn create_scope(&self) -> Self {
        self.scope()
    }

    /// Identity of this scope
    #[inline]
    pub fn scope_id(&self) -> ScopeId {
        self.storage.scope()
    }

    /// Number of ancestors
    #[inline]
    pub fn depth(&self) -> u32 {
        self.storage.depth()
    }

    #[inline]
    pub fn missing_key_policy(&self) -> MissingKeyPolicy {
        self.storage.policy()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register `provider` under `key`.
    ///
    /// Replaces any provider previously registered under `key` in this scope
    /// and forgets its memoized value.
    pub fn provider(&self, key: impl Into<Key>, provider: Provider) {
        let key = key.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "slinpin",
            key = key.as_str(),
            provider = provider.kind(),
            scope = %self.storage.scope(),
            depth = self.storage.depth(),
            replaces = self.storage.contains(&key),
            "Registering provider"
        );

        self.storage.insert(key, provider);
    }

    /// Register a fixed value.
    ///
    /// ```rust
    /// use slinpin::Container;
    ///
    /// let container = Container::new();
    /// container.constant("retries", 3u8);
    ///
    /// assert_eq!(*container.fetch_as::<u8>("retries").unwrap().unwrap(), 3);
    /// ```
    #[inline]
    pub fn constant<T: Injectable>(&self, key: impl Into<Key>, value: T) {
        self.provider(key, Provider::constant(value));
    }

    /// Register the memoized result of an injected function call.
    #[inline]
    pub fn variable(&self, key: impl Into<Key>, function: Function, injection: impl Into<Injection>) {
        self.provider(
            key,
            Provider::Variable {
                function,
                injection: injection.into(),
            },
        );
    }

    /// Register an injected callable; fetching yields an [`Injector`] that
    /// runs `function` on each call.
    #[inline]
    pub fn method(&self, key: impl Into<Key>, function: Function, injection: impl Into<Injection>) {
        self.provider(
            key,
            Provider::Method {
                function,
                injection: injection.into(),
            },
        );
    }

    /// Register an instantiator; fetching yields an [`Injector`] that builds
    /// a new instance of `class` on each call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slinpin::{locals, Class, Container, Injection};
    ///
    /// struct Point { x: i32, y: i32 }
    ///
    /// let container = Container::new();
    /// container.factory(
    ///     "point",
    ///     Class::new("Point", ["x", "y"], |args| Ok(Point { x: args.get(0)?, y: args.get(1)? })),
    ///     Injection::none(),
    /// );
    ///
    /// let make = container.instantiator("point").unwrap().unwrap();
    /// let a = make.call_as::<Point>(&locals! { "x" => 1, "y" => 2 }).unwrap();
    /// let b = make.call_as::<Point>(&locals! { "x" => 3, "y" => 4 }).unwrap();
    /// assert_eq!((a.x, b.y), (1, 4));
    /// ```
    #[inline]
    pub fn factory(&self, key: impl Into<Key>, class: impl Into<ClassRef>, injection: impl Into<Injection>) {
        self.provider(
            key,
            Provider::Factory {
                class: class.into(),
                injection: injection.into(),
            },
        );
    }

    /// Register a single instance produced by invoking a function or
    /// constructing a class on first fetch.
    #[inline]
    pub fn service(&self, key: impl Into<Key>, target: impl Into<Target>, injection: impl Into<Injection>) {
        self.provider(
            key,
            Provider::Service {
                target: target.into(),
                injection: injection.into(),
            },
        );
    }

    /// Declare a [`Constructible`] type under its class name.
    #[inline]
    pub fn declare<T: Constructible>(&self) {
        self.declare_class(Class::of::<T>());
    }

    /// Declare a class so that [`ClassRef::Named`] can refer to it.
    pub fn declare_class(&self, class: Class) {
        #[cfg(feature = "logging")]
        debug!(
            target: "slinpin",
            class = class.name(),
            scope = %self.storage.scope(),
            "Declaring class"
        );

        self.storage.declare(class);
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Fetch the value registered under `key`.
    ///
    /// Evaluates the provider on first fetch and memoizes the result. Keys
    /// unknown to this scope are delegated to the parent chain. A key known
    /// to no scope yields `Ok(None)`, or [`DiError::NotFound`] under
    /// [`MissingKeyPolicy::Fatal`].
    ///
    /// # Errors
    ///
    /// Any error raised while evaluating the provider, including
    /// [`DiError::CyclicDependency`] when the provider needs its own key.
    ///
    /// Cycles are detected per thread. If two threads each start evaluating
    /// one half of a cycle, each blocks waiting on the other's first
    /// evaluation instead of failing.
    pub fn fetch(&self, key: &str) -> Result<Option<Value>> {
        if let Some(slot) = self.storage.slot(key) {
            return Self::evaluate(&self.storage, key, &slot).map(Some);
        }

        if self.storage.parent().is_some() {
            return self.fetch_from_parents(key);
        }

        self.missing(key)
    }

    /// Walk the parent chain (cold path)
    #[cold]
    fn fetch_from_parents(&self, key: &str) -> Result<Option<Value>> {
        #[cfg(feature = "logging")]
        trace!(
            target: "slinpin",
            key,
            scope = %self.storage.scope(),
            "Key not in local scope, walking parent chain"
        );

        let mut current = self.storage.parent();
        while let Some(storage) = current {
            if let Some(slot) = storage.slot(key) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "slinpin",
                    key,
                    scope = %self.storage.scope(),
                    owner = %storage.scope(),
                    "Key delegated to ancestor scope"
                );

                return Self::evaluate(storage, key, &slot).map(Some);
            }
            current = storage.parent();
        }

        self.missing(key)
    }

    fn missing(&self, key: &str) -> Result<Option<Value>> {
        #[cfg(feature = "logging")]
        debug!(
            target: "slinpin",
            key,
            scope = %self.storage.scope(),
            policy = ?self.storage.policy(),
            "Key not registered in scope chain"
        );

        match self.storage.policy() {
            MissingKeyPolicy::Silent => Ok(None),
            MissingKeyPolicy::Fatal => Err(DiError::not_found(key)),
        }
    }

    /// Return the memoized value or run the provider in its owning scope
    fn evaluate(owner: &Arc<ProviderStorage>, key: &str, slot: &ProviderSlot) -> Result<Value> {
        if let Some(value) = slot.value.get() {
            #[cfg(feature = "logging")]
            trace!(target: "slinpin", key, scope = %owner.scope(), "Memoized value hit");

            return Ok(Arc::clone(value));
        }

        let _guard = ResolutionGuard::enter(owner.scope(), key).inspect_err(|_e| {
            #[cfg(feature = "logging")]
            debug!(target: "slinpin", key, scope = %owner.scope(), error = %_e, "Cyclic dependency detected");
        })?;

        let container = Container::from_storage(Arc::clone(owner));
        let value = slot.value.get_or_try_init(|| {
            #[cfg(feature = "logging")]
            debug!(
                target: "slinpin",
                key,
                provider = slot.provider.kind(),
                scope = %owner.scope(),
                depth = owner.depth(),
                "Evaluating provider"
            );

            slot.provider.provide(&container)
        })?;

        Ok(Arc::clone(value))
    }

    /// Fetch and downcast to `T`.
    ///
    /// # Errors
    ///
    /// [`DiError::TypeMismatch`] if the value is not a `T`, plus anything
    /// [`fetch`](Container::fetch) can raise.
    pub fn fetch_as<T: Injectable>(&self, key: &str) -> Result<Option<Arc<T>>> {
        match self.fetch(key)? {
            Some(value) => value
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::type_mismatch::<T>(key)),
            None => Ok(None),
        }
    }

    /// Fetch the [`Injector`] registered by [`factory`](Container::factory)
    /// or [`method`](Container::method).
    #[inline]
    pub fn instantiator(&self, key: &str) -> Result<Option<Arc<Injector>>> {
        self.fetch_as::<Injector>(key)
    }

    /// Inject and invoke `function` once, without registering anything.
    ///
    /// ```rust
    /// use slinpin::{Container, Function, Injection};
    ///
    /// let container = Container::new();
    /// container.constant("a", 2i64);
    ///
    /// let double = Function::new("double", ["a"], |args| Ok(args.get::<i64>(0)? * 2));
    /// let out = container.invoke(&double, Injection::none()).unwrap();
    /// assert_eq!(out.downcast_ref::<i64>(), Some(&4));
    /// ```
    #[inline]
    pub fn invoke(&self, function: &Function, injection: impl Into<Injection>) -> Result<Value> {
        self.call_function(function, &injection.into())
    }

    /// Inject and construct one instance of `class`, without registering
    /// anything.
    #[inline]
    pub fn construct(&self, class: impl Into<ClassRef>, injection: impl Into<Injection>) -> Result<Value> {
        self.construct_class(&class.into(), &injection.into())
    }

    pub(crate) fn call_function(&self, function: &Function, injection: &Injection) -> Result<Value> {
        let keys = Self::merged_keys(function, injection);
        let args = self.arguments(&keys, &[injection.value_overrides()])?;
        function.call(args)
    }

    pub(crate) fn construct_class(&self, class: &ClassRef, injection: &Injection) -> Result<Value> {
        let class = self.resolve_class(class)?;
        let keys = Self::merged_keys(&class, injection);
        let args = self.arguments(&keys, &[injection.value_overrides()])?;
        class.construct(args)
    }

    /// Resolve a class reference against declared classes
    pub(crate) fn resolve_class(&self, class: &ClassRef) -> Result<Class> {
        match class {
            ClassRef::Class(class) => Ok(class.clone()),
            ClassRef::Named(name) => self
                .storage
                .class_in_chain(name)
                .ok_or_else(|| DiError::reflection(name.as_str(), "no class declared under this name")),
        }
    }

    /// Declared parameters, then the target's own annotations, then the
    /// registration's key overrides
    pub(crate) fn merged_keys<R: Reflect + ?Sized>(target: &R, injection: &Injection) -> Vec<Key> {
        merge_keys(target.parameters(), [target.annotations(), injection.key_overrides()])
    }

    /// Resolve `keys` against `sources` (last wins), then the registry
    pub(crate) fn arguments(&self, keys: &[Key], sources: &[&OverrideMap<Value>]) -> Result<Arguments> {
        resolve_values(keys, sources, |key| self.fetch(key))
    }

    #[inline]
    pub(crate) fn from_storage(storage: Arc<ProviderStorage>) -> Self {
        Self { storage }
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> Weak<ProviderStorage> {
        Arc::downgrade(&self.storage)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check if `key` is registered in this scope or any ancestor.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.storage.contains_in_chain(key)
    }

    /// Check if the provider registered under `key` in this scope has run.
    #[inline]
    pub fn is_memoized(&self, key: &str) -> bool {
        self.storage.is_memoized(key)
    }

    /// Number of keys registered in this scope (not including parents).
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if this scope has no registrations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Keys registered in this scope, in no particular order.
    #[inline]
    pub fn keys(&self) -> Vec<Key> {
        self.storage.keys()
    }

    /// Remove the provider registered under `key` in this scope.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.storage.remove(key);

        #[cfg(feature = "logging")]
        debug!(target: "slinpin", key, removed, scope = %self.storage.scope(), "Removing provider");

        removed
    }

    /// Remove every provider registered in this scope, the built-in
    /// `"inject"` and `"instance"` handles included.
    pub fn clear(&self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "slinpin",
            scope = %self.storage.scope(),
            providers = self.storage.len(),
            "Clearing scope"
        );

        self.storage.clear();
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.storage.scope())
            .field("provider_count", &self.len())
            .field("depth", &self.depth())
            .field("has_parent", &self.storage.parent().is_some())
            .finish()
    }
}
