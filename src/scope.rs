//! Scope identity and per-scope registration templates

use crate::bindings::{Injection, Key};
use crate::{Container, Function, Injectable, Provider};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique scope identifier.
///
/// Every registry gets one on creation; it tags log records and keys the
/// in-progress markers used for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Generate a new unique scope ID.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Builder for child scopes that share a standard set of registrations.
///
/// Each [`build`](ScopeBuilder::build) creates a fresh child of the given
/// parent and registers every template provider into it. Providers are
/// evaluated separately in each built scope.
///
/// # Examples
///
/// ```rust
/// use slinpin::{Container, Function, Injection, ScopeBuilder};
///
/// let root = Container::new();
/// root.constant("app", "billing");
///
/// let per_request = ScopeBuilder::new()
///     .with_constant("region", "eu-west-1")
///     .with_variable("request_label", Function::new("label", ["app", "region"], |args| {
///         Ok(format!("{}@{}", args.get::<&str>(0)?, args.get::<&str>(1)?))
///     }), Injection::none());
///
/// let scope = per_request.build(&root);
/// let label = scope.fetch_as::<String>("request_label").unwrap().unwrap();
/// assert_eq!(*label, "billing@eu-west-1");
/// ```
#[derive(Default)]
pub struct ScopeBuilder {
    providers: Vec<(Key, Provider)>,
}

impl ScopeBuilder {
    /// Create a new scope builder.
    #[inline]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register `provider` under `key` in each built scope.
    pub fn with(mut self, key: impl Into<Key>, provider: Provider) -> Self {
        self.providers.push((key.into(), provider));
        self
    }

    /// Register a constant in each built scope.
    pub fn with_constant<T: Injectable>(self, key: impl Into<Key>, value: T) -> Self {
        self.with(key, Provider::constant(value))
    }

    /// Register a variable provider in each built scope.
    pub fn with_variable(self, key: impl Into<Key>, function: Function, injection: Injection) -> Self {
        self.with(key, Provider::Variable { function, injection })
    }

    /// Build a child scope of `parent` with all template registrations.
    pub fn build(&self, parent: &Container) -> Container {
        let scope = parent.scope();
        for (key, provider) in &self.providers {
            scope.provider(key.as_str(), provider.clone());
        }
        scope
    }
}

impl std::fmt::Debug for ScopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|(key, provider)| (key, provider.kind())))
            .finish()
    }
}
