//! Injected callables
//!
//! `factory` and `method` registrations memoize an [`Injector`] rather than a
//! finished value. The injector has already merged its keys; each call only
//! resolves values (call-time locals first) and runs the target again.

use crate::bindings::{Injection, Key, Locals, OverrideMap, Value};
use crate::container::Container;
use crate::reflect::{Class, ClassRef, Function, Reflect};
use crate::storage::ProviderStorage;
use crate::{DiError, Injectable, Result};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::trace;

#[derive(Clone)]
enum Callee {
    Function(Function),
    Class(Class),
}

/// A memoized callable that injects its arguments on every call.
///
/// Holds a weak reference to the registry that produced it, so storing an
/// injector inside that same registry does not keep it alive.
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
/// let make_point = container.instantiator("point").unwrap().unwrap();
/// let p = make_point.call_as::<Point>(&locals! { "x" => 1, "y" => 2 }).unwrap();
/// assert_eq!((p.x, p.y), (1, 2));
/// ```
pub struct Injector {
    storage: Weak<ProviderStorage>,
    callee: Callee,
    keys: Vec<Key>,
    values: OverrideMap<Value>,
}

impl Injector {
    /// Injector that invokes `function` on every call
    pub(crate) fn method(container: &Container, function: Function, injection: &Injection) -> Self {
        let keys = Container::merged_keys(&function, injection);
        Self {
            storage: container.downgrade(),
            callee: Callee::Function(function),
            keys,
            values: injection.value_overrides().clone(),
        }
    }

    /// Injector that constructs a new `class` instance on every call
    pub(crate) fn instantiator(container: &Container, class: Class, injection: &Injection) -> Self {
        let keys = Container::merged_keys(&class, injection);
        Self {
            storage: container.downgrade(),
            callee: Callee::Class(class),
            keys,
            values: injection.value_overrides().clone(),
        }
    }

    /// Keys each argument is resolved from
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Name of the wrapped function or class
    pub fn target(&self) -> &str {
        match &self.callee {
            Callee::Function(function) => function.name(),
            Callee::Class(class) => class.name(),
        }
    }

    /// Call with no locals
    #[inline]
    pub fn invoke(&self) -> Result<Value> {
        self.call(&Locals::new())
    }

    /// Call with `locals` taking precedence over every other source
    pub fn call(&self, locals: &Locals) -> Result<Value> {
        let storage = self.storage.upgrade().ok_or(DiError::ScopeDropped)?;
        let container = Container::from_storage(storage);

        #[cfg(feature = "logging")]
        trace!(
            target: "slinpin",
            target_name = self.target(),
            locals = locals.len(),
            scope = %container.scope_id(),
            "Calling injector"
        );

        let args = container.arguments(&self.keys, &[&self.values, locals])?;

        match &self.callee {
            Callee::Function(function) => function.call(args),
            Callee::Class(class) => class.construct(args),
        }
    }

    /// Call and downcast the result to `T`
    pub fn call_as<T: Injectable>(&self, locals: &Locals) -> Result<Arc<T>> {
        self.call(locals)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(self.target()))
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("target", &self.target())
            .field("keys", &self.keys)
            .field("live", &(self.storage.strong_count() > 0))
            .finish()
    }
}

/// Key under which every root registry holds a [`ScopeHandle`] for one-shot
/// invocation
pub const INJECT_KEY: &str = "inject";

/// Key under which every root registry holds a [`ScopeHandle`] for one-shot
/// construction
pub const INSTANCE_KEY: &str = "instance";

/// One-shot injection from inside a provider body.
///
/// Every root registry registers a handle to itself under [`INJECT_KEY`] and
/// [`INSTANCE_KEY`], so a function or constructor can take a parameter named
/// `inject` or `instance` and invoke or construct further targets through it.
/// The handle holds a weak reference and does not keep its registry alive.
///
/// # Examples
///
/// ```rust
/// use slinpin::{Class, Container, Function, Injection, ScopeHandle};
///
/// struct Point { x: i32 }
///
/// let container = Container::new();
/// container.constant("x", 7i32);
/// container.declare_class(Class::new("Point", ["x"], |args| Ok(Point { x: args.get(0)? })));
/// container.service(
///     "origin",
///     Function::erased("origin", ["instance"], |args| {
///         args.arc::<ScopeHandle>(0)?.construct("Point", Injection::none())
///     }),
///     Injection::none(),
/// );
///
/// assert_eq!(container.fetch_as::<Point>("origin").unwrap().unwrap().x, 7);
/// ```
#[derive(Clone)]
pub struct ScopeHandle {
    storage: Weak<ProviderStorage>,
}

impl ScopeHandle {
    pub(crate) fn new(container: &Container) -> Self {
        Self {
            storage: container.downgrade(),
        }
    }

    fn container(&self) -> Result<Container> {
        let storage = self.storage.upgrade().ok_or(DiError::ScopeDropped)?;
        Ok(Container::from_storage(storage))
    }

    /// Inject and invoke `function` once against the registry
    pub fn invoke(&self, function: &Function, injection: impl Into<Injection>) -> Result<Value> {
        self.container()?.invoke(function, injection)
    }

    /// Inject and construct one instance of `class` against the registry
    pub fn construct(&self, class: impl Into<ClassRef>, injection: impl Into<Injection>) -> Result<Value> {
        self.container()?.construct(class, injection)
    }

    /// Construct and downcast to `T`
    pub fn construct_as<T: Injectable>(
        &self,
        class: impl Into<ClassRef>,
        injection: impl Into<Injection>,
    ) -> Result<Arc<T>> {
        let class = class.into();
        let name = class.name().to_owned();
        self.construct(class, injection)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(name))
    }
}

impl std::fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("live", &(self.storage.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{locals, Arguments};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn concat() -> Function {
        Function::new("concat", ["a", "b"], |args: Arguments| {
            Ok(format!("{}+{}", args.get::<&str>(0)?, args.get::<&str>(1)?))
        })
    }

    #[test]
    fn test_method_resolves_on_every_call() {
        let container = Container::new();
        container.constant("a", "hah");
        container.constant("b", "blah");
        container.method("concat", concat(), Injection::none());

        let injector = container.instantiator("concat").unwrap().unwrap();

        let out = injector.call_as::<String>(&Locals::new()).unwrap();
        assert_eq!(*out, "hah+blah");

        let out = injector.call_as::<String>(&locals! { "b" => "local" }).unwrap();
        assert_eq!(*out, "hah+local");
    }

    #[test]
    fn test_locals_outrank_registration_values() {
        let container = Container::new();
        container.method("concat", concat(), Injection::new().value("a", "fixed").value_at(1, "second"));

        let injector = container.instantiator("concat").unwrap().unwrap();
        assert_eq!(*injector.call_as::<String>(&Locals::new()).unwrap(), "fixed+second");
        assert_eq!(
            *injector.call_as::<String>(&locals! { "a" => "mine" }).unwrap(),
            "mine+second"
        );
    }

    #[test]
    fn test_keys_are_merged_once() {
        let container = Container::new();
        container.method("concat", concat(), Injection::keys(["left"]));

        let injector = container.instantiator("concat").unwrap().unwrap();
        assert_eq!(injector.keys(), ["left", "b"]);
    }

    #[test]
    fn test_instantiator_builds_fresh_instances() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        struct Widget(u32);

        let container = Container::new();
        container.factory(
            "widget",
            Class::new("Widget", Vec::<Key>::new(), |_| Ok(Widget(BUILT.fetch_add(1, Ordering::SeqCst)))),
            Injection::none(),
        );

        let make = container.instantiator("widget").unwrap().unwrap();
        let a = make.call_as::<Widget>(&Locals::new()).unwrap();
        let b = make.call_as::<Widget>(&Locals::new()).unwrap();

        assert_ne!(a.0, b.0);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_dropped_registry() {
        let container = Container::new();
        container.method("concat", concat(), Injection::none());
        let injector = container.instantiator("concat").unwrap().unwrap();

        drop(container);

        assert!(matches!(injector.invoke(), Err(DiError::ScopeDropped)));
    }

    #[test]
    fn test_call_as_wrong_type() {
        let container = Container::new();
        container.method("concat", concat(), Injection::new().value("a", "x").value("b", "y"));
        let injector = container.instantiator("concat").unwrap().unwrap();

        assert!(matches!(
            injector.call_as::<u64>(&Locals::new()),
            Err(DiError::TypeMismatch { .. })
        ));
    }
}
