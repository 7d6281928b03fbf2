//! Providers and the values they may produce
//!
//! A [`Provider`] is the deferred computation stored under a registry key.
//! The registry evaluates it at most once and memoizes the result; what that
//! result *is* depends on the variant.

use crate::bindings::{Injection, Value};
use crate::reflect::{ClassRef, Function, Target};
use crate::{Container, Injector, Result};
use std::sync::Arc;

/// Marker trait for types that can be stored in the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {
    /// Returns the type name for debugging
    #[inline]
    fn type_name_of() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Custom provider body, given the container it is registered in
type ProviderFn = Arc<dyn Fn(&Container) -> Result<Value> + Send + Sync>;

/// Deferred computation registered under a key.
///
/// ## Memoized results by variant
///
/// | Variant    | Memoized value                                   |
/// |------------|--------------------------------------------------|
/// | `Constant` | the stored value                                 |
/// | `Variable` | the function's return value                      |
/// | `Service`  | the single invoked/constructed instance          |
/// | `Method`   | an [`Injector`] that calls the function per call |
/// | `Factory`  | an [`Injector`] that builds a new instance per call |
/// | `Custom`   | whatever the closure returns                     |
#[derive(Clone)]
pub enum Provider {
    /// Fixed value, no injection
    Constant(Value),
    /// Inject and invoke a function
    Variable { function: Function, injection: Injection },
    /// Inject and invoke or construct once
    Service { target: Target, injection: Injection },
    /// Injected callable, invoked on every call
    Method { function: Function, injection: Injection },
    /// Instantiator, constructing on every call
    Factory { class: ClassRef, injection: Injection },
    /// Arbitrary closure receiving the container
    Custom(ProviderFn),
}

impl Provider {
    /// Provider for a fixed value
    #[inline]
    pub fn constant<T: Injectable>(value: T) -> Self {
        Provider::Constant(Arc::new(value))
    }

    /// Provider from a closure that receives the owning container
    #[inline]
    pub fn custom<F>(provide: F) -> Self
    where
        F: Fn(&Container) -> Result<Value> + Send + Sync + 'static,
    {
        Provider::Custom(Arc::new(provide))
    }

    /// Variant name for logs
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::Constant(_) => "constant",
            Provider::Variable { .. } => "variable",
            Provider::Service { .. } => "service",
            Provider::Method { .. } => "method",
            Provider::Factory { .. } => "factory",
            Provider::Custom(_) => "custom",
        }
    }

    /// Evaluate the provider against `container`.
    ///
    /// Called by the registry at most once per slot; the result is memoized
    /// there.
    pub(crate) fn provide(&self, container: &Container) -> Result<Value> {
        match self {
            Provider::Constant(value) => Ok(Arc::clone(value)),
            Provider::Variable { function, injection } => container.call_function(function, injection),
            Provider::Service { target, injection } => match target {
                Target::Function(function) => container.call_function(function, injection),
                Target::Class(class) => container.construct_class(class, injection),
            },
            Provider::Method { function, injection } => {
                let injector = Injector::method(container, function.clone(), injection);
                Ok(Arc::new(injector))
            }
            Provider::Factory { class, injection } => {
                let class = container.resolve_class(class)?;
                let injector = Injector::instantiator(container, class, injection);
                Ok(Arc::new(injector))
            }
            Provider::Custom(provide) => provide(container),
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Constant(_) => f.write_str("Provider::Constant"),
            Provider::Variable { function, .. } => f.debug_tuple("Provider::Variable").field(function).finish(),
            Provider::Service { target, .. } => f.debug_tuple("Provider::Service").field(target).finish(),
            Provider::Method { function, .. } => f.debug_tuple("Provider::Method").field(function).finish(),
            Provider::Factory { class, .. } => f.debug_tuple("Provider::Factory").field(class).finish(),
            Provider::Custom(_) => f.write_str("Provider::Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arguments, Class};

    #[test]
    fn test_constant_returns_same_value() {
        let container = Container::new();
        let provider = Provider::constant(42u32);

        let a = provider.provide(&container).unwrap();
        let b = provider.provide(&container).unwrap();

        assert_eq!(a.downcast_ref::<u32>(), Some(&42));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_custom_sees_container() {
        let container = Container::new();
        container.constant("name", "db");

        let provider = Provider::custom(|c| {
            let name = c.fetch_as::<&str>("name")?.map(|n| *n).unwrap_or("none");
            Ok(Arc::new(format!("conn:{}", name)))
        });

        let value = provider.provide(&container).unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("conn:db"));
    }

    #[test]
    fn test_factory_provides_injector() {
        let container = Container::new();
        let provider = Provider::Factory {
            class: Class::new("Counter", Vec::<String>::new(), |_: Arguments| Ok(0u8)).into(),
            injection: Injection::none(),
        };

        let value = provider.provide(&container).unwrap();
        assert!(value.is::<Injector>());
        assert_eq!(provider.kind(), "factory");
    }
}
