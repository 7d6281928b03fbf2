//! # Slinpin - Keyed Dependency Injection for Rust
//!
//! A small dependency injection container that wires function and
//! constructor arguments by **parameter name**. Providers live under string
//! keys; a parameter called `db` is filled from whatever is registered under
//! `"db"`, unless an override redirects it.
//!
//! ## Features
//!
//! - 🔑 **Name-driven wiring** - Parameters resolve to registry keys of the same name
//! - 🧩 **Overrides** - Redirect keys or supply values by position or by name
//! - 💾 **Memoized providers** - Every provider runs at most once per scope
//! - 🏭 **Factories** - Memoized instantiators that build a fresh instance per call
//! - 🔄 **Scoped containers** - Child scopes fall back to their parents
//! - 🔁 **Cycle detection** - Re-entrant providers fail with a readable key path
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use slinpin::{Container, Function, Injection};
//!
//! let container = Container::new();
//!
//! // Fixed values
//! container.constant("greeting", "hello");
//! container.constant("name", "world");
//!
//! // Memoized result of a call whose parameters are registry keys
//! container.variable(
//!     "message",
//!     Function::new("message", ["greeting", "name"], |args| {
//!         Ok(format!("{}, {}!", args.get::<&str>(0)?, args.get::<&str>(1)?))
//!     }),
//!     Injection::none(),
//! );
//!
//! let message = container.fetch_as::<String>("message").unwrap().unwrap();
//! assert_eq!(*message, "hello, world!");
//! ```
//!
//! ## Providers
//!
//! ```rust
//! use slinpin::{locals, Class, Container, Function, Injection};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct RequestId(u64);
//!
//! let container = Container::new();
//!
//! // Constant - stored as is
//! container.constant("prefix", "req");
//!
//! // Service - injected once, the same instance on every fetch
//! container.service(
//!     "first_id",
//!     Function::native("first_id", |_| Ok(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)))),
//!     Injection::none(),
//! );
//!
//! // Factory - a memoized instantiator building a new instance per call
//! container.factory(
//!     "request_id",
//!     Class::new("RequestId", ["seed"], |args| Ok(RequestId(args.get(0)?))),
//!     Injection::none(),
//! );
//!
//! let make = container.instantiator("request_id").unwrap().unwrap();
//! let id = make.call_as::<RequestId>(&locals! { "seed" => 7u64 }).unwrap();
//! assert_eq!(id.0, 7);
//! ```
//!
//! ## Overrides
//!
//! Each registration takes an [`Injection`]: key overrides redirect a
//! parameter to a different registry key, value overrides skip the registry
//! entirely. Both may be keyed by position or by parameter name; a name
//! entry wins over a position entry.
//!
//! ```rust
//! use slinpin::{Container, Function, Injection};
//!
//! let container = Container::new();
//! container.constant("primary", "10.0.0.1");
//! container.constant("replica", "10.0.0.2");
//!
//! let connect = Function::new("connect", ["host", "port"], |args| {
//!     Ok(format!("{}:{}", args.get::<&str>(0)?, args.get::<u16>(1)?))
//! });
//!
//! container.variable(
//!     "reader",
//!     connect,
//!     Injection::new().key("host", "replica").value_at(1, 5433u16),
//! );
//!
//! assert_eq!(*container.fetch_as::<String>("reader").unwrap().unwrap(), "10.0.0.2:5433");
//! ```
//!
//! ## Scoped Containers
//!
//! ```rust
//! use slinpin::Container;
//!
//! let root = Container::new();
//! root.constant("app", "billing");
//!
//! let request = root.scope();
//! request.constant("user", 42u64);
//!
//! // Request scope can see root keys
//! assert!(request.contains("app"));
//!
//! // Root cannot see request keys
//! assert!(!root.contains("user"));
//! ```
//!
//! ## Derive
//!
//! With the `derive` feature, `#[derive(Construct)]` implements
//! [`Constructible`] using the struct's field names as constructor
//! parameters.
//!
//! ```rust
//! # #[cfg(feature = "derive")]
//! # {
//! use slinpin::{Construct, Container, Injection};
//! use std::sync::Arc;
//!
//! struct Pool;
//!
//! #[derive(Construct)]
//! struct Repo {
//!     #[inject("pool")]
//!     db: Arc<Pool>,
//!     table: String,
//! }
//!
//! let container = Container::new();
//! container.constant("pool", Pool);
//! container.constant("table", String::from("users"));
//! container.service("repo", slinpin::ClassRef::of::<Repo>(), Injection::none());
//!
//! let repo = container.fetch_as::<Repo>("repo").unwrap().unwrap();
//! assert_eq!(repo.table, "users");
//! # }
//! ```

mod annotation;
mod bindings;
mod container;
mod error;
mod injector;
mod keys;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod reflect;
mod scope;
mod storage;
mod values;

pub use annotation::*;
pub use bindings::*;
pub use container::*;
pub use error::*;
pub use injector::*;
pub use keys::*;
pub use provider::*;
pub use reflect::*;
pub use scope::*;
pub use values::*;

#[cfg(feature = "derive")]
pub use slinpin_derive::Construct;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "derive")]
    pub use crate::Construct;
    pub use crate::{
        locals, Arguments, Class, ClassRef, Constructible, Container, DiError, Function, Injectable, Injection,
        Injector, Key, Locals, MissingKeyPolicy, Provider, Result, ScopeBuilder, ScopeHandle, Value,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    fn open_db() -> Function {
        Function::new("open_db", ["url"], |args| Ok(Database { url: args.get(0)? }))
    }

    #[test]
    fn test_service_registration() {
        let container = Container::new();
        container.constant("url", String::from("test"));
        container.service("db", open_db(), Injection::none());

        let db = container.fetch_as::<Database>("db").unwrap().unwrap();
        assert_eq!(db.url, "test");
    }

    #[test]
    fn test_multiple_fetch_same_instance() {
        let container = Container::new();
        container.constant("url", String::from("test"));
        container.service("db", open_db(), Injection::none());

        let db1 = container.fetch_as::<Database>("db").unwrap().unwrap();
        let db2 = container.fetch_as::<Database>("db").unwrap().unwrap();

        // Same Arc instance
        assert!(Arc::ptr_eq(&db1, &db2));
    }

    #[test]
    fn test_factory_creates_new_instance() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct Counter(u32);

        let container = Container::new();
        container.factory(
            "counter",
            Class::new("Counter", Vec::<Key>::new(), |_| Ok(Counter(COUNTER.fetch_add(1, Ordering::SeqCst)))),
            Injection::none(),
        );

        let make = container.instantiator("counter").unwrap().unwrap();
        let c1 = make.call_as::<Counter>(&Locals::new()).unwrap();
        let c2 = make.call_as::<Counter>(&Locals::new()).unwrap();

        assert_ne!(c1.0, c2.0);
    }

    #[test]
    fn test_variable_is_lazy() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container.variable(
            "lazy",
            Function::native("lazy", |_| {
                CREATED.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            Injection::none(),
        );

        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        let _ = container.fetch("lazy").unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        // Second fetch doesn't run the provider again
        let _ = container.fetch("lazy").unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_child_reads_parent_constant() {
        let root = Container::new();
        root.constant("k", "v");

        let child = root.scope();
        assert_eq!(*child.fetch_as::<&str>("k").unwrap().unwrap(), "v");
    }

    #[test]
    fn test_missing_is_not_an_error() {
        let container = Container::new();
        assert!(container.fetch("missing").unwrap().is_none());
    }

    #[test]
    fn test_unresolved_parameter_is_empty() {
        let container = Container::new();
        container.variable(
            "maybe",
            Function::new("maybe", ["nothing"], |args| Ok(args.optional::<u8>(0)?.is_none())),
            Injection::none(),
        );

        assert!(*container.fetch_as::<bool>("maybe").unwrap().unwrap());
    }
}
