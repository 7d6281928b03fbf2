//! Injection targets and their declared signatures
//!
//! Rust has no runtime parameter-name reflection, so every target carries an
//! explicit, ordered parameter list. [`Function`] wraps a closure together
//! with its parameter names; [`Class`] wraps a constructor, usually derived
//! from a [`Constructible`] type (see `#[derive(Construct)]`).
//!
//! A target with no declared names still works: every argument then comes
//! from explicit key or value overrides.

use crate::annotation::parse_inject_annotations;
use crate::bindings::{Key, OverrideMap, Value};
use crate::values::Arguments;
use crate::{Injectable, Result};
use std::sync::Arc;

/// Type-erased body shared by functions and constructors
type Body = Arc<dyn Fn(Arguments) -> Result<Value> + Send + Sync>;

fn erase<T, F>(body: F) -> Body
where
    T: Injectable,
    F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(move |args| body(args).map(|value| Arc::new(value) as Value))
}

fn collect_keys<I, K>(parameters: I) -> Vec<Key>
where
    I: IntoIterator<Item = K>,
    K: Into<Key>,
{
    parameters.into_iter().map(Into::into).collect()
}

/// The signature side of an injection target
pub trait Reflect {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Declared parameter names in declaration order
    fn parameters(&self) -> &[Key];

    /// Key overrides declared by the target itself
    fn annotations(&self) -> &OverrideMap<Key>;
}

// =============================================================================
// Function
// =============================================================================

/// A callable with a declared parameter list.
///
/// # Examples
///
/// ```rust
/// use slinpin::{Arguments, Function};
///
/// let greet = Function::new("greet", ["name"], |args: Arguments| {
///     Ok(format!("hello {}", args.get::<String>(0)?))
/// });
///
/// assert_eq!(greet.parameters(), ["name"]);
/// ```
#[derive(Clone)]
pub struct Function {
    name: String,
    parameters: Vec<Key>,
    annotations: OverrideMap<Key>,
    body: Body,
}

impl Function {
    /// Create a function whose result is erased into a [`Value`]
    pub fn new<T, F, I, K>(name: impl Into<String>, parameters: I, body: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Self {
            name: name.into(),
            parameters: collect_keys(parameters),
            annotations: OverrideMap::new(),
            body: erase(body),
        }
    }

    /// Create a function that already returns an erased [`Value`].
    ///
    /// Use this to pass resolved values through unchanged.
    pub fn erased<F, I, K>(name: impl Into<String>, parameters: I, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value> + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Self {
            name: name.into(),
            parameters: collect_keys(parameters),
            annotations: OverrideMap::new(),
            body: Arc::new(body),
        }
    }

    /// Create a function with no declared parameter names
    pub fn native<T, F>(name: impl Into<String>, body: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self::new(name, Vec::<Key>::new(), body)
    }

    /// Read `@inject` directives from documentation text
    pub fn with_doc(mut self, doc: &str) -> Self {
        self.annotations = parse_inject_annotations(doc);
        self
    }

    /// Set the declared key overrides directly
    pub fn with_annotations(mut self, annotations: OverrideMap<Key>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Declared parameter names
    #[inline]
    pub fn parameters(&self) -> &[Key] {
        &self.parameters
    }

    /// Run the body with resolved arguments
    #[inline]
    pub fn call(&self, args: Arguments) -> Result<Value> {
        (self.body)(args)
    }
}

impl Reflect for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[Key] {
        &self.parameters
    }

    fn annotations(&self) -> &OverrideMap<Key> {
        &self.annotations
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("annotations", &self.annotations)
            .finish()
    }
}

// =============================================================================
// Class
// =============================================================================

/// A type that can be built from injected constructor arguments.
///
/// Usually implemented with `#[derive(Construct)]`, which declares the
/// struct's field names as parameters.
///
/// # Examples
///
/// ```rust
/// use slinpin::{Arguments, Constructible, Key, Result};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Constructible for Point {
///     fn parameters() -> Vec<Key> {
///         vec!["x".into(), "y".into()]
///     }
///
///     fn construct(args: Arguments) -> Result<Self> {
///         Ok(Point { x: args.get(0)?, y: args.get(1)? })
///     }
/// }
/// ```
pub trait Constructible: Injectable + Sized {
    /// Name the class is declared under
    fn class_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Constructor parameter names; empty for zero-argument construction
    fn parameters() -> Vec<Key> {
        Vec::new()
    }

    /// Key overrides declared on the type
    fn annotations() -> OverrideMap<Key> {
        OverrideMap::new()
    }

    /// Build an instance from resolved arguments
    fn construct(args: Arguments) -> Result<Self>;
}

/// Last path segment of a type name, without generic arguments
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A constructor with a declared parameter list.
#[derive(Clone)]
pub struct Class {
    name: String,
    parameters: Vec<Key>,
    annotations: OverrideMap<Key>,
    constructor: Body,
}

impl Class {
    /// Describe a [`Constructible`] type
    pub fn of<T: Constructible>() -> Self {
        Self {
            name: T::class_name().to_owned(),
            parameters: T::parameters(),
            annotations: T::annotations(),
            constructor: erase(T::construct),
        }
    }

    /// Describe a constructor closure
    pub fn new<T, F, I, K>(name: impl Into<String>, parameters: I, constructor: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Self {
            name: name.into(),
            parameters: collect_keys(parameters),
            annotations: OverrideMap::new(),
            constructor: erase(constructor),
        }
    }

    /// Read `@inject` directives from documentation text
    pub fn with_doc(mut self, doc: &str) -> Self {
        self.annotations = parse_inject_annotations(doc);
        self
    }

    /// Set the declared key overrides directly
    pub fn with_annotations(mut self, annotations: OverrideMap<Key>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Declared constructor parameter names
    #[inline]
    pub fn parameters(&self) -> &[Key] {
        &self.parameters
    }

    /// Build a new instance from resolved arguments
    #[inline]
    pub fn construct(&self, args: Arguments) -> Result<Value> {
        (self.constructor)(args)
    }
}

impl Reflect for Class {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[Key] {
        &self.parameters
    }

    fn annotations(&self) -> &OverrideMap<Key> {
        &self.annotations
    }
}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// A class given directly or by declared name.
///
/// Names are looked up among classes declared on the container (and its
/// ancestors) when the provider first runs.
#[derive(Clone, Debug)]
pub enum ClassRef {
    /// Fully described class
    Class(Class),
    /// Name of a declared class
    Named(String),
}

impl ClassRef {
    /// Reference a [`Constructible`] type directly
    #[inline]
    pub fn of<T: Constructible>() -> Self {
        ClassRef::Class(Class::of::<T>())
    }

    /// Name used in logs and errors
    pub fn name(&self) -> &str {
        match self {
            ClassRef::Class(class) => class.name(),
            ClassRef::Named(name) => name,
        }
    }
}

impl From<Class> for ClassRef {
    fn from(class: Class) -> Self {
        ClassRef::Class(class)
    }
}

impl From<&str> for ClassRef {
    fn from(name: &str) -> Self {
        ClassRef::Named(name.to_owned())
    }
}

impl From<String> for ClassRef {
    fn from(name: String) -> Self {
        ClassRef::Named(name)
    }
}

/// Something a service can be produced from: a call or a construction
#[derive(Clone, Debug)]
pub enum Target {
    /// Invoke a function
    Function(Function),
    /// Construct a class instance
    Class(ClassRef),
}

impl Target {
    /// Name used in logs and errors
    pub fn name(&self) -> &str {
        match self {
            Target::Function(function) => function.name(),
            Target::Class(class) => class.name(),
        }
    }
}

impl From<Function> for Target {
    fn from(function: Function) -> Self {
        Target::Function(function)
    }
}

impl From<Class> for Target {
    fn from(class: Class) -> Self {
        Target::Class(ClassRef::Class(class))
    }
}

impl From<ClassRef> for Target {
    fn from(class: ClassRef) -> Self {
        Target::Class(class)
    }
}
