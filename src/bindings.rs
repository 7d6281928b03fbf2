//! Override maps keyed by argument position or parameter name
//!
//! Every override source in the container (annotation directives, keys
//! supplied at registration, values supplied at registration, call-time
//! locals) is an [`OverrideMap`]. Entries are addressed by a [`Slot`], which
//! is either an ordinal position or a declared parameter name; both kinds may
//! coexist in one map.
//!
//! Iteration follows insertion order. Re-inserting an existing slot replaces
//! the value in place without moving the entry.

use crate::Injectable;
use ahash::RandomState;
use indexmap::{Equivalent, IndexMap};
use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Registry key and argument binding name
pub type Key = String;

/// Type-erased value produced by a provider or supplied as an override
pub type Value = Arc<dyn Any + Send + Sync>;

/// Call-time values passed to an [`Injector`](crate::Injector)
pub type Locals = OverrideMap<Value>;

/// Address of an override entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    /// Ordinal argument position
    Position(usize),
    /// Declared parameter name
    Name(Key),
}

impl Hash for Slot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Slot::Position(i) => SlotRef::Position(*i).hash(state),
            Slot::Name(name) => SlotRef::Name(name).hash(state),
        }
    }
}

impl From<usize> for Slot {
    fn from(position: usize) -> Self {
        Slot::Position(position)
    }
}

impl From<&str> for Slot {
    fn from(name: &str) -> Self {
        Slot::Name(name.to_owned())
    }
}

impl From<String> for Slot {
    fn from(name: String) -> Self {
        Slot::Name(name)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Position(i) => write!(f, "#{}", i),
            Slot::Name(name) => write!(f, "${}", name),
        }
    }
}

/// Borrowed slot used for allocation-free lookups.
///
/// Must hash exactly like the owned [`Slot`] it stands for.
#[derive(Clone, Copy)]
enum SlotRef<'a> {
    Position(usize),
    Name(&'a str),
}

impl Hash for SlotRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            SlotRef::Position(i) => {
                state.write_u8(0);
                i.hash(state);
            }
            SlotRef::Name(name) => {
                state.write_u8(1);
                name.hash(state);
            }
        }
    }
}

impl Equivalent<Slot> for SlotRef<'_> {
    fn equivalent(&self, key: &Slot) -> bool {
        match (self, key) {
            (SlotRef::Position(a), Slot::Position(b)) => a == b,
            (SlotRef::Name(a), Slot::Name(b)) => *a == b.as_str(),
            _ => false,
        }
    }
}

/// Insertion-ordered map from [`Slot`] to an override value.
///
/// # Examples
///
/// ```rust
/// use slinpin::OverrideMap;
///
/// let keys: OverrideMap<String> = OverrideMap::new()
///     .at(1, "cache".to_string())
///     .named("db", "primary_db".to_string());
///
/// assert_eq!(keys.position(1).map(String::as_str), Some("cache"));
/// assert_eq!(keys.name("db").map(String::as_str), Some("primary_db"));
/// assert_eq!(keys.len(), 2);
/// ```
#[derive(Clone)]
pub struct OverrideMap<V> {
    entries: IndexMap<Slot, V, RandomState>,
}

impl<V> OverrideMap<V> {
    /// Create an empty map
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::with_hasher(RandomState::new()),
        }
    }

    /// Build a purely positional map: the n-th item lands at position n
    pub fn positional<I>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Slot::Position(i), v))
            .collect()
    }

    /// Insert an entry, returning the value it replaced
    #[inline]
    pub fn insert(&mut self, slot: Slot, value: V) -> Option<V> {
        self.entries.insert(slot, value)
    }

    /// Add a positional entry and continue the chain
    #[inline]
    pub fn at(mut self, position: usize, value: V) -> Self {
        self.insert(Slot::Position(position), value);
        self
    }

    /// Add a named entry and continue the chain
    #[inline]
    pub fn named(mut self, name: impl Into<Key>, value: V) -> Self {
        self.insert(Slot::Name(name.into()), value);
        self
    }

    /// Entry stored at `position`
    #[inline]
    pub fn position(&self, position: usize) -> Option<&V> {
        self.entries.get(&SlotRef::Position(position))
    }

    /// Entry stored under parameter `name`
    #[inline]
    pub fn name(&self, name: &str) -> Option<&V> {
        self.entries.get(&SlotRef::Name(name))
    }

    /// Entry for an argument: the name entry wins over the position entry
    #[inline]
    pub fn lookup(&self, name: &str, position: usize) -> Option<&V> {
        self.name(name).or_else(|| self.position(position))
    }

    /// Entries in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&Slot, &V)> {
        self.entries.iter()
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideMap<Value> {
    /// Erase `value` and add it at `position`
    #[inline]
    pub fn value_at<T: Injectable>(self, position: usize, value: T) -> Self {
        self.at(position, Arc::new(value) as Value)
    }

    /// Erase `value` and add it under `name`
    #[inline]
    pub fn value<T: Injectable>(self, name: impl Into<Key>, value: T) -> Self {
        self.named(name, Arc::new(value) as Value)
    }
}

impl<V> Default for OverrideMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(Slot, V)> for OverrideMap<V> {
    fn from_iter<I: IntoIterator<Item = (Slot, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (slot, value) in iter {
            map.insert(slot, value);
        }
        map
    }
}

impl<const N: usize> From<[&str; N]> for OverrideMap<Key> {
    fn from(keys: [&str; N]) -> Self {
        Self::positional(keys.into_iter().map(str::to_owned))
    }
}

impl From<Vec<Key>> for OverrideMap<Key> {
    fn from(keys: Vec<Key>) -> Self {
        Self::positional(keys)
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for OverrideMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// Explicit bindings attached to a registration or a one-shot injection.
///
/// `keys` redirect parameters to other registry keys; `values` bypass the
/// registry entirely. Values outrank the registry but are outranked by
/// call-time locals.
///
/// # Examples
///
/// ```rust
/// use slinpin::Injection;
///
/// // Bind the first parameter to the "replica_db" key and hard-code "timeout".
/// let injection = Injection::new()
///     .key_at(0, "replica_db")
///     .value("timeout", 30u64);
///
/// assert_eq!(injection.key_overrides().len(), 1);
/// assert_eq!(injection.value_overrides().len(), 1);
/// ```
#[derive(Clone, Default, Debug)]
pub struct Injection {
    keys: OverrideMap<Key>,
    values: OverrideMap<Value>,
}

impl Injection {
    /// Create an empty injection
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// No explicit bindings
    #[inline]
    pub fn none() -> Self {
        Self::default()
    }

    /// Positional key list: the n-th key replaces the n-th parameter
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Self {
            keys: OverrideMap::positional(keys.into_iter().map(Into::into)),
            values: OverrideMap::new(),
        }
    }

    /// Redirect the parameter at `position` to registry key `key`
    #[inline]
    pub fn key_at(mut self, position: usize, key: impl Into<Key>) -> Self {
        self.keys.insert(Slot::Position(position), key.into());
        self
    }

    /// Redirect parameter `name` to registry key `key`
    #[inline]
    pub fn key(mut self, name: impl Into<Key>, key: impl Into<Key>) -> Self {
        self.keys.insert(Slot::Name(name.into()), key.into());
        self
    }

    /// Supply a value for the argument at `position`
    #[inline]
    pub fn value_at<T: Injectable>(mut self, position: usize, value: T) -> Self {
        self.values.insert(Slot::Position(position), Arc::new(value));
        self
    }

    /// Supply a value for the argument bound to `name`
    #[inline]
    pub fn value<T: Injectable>(mut self, name: impl Into<Key>, value: T) -> Self {
        self.values.insert(Slot::Name(name.into()), Arc::new(value));
        self
    }

    /// Replace all key overrides
    #[inline]
    pub fn with_keys(mut self, keys: OverrideMap<Key>) -> Self {
        self.keys = keys;
        self
    }

    /// Replace all value overrides
    #[inline]
    pub fn with_values(mut self, values: OverrideMap<Value>) -> Self {
        self.values = values;
        self
    }

    /// Key overrides
    #[inline]
    pub fn key_overrides(&self) -> &OverrideMap<Key> {
        &self.keys
    }

    /// Value overrides
    #[inline]
    pub fn value_overrides(&self) -> &OverrideMap<Value> {
        &self.values
    }
}

impl<const N: usize> From<[&str; N]> for Injection {
    fn from(keys: [&str; N]) -> Self {
        Self::keys(keys)
    }
}

impl From<OverrideMap<Key>> for Injection {
    fn from(keys: OverrideMap<Key>) -> Self {
        Self::new().with_keys(keys)
    }
}

/// Build a [`Locals`] map from `name => value` pairs.
///
/// ```rust
/// use slinpin::locals;
///
/// let locals = locals! { "x" => 1i32, "y" => 2i32 };
/// assert_eq!(locals.len(), 2);
/// ```
#[macro_export]
macro_rules! locals {
    () => {
        $crate::Locals::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::Locals::new()$(.value($name, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_name_over_position() {
        let map: OverrideMap<Key> = OverrideMap::new().at(0, "by_position".into()).named("a", "by_name".into());

        assert_eq!(map.lookup("a", 0).map(String::as_str), Some("by_name"));
        assert_eq!(map.lookup("b", 0).map(String::as_str), Some("by_position"));
        assert_eq!(map.lookup("b", 1), None);
    }

    #[test]
    fn test_reinsert_keeps_order() {
        let map: OverrideMap<Key> = OverrideMap::new()
            .at(1, "e".into())
            .at(0, "d".into())
            .at(1, "x".into());

        let slots: Vec<_> = map.iter().map(|(slot, key)| (slot.clone(), key.clone())).collect();
        assert_eq!(
            slots,
            vec![(Slot::Position(1), "x".to_string()), (Slot::Position(0), "d".to_string())]
        );
    }

    #[test]
    fn test_positional_from_array() {
        let map = OverrideMap::<Key>::from(["d", "e"]);
        assert_eq!(map.position(0).map(String::as_str), Some("d"));
        assert_eq!(map.position(1).map(String::as_str), Some("e"));
        assert!(map.name("d").is_none());
    }

    #[test]
    fn test_locals_macro_erases_values() {
        let locals = locals! { "x" => 1i32, "label" => "point" };

        let x = locals.name("x").and_then(|v| v.downcast_ref::<i32>()).copied();
        assert_eq!(x, Some(1));

        let label = locals.name("label").and_then(|v| v.downcast_ref::<&str>()).copied();
        assert_eq!(label, Some("point"));
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(Slot::Position(2).to_string(), "#2");
        assert_eq!(Slot::from("db").to_string(), "$db");
    }
}
