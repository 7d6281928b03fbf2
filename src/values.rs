//! Value resolution
//!
//! Fills a merged key list with concrete values. Override sources are probed
//! most specific first; anything they do not cover is looked up in the
//! registry.

use crate::bindings::{Key, OverrideMap, Value};
use crate::{DiError, Injectable, Result};
use std::sync::Arc;

/// Resolve one value per key.
///
/// `sources` are ordered from lowest to highest priority: the last source is
/// consulted first. For the key at position `i`, the first source holding
/// either a name entry for that key or a position entry for `i` supplies the
/// value, the name entry winning inside a single source. Keys no source
/// covers go to `lookup`, whose `Ok(None)` leaves the slot empty.
///
/// # Examples
///
/// ```rust
/// use slinpin::{resolve_values, Locals};
///
/// let keys = vec!["format".to_string(), "arg".to_string()];
/// let defaults = Locals::new().value_at(0, "a%s").value_at(1, "b");
/// let locals = Locals::new().value_at(1, "h");
///
/// let args = resolve_values(&keys, &[&defaults, &locals], |_| Ok(None)).unwrap();
/// assert_eq!(args.get::<&str>(0).unwrap(), "a%s");
/// assert_eq!(args.get::<&str>(1).unwrap(), "h");
/// ```
pub fn resolve_values<F>(keys: &[Key], sources: &[&OverrideMap<Value>], mut lookup: F) -> Result<Arguments>
where
    F: FnMut(&str) -> Result<Option<Value>>,
{
    let mut values = Vec::with_capacity(keys.len());

    for (position, key) in keys.iter().enumerate() {
        let overridden = sources
            .iter()
            .rev()
            .find_map(|source| source.lookup(key, position));

        let value = match overridden {
            Some(value) => Some(Arc::clone(value)),
            None => lookup(key)?,
        };

        values.push(value);
    }

    Ok(Arguments {
        keys: keys.to_vec(),
        values,
    })
}

/// Resolved arguments handed to a function or constructor body.
///
/// Each slot keeps the key it was resolved from so that failures can name it.
#[derive(Clone, Default)]
pub struct Arguments {
    keys: Vec<Key>,
    values: Vec<Option<Value>>,
}

impl Arguments {
    /// Assemble arguments directly, bypassing resolution
    pub fn new(keys: Vec<Key>, values: Vec<Option<Value>>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self { keys, values }
    }

    /// Number of argument slots
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no slots
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys the slots were resolved from
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Key for `position`
    #[inline]
    pub fn key(&self, position: usize) -> Option<&str> {
        self.keys.get(position).map(String::as_str)
    }

    /// Raw value at `position`, `None` if the slot is empty or out of range
    #[inline]
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.values.get(position).and_then(Option::as_ref)
    }

    /// Raw value at `position`, failing if the slot is empty
    pub fn require(&self, position: usize) -> Result<Value> {
        self.value(position).cloned().ok_or_else(|| self.missing(position))
    }

    /// Shared value at `position` downcast to `T`
    pub fn arc<T: Injectable>(&self, position: usize) -> Result<Arc<T>> {
        self.optional_arc(position)?.ok_or_else(|| self.missing(position))
    }

    /// Owned copy of the value at `position`
    pub fn get<T: Injectable + Clone>(&self, position: usize) -> Result<T> {
        self.arc::<T>(position).map(|value| T::clone(&value))
    }

    /// Shared value at `position`; an empty slot is `Ok(None)`
    pub fn optional_arc<T: Injectable>(&self, position: usize) -> Result<Option<Arc<T>>> {
        match self.value(position) {
            None => Ok(None),
            Some(value) => Arc::clone(value)
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::type_mismatch::<T>(self.key(position).unwrap_or_default())),
        }
    }

    /// Owned copy of the value at `position`; an empty slot is `Ok(None)`
    pub fn optional<T: Injectable + Clone>(&self, position: usize) -> Result<Option<T>> {
        Ok(self.optional_arc::<T>(position)?.map(|value| T::clone(&value)))
    }

    /// Consume into the raw value slots
    #[inline]
    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }

    fn missing(&self, position: usize) -> DiError {
        DiError::MissingArgument {
            position,
            key: self.key(position).unwrap_or_default().to_owned(),
        }
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.keys
                    .iter()
                    .zip(&self.values)
                    .map(|(key, value)| (key, value.is_some())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Locals;

    fn keys(list: &[&str]) -> Vec<Key> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn strings(args: &Arguments) -> Vec<Option<&'static str>> {
        (0..args.len()).map(|i| args.optional::<&'static str>(i).unwrap()).collect()
    }

    #[test]
    fn test_last_source_has_priority() {
        let keys = keys(&["format", "arg1"]);
        let s1 = Locals::new().value_at(0, "g");
        let s2 = Locals::new().value_at(0, "k").value_at(1, "l");

        let args = resolve_values(&keys, &[&s1, &s2], |_| Ok(None)).unwrap();
        assert_eq!(strings(&args), [Some("k"), Some("l")]);

        let args = resolve_values(&keys, &[&s2, &s1], |_| Ok(None)).unwrap();
        assert_eq!(strings(&args), [Some("g"), Some("l")]);
    }

    #[test]
    fn test_name_beats_position_within_one_source() {
        let keys = keys(&["format", "arg1"]);
        let defaults = Locals::new()
            .value_at(0, "a%s")
            .value_at(1, "b")
            .value("format", "c%s")
            .value("arg1", "d");
        let locals = Locals::new()
            .value_at(0, "g%s")
            .value_at(1, "h")
            .value("format", "i%s")
            .value("arg1", "j");

        let args = resolve_values(&keys, &[&defaults, &locals], |_| Ok(None)).unwrap();
        assert_eq!(strings(&args), [Some("i%s"), Some("j")]);
    }

    #[test]
    fn test_sources_fall_through_per_slot() {
        let keys = keys(&["format", "arg1"]);
        let defaults = Locals::new().value_at(0, "a%s");
        let locals = Locals::new().value_at(1, "h");

        let args = resolve_values(&keys, &[&defaults, &locals], |_| Ok(None)).unwrap();
        assert_eq!(strings(&args), [Some("a%s"), Some("h")]);
    }

    #[test]
    fn test_lookup_fills_uncovered_keys() {
        let keys = keys(&["db", "cache"]);
        let locals = Locals::new().value("cache", "local-cache");
        let mut looked_up = Vec::new();

        let args = resolve_values(&keys, &[&locals], |key| {
            looked_up.push(key.to_string());
            Ok(Some(Arc::new("registry-db") as Value))
        })
        .unwrap();

        assert_eq!(looked_up, ["db"]);
        assert_eq!(strings(&args), [Some("registry-db"), Some("local-cache")]);
    }

    #[test]
    fn test_unresolved_slot_is_empty() {
        let keys = keys(&["missing"]);
        let args = resolve_values(&keys, &[], |_| Ok(None)).unwrap();

        assert_eq!(args.len(), 1);
        assert!(args.value(0).is_none());
        assert!(matches!(
            args.require(0),
            Err(DiError::MissingArgument { position: 0, ref key }) if key == "missing"
        ));
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let keys = keys(&["a"]);
        let result = resolve_values(&keys, &[], |key| Err(DiError::not_found(key)));
        assert!(matches!(result, Err(DiError::NotFound { .. })));
    }

    #[test]
    fn test_type_mismatch_names_key() {
        let args = Arguments::new(keys(&["port"]), vec![Some(Arc::new("8080") as Value)]);

        match args.get::<u16>(0) {
            Err(DiError::TypeMismatch { key, expected }) => {
                assert_eq!(key, "port");
                assert_eq!(expected, "u16");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
