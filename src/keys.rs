//! Key resolution
//!
//! Turns a declared parameter list into the list of registry keys used to
//! fill each argument. Overrides come from annotations and from explicit
//! registration keys; the output always has one key per declared parameter.

use crate::bindings::{Key, OverrideMap, Slot};
use ahash::RandomState;
use std::collections::HashMap;

/// Merge override key lists into the declared parameter names.
///
/// Override maps apply left to right, so later maps win. A positional entry
/// replaces the key at that position when the position exists; a named entry
/// replaces the key of the parameter declared under that name in `base`.
/// Entries that address neither are ignored, and the result is always as
/// long as `base`.
///
/// # Examples
///
/// ```rust
/// use slinpin::{merge_keys, OverrideMap};
///
/// let base = vec!["a".to_string(), "b".to_string(), "c".to_string()];
/// let annotations = OverrideMap::from(["d", "e"]);
/// let explicit = OverrideMap::from(["f"]);
///
/// assert_eq!(merge_keys(&base, [&annotations, &explicit]), ["f", "e", "c"]);
/// ```
pub fn merge_keys<'a, I>(base: &[Key], overrides: I) -> Vec<Key>
where
    I: IntoIterator<Item = &'a OverrideMap<Key>>,
{
    let mut merged = base.to_vec();

    // Duplicate declared names bind to their last position
    let declared: HashMap<&str, usize, RandomState> = base
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    for map in overrides {
        for (slot, key) in map.iter() {
            let target = match slot {
                Slot::Position(i) => Some(*i).filter(|i| *i < merged.len()),
                Slot::Name(name) => declared.get(name.as_str()).copied(),
            };

            if let Some(i) = target {
                merged[i].clone_from(key);
            }
        }
    }

    merged
}
