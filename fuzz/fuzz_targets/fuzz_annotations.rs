#![no_main]

//! Fuzz target for the @inject parser and key merging
//!
//! Parsing arbitrary documentation must never panic, and merging whatever it
//! yields must never change the number of keys.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use slinpin::{merge_keys, parse_inject_annotations, OverrideMap};

#[derive(Debug, Arbitrary)]
struct Input {
    doc: String,
    base: Vec<String>,
    explicit: Vec<(u8, String)>,
}

fuzz_target!(|input: Input| {
    let annotations = parse_inject_annotations(&input.doc);

    for (_, key) in annotations.iter() {
        assert!(!key.is_empty());
        assert!(!key.chars().any(char::is_whitespace));
    }

    let explicit: OverrideMap<String> = input
        .explicit
        .into_iter()
        .fold(OverrideMap::new(), |map, (position, key)| map.at(position as usize, key));

    let merged = merge_keys(&input.base, [&annotations, &explicit]);
    assert_eq!(merged.len(), input.base.len());
});
