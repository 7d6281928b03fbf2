//! `@inject` directives in documentation text
//!
//! A directive redirects one parameter to another registry key:
//!
//! ```text
//! /**
//!  * @inject primary_db          first directive, applies to position 0
//!  * @inject metrics 2           applies to position 2
//!  * @inject audit_log $logger   applies to the parameter named `logger`
//!  */
//! ```
//!
//! A directive without an explicit position or `$binding` applies to the
//! position equal to its ordinal among all directives in the text.

use crate::bindings::{Key, OverrideMap, Slot};
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "logging")]
use tracing::trace;

/// One directive per line. The trailing token must be a whole word: `2` binds
/// a position, `2abc` is ignored and the directive falls back to its ordinal.
static INJECT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\*\s*)?@inject\s+(\S+)(?:\s+(\d+|\$\S+))?(?:\s|$)")
        .unwrap_or_else(|e| unreachable!("invalid @inject pattern: {e}"))
});

/// Parse `@inject` directives out of documentation text.
///
/// Never fails: text without directives, or with malformed ones, yields
/// an empty map or skips the offending lines.
///
/// # Examples
///
/// ```rust
/// use slinpin::{parse_inject_annotations, Slot};
///
/// let doc = "
///  * Builds the report.
///  * @inject primary_db
///  * @inject audit_log $logger
///  ";
///
/// let overrides = parse_inject_annotations(doc);
/// assert_eq!(overrides.position(0).map(String::as_str), Some("primary_db"));
/// assert_eq!(overrides.name("logger").map(String::as_str), Some("audit_log"));
/// ```
pub fn parse_inject_annotations(doc: &str) -> OverrideMap<Key> {
    let mut overrides = OverrideMap::new();

    let directives = doc.lines().filter_map(|line| INJECT_DIRECTIVE.captures(line));

    for (ordinal, captures) in directives.enumerate() {
        let key = captures[1].to_owned();

        let slot = match captures.get(2).map(|m| m.as_str()) {
            Some(binding) => match binding.strip_prefix('$') {
                Some(name) => Slot::Name(name.to_owned()),
                None => match binding.parse() {
                    Ok(position) => Slot::Position(position),
                    // Digits too large for usize address nothing
                    Err(_) => continue,
                },
            },
            None => Slot::Position(ordinal),
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "slinpin",
            key = %key,
            slot = %slot,
            "Parsed @inject directive"
        );

        overrides.insert(slot, key);
    }

    overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_directives() {
        let doc = "
            /**
             *
             * @inject d
             * @inject e
             * @inject f
             *
             * @param type $a
             * @param type $b
             * @param type $c
             */";

        let overrides = parse_inject_annotations(doc);
        let entries: Vec<_> = overrides.iter().map(|(s, k)| (s.clone(), k.as_str())).collect();

        assert_eq!(
            entries,
            vec![
                (Slot::Position(0), "d"),
                (Slot::Position(1), "e"),
                (Slot::Position(2), "f"),
            ]
        );
    }

    #[test]
    fn test_explicit_position_and_binding() {
        let doc = "* @inject cache 1\n* @inject db $database\n* @inject fallback";
        let overrides = parse_inject_annotations(doc);

        assert_eq!(overrides.position(1).map(String::as_str), Some("cache"));
        assert_eq!(overrides.name("database").map(String::as_str), Some("db"));
        // Third directive overall, no explicit token
        assert_eq!(overrides.position(2).map(String::as_str), Some("fallback"));
    }

    #[test]
    fn test_bare_lines_without_star() {
        let overrides = parse_inject_annotations("@inject a\n   @inject b");
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.position(1).map(String::as_str), Some("b"));
    }

    #[test]
    fn test_non_word_token_falls_back_to_ordinal() {
        let overrides = parse_inject_annotations("* @inject a 2abc");
        assert_eq!(overrides.position(0).map(String::as_str), Some("a"));
        assert!(overrides.position(2).is_none());
    }

    #[test]
    fn test_no_directives() {
        assert!(parse_inject_annotations("").is_empty());
        assert!(parse_inject_annotations("* @param int $a\n* @injection a").is_empty());
        assert!(parse_inject_annotations("text before @inject a").is_empty());
    }
}
