//! Counter name helpers
//!
//! Counter names are dot-delimited, optionally module-qualified as
//! `<module>.<category>.<rest>`. Everything here is derived from the name
//! alone: timer classification, module split and the trailing identifier
//! used by the expression evaluator.

use std::sync::LazyLock;

use regex::Regex;

/// Leading `word.` module qualifier.
static MODULE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\w+)\.").unwrap());

/// Trailing identifier of a dotted name.
static IDENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)$").unwrap());

/// Whether a counter is a timer (microseconds) rather than a plain counter
///
/// Timers live under the `time.` category, either at the top level or
/// behind a module qualifier (`Module.time.Foo`).
pub fn is_timer(name: &str) -> bool {
    name.starts_with("time.") || name.contains(".time.")
}

/// Leading `word.` prefix of a counter name, if any
pub fn module_of(name: &str) -> Option<&str> {
    MODULE_PATTERN
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Counter name with its leading `word.` prefix removed
pub fn strip_module(name: &str) -> &str {
    match MODULE_PATTERN.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Trailing identifier of a counter name (`AST.NumSourceLines` -> `NumSourceLines`)
pub fn last_identifier(name: &str) -> Option<&str> {
    IDENT_PATTERN
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
