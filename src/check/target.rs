//! Syntactic validation of target-reference literals.
//!
//! A target names a build artifact the type system never resolves; all we
//! enforce here is the reference grammar:
//!
//! - exactly one `:` separating the package path from the rule name
//! - at most one `//` root marker
//! - either the local form `:name`, or the absolute form
//!   `[@cell]//pkg/path:name`
//!
//! No filesystem or build-graph access, ever.

use once_cell::sync::Lazy;
use regex::Regex;

static ABSOLUTE_TARGET: Lazy<Regex> = Lazy::new(|| {
    // optional @cell prefix, mandatory //, package path, :name
    Regex::new(r"^@?[A-Za-z0-9._-]*//[A-Za-z0-9._/-]*:[A-Za-z0-9._-]+$")
        .expect("absolute target regex is valid")
});

/// `None` when the literal is a well-formed target reference.
pub fn check_target_literal(s: &str) -> Option<String> {
    let colons = s.bytes().filter(|&b| b == b':').count();
    if colons != 1 {
        return Some(format!(
            "target must contain exactly one ':', got '{s}'"
        ));
    }
    if s.matches("//").count() > 1 {
        return Some(format!(
            "target contains more than one '//': '{s}'"
        ));
    }
    if s.starts_with(':') {
        if s.len() == 1 {
            return Some(format!("target rule name is empty: '{s}'"));
        }
        return None;
    }
    if !ABSOLUTE_TARGET.is_match(s) {
        return Some(format!(
            "target must be ':name' or '[@cell]//pkg/path:name', got '{s}'"
        ));
    }
    None
}
