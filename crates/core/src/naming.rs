//! Identifier helpers and the declaration name table.
//!
//! Declaration names are derived from pointers. The table hands out names in the order
//! pointers are registered, so the same document always yields the same names.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::pointer::Pointer;

/// Global type names a declaration must not shadow.
///
/// Only capitalized names are listed: [`to_pascal_case`] uppercases the first letter, so
/// reserved words and lowercase keywords such as `string` can never be produced.
const TS_GLOBAL_TYPES: &[&str] = &[
    "Array", "Record", "Partial", "Required", "Readonly", "Pick", "Omit", "Exclude", "Extract",
    "NonNullable", "ReturnType", "Date", "Promise", "Object", "String", "Number", "Boolean",
    "Symbol", "BigInt", "Function", "Error", "Map", "Set", "RegExp",
];

/// Check if a name must be quoted to be used as a property key.
///
/// Returns true if the name:
/// - Is empty
/// - Doesn't start with a letter, underscore, or dollar sign
/// - Contains characters other than alphanumeric, underscore, or dollar sign
pub fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || !name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Escape a string for use in a double-quoted TypeScript string literal.
pub fn escape_ts_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// Quote a property key if it is not a plain identifier.
pub fn quote_if_needed(name: &str) -> String {
    if needs_quoting(name) {
        format!("\"{}\"", escape_ts_string(name))
    } else {
        name.to_string()
    }
}

/// Convert arbitrary text to a PascalCase TypeScript identifier.
/// - Splits on every character that cannot appear in an identifier
/// - Uppercases the first letter of each part, keeping the rest
/// - Prepends `_` if the result starts with a digit or shadows a global type
pub fn to_pascal_case(name: &str) -> String {
    let mut result = String::new();
    for part in name.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$')) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.extend(chars);
        }
    }

    if result.is_empty() {
        return "_".to_string();
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) || TS_GLOBAL_TYPES.contains(&result.as_str()) {
        result = format!("_{result}");
    }

    result
}

/// Pointer → declaration name, injective and stable for a given registration order.
#[derive(Debug, Default)]
pub struct NameTable {
    names: IndexMap<Pointer, String>,
    taken: HashSet<String>,
}

impl NameTable {
    /// Assign a name to `pointer`, deriving it from `base`.
    ///
    /// On collision the PascalCase form of the whole pointer is appended, then a counter.
    /// Registering the same pointer twice returns the first name.
    pub fn assign(&mut self, pointer: &Pointer, base: &str) -> String {
        if let Some(existing) = self.names.get(pointer) {
            return existing.clone();
        }

        let base = to_pascal_case(base);
        let mut name = base.clone();
        if self.taken.contains(&name) {
            let path = to_pascal_case(&pointer.segments().join(" "));
            name = format!("{base}_{}", path.trim_start_matches('_'));
            let mut counter = 2;
            while self.taken.contains(&name) {
                name = format!("{base}_{}{counter}", path.trim_start_matches('_'));
                counter += 1;
            }
        }

        self.taken.insert(name.clone());
        self.names.insert(pointer.clone(), name.clone());
        name
    }

    /// The name previously assigned to `pointer`.
    pub fn get(&self, pointer: &Pointer) -> Option<&str> {
        self.names.get(pointer).map(String::as_str)
    }

    /// Whether `name` has already been handed out.
    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }
}
