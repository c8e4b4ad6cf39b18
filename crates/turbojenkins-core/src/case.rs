//! camelCase ⇄ snake_case conversion for Jenkins field names.
//!
//! Names starting with an underscore (`_class`) are server internals and
//! pass through both directions untouched.

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("Failed to compile word boundary regex"));

static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("Failed to compile case boundary regex"));

/// Convert a snake_case name to the camelCase form Jenkins uses.
///
/// ```rust
/// use turbojenkins_core::case::snake_to_camel;
///
/// assert_eq!(snake_to_camel("next_build_number"), "nextBuildNumber");
/// assert_eq!(snake_to_camel("_class"), "_class");
/// ```
pub fn snake_to_camel(name: &str) -> String {
    if name.starts_with('_') {
        return name.to_string();
    }
    let mut parts = name.split('_');
    let mut out = parts.next().unwrap_or_default().to_lowercase();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Convert a camelCase Jenkins field name to snake_case.
///
/// ```rust
/// use turbojenkins_core::case::camel_to_snake;
///
/// assert_eq!(camel_to_snake("nextBuildNumber"), "next_build_number");
/// assert_eq!(camel_to_snake("_class"), "_class");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let step = WORD_BOUNDARY.replace_all(name, "${1}_${2}");
    LOWER_UPPER
        .replace_all(&step, "${1}_${2}")
        .to_lowercase()
}
