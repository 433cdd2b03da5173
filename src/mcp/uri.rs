//! Single-level URI templates (`users://{userId}/profile`)
//!
//! The server matches concrete URIs against registered templates; the client
//! fills placeholders from operator input before issuing a read.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, UserbaseError};

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"));

/// Every placeholder occurrence in order of appearance, duplicates included
pub fn placeholders(uri: &str) -> Vec<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(uri)
        .map(|c| c[1].to_string())
        .collect()
}

/// Whether any `{...}` remains in the URI
pub fn has_placeholders(uri: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(uri)
}

/// Replace the first remaining `{name}` occurrence with `value`
pub fn fill_first(uri: &str, name: &str, value: &str) -> String {
    uri.replacen(&format!("{{{}}}", name), value, 1)
}

/// Substitute every placeholder from `values`.
///
/// Fails if a placeholder has no value or if the result still contains braces,
/// so a request never goes out with a literal `{...}`.
pub fn expand(template: &str, values: &HashMap<String, String>) -> Result<String> {
    let mut uri = template.to_string();
    for name in placeholders(template) {
        let value = values
            .get(&name)
            .ok_or_else(|| UserbaseError::InvalidInput(format!("no value for '{{{}}}'", name)))?;
        uri = fill_first(&uri, &name, value);
    }
    ensure_resolved(&uri)?;
    Ok(uri)
}

/// Reject URIs that still carry unresolved placeholders
pub fn ensure_resolved(uri: &str) -> Result<()> {
    if has_placeholders(uri) {
        return Err(UserbaseError::InvalidInput(format!(
            "unresolved placeholder in '{}'",
            uri
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

/// A parsed template that can match concrete URIs
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER_PATTERN.captures_iter(source) {
            let whole = caps.get(0).expect("capture 0 always present");
            if whole.start() > last {
                parts.push(Part::Literal(source[last..whole.start()].to_string()));
            }
            parts.push(Part::Var(caps[1].to_string()));
            last = whole.end();
        }
        if last < source.len() {
            parts.push(Part::Literal(source[last..].to_string()));
        }
        Self {
            source: source.to_string(),
            parts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match a concrete URI, returning the placeholder values.
    ///
    /// Each placeholder matches a non-empty run without `/`.
    pub fn match_uri(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut values = HashMap::new();
        let mut rest = uri;
        let mut parts = self.parts.iter().peekable();

        while let Some(part) = parts.next() {
            match part {
                Part::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                Part::Var(name) => {
                    let end = match parts.peek() {
                        Some(Part::Literal(next)) => rest.find(next.as_str())?,
                        Some(Part::Var(_)) => return None,
                        None => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    values.insert(name.clone(), value.to_string());
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(values)
    }
}
