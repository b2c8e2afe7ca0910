//! Header grammar: one physical `@...` line introducing a block.
//!
//! A header line has the shape
//!
//! ```text
//! @tag(:type)?(|processor,processor)?  free text {attrs} binding
//! ```
//!
//! The free text is handed to the declaration grammar to extract data,
//! attributes and binding. Lines that start with `@` but do not match the
//! grammar are not headers; the caller decides how to report them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::syntax::declaration::{parse_declaration, Binding, DeclarationError};

/// `@NAME(:TYPE)?(|P0,P1)? REST`
static RE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(\w+)(?::(\w+))?(?:\|([\w\-]+(?:,[\w\-]+)*))?(?:\s+(.*?))?\s*$").unwrap()
});

/// The parsed, immutable form of a block's introductory line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// The leading tag. With a type override this is the block's name;
    /// otherwise it doubles as its type.
    pub name: String,
    /// Explicit type from the `:type` suffix, if any.
    pub type_override: Option<String>,
    /// Ordered post-processor names from the `|p0,p1` suffix.
    pub processors: Vec<String>,
    /// Declared attributes, in declaration order.
    pub attributes: Vec<(String, String)>,
    pub binding: Option<Binding>,
    /// Free data text left over once attributes and binding are extracted.
    pub data: String,
    /// The header line, verbatim.
    pub raw: String,
}

impl Header {
    /// The block type this header resolves to.
    pub fn effective_type(&self) -> &str {
        self.type_override.as_deref().unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Tells whether a line matches the header grammar at all.
pub fn is_header_line(line: &str) -> bool {
    RE_HEADER.is_match(line)
}

/// Parses a header line, also reporting a declaration sub-grammar failure
/// that was recovered from (the header is still produced).
pub fn parse_header_checked(line: &str) -> Option<(Header, Option<DeclarationError>)> {
    let captures = RE_HEADER.captures(line)?;
    let name = captures.get(1).map(|m| m.as_str().to_string())?;
    let type_override = captures.get(2).map(|m| m.as_str().to_string());
    let processors = captures
        .get(3)
        .map(|m| m.as_str().split(',').map(|p| p.trim().to_string()).collect())
        .unwrap_or_default();
    let rest = captures.get(4).map(|m| m.as_str()).unwrap_or("");

    let declaration = parse_declaration(rest);
    let mut attributes = declaration.attributes;
    if type_override.is_some() && !attributes.iter().any(|(k, _)| k == "name") {
        // With an explicit type the leading tag names the block.
        attributes.insert(0, ("name".to_string(), name.clone()));
    }
    let header = Header {
        name,
        type_override,
        processors,
        attributes,
        binding: declaration.binding,
        data: declaration.data,
        raw: line.to_string(),
    };
    Some((header, declaration.recovered))
}

/// Parses a header line. Returns `None` for non-matching lines.
pub fn parse_header(line: &str) -> Option<Header> {
    parse_header_checked(line).map(|(header, _)| header)
}
