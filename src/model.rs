//! Content tree and block model.
//!
//! A [`Content`] is the generic, serializable result of running a block
//! handler: an element name, attributes, ordered children and optional text.
//! A [`Block`] ties one parsed header to its body lines and its resolved
//! content. Blocks are immutable once built; the parser accumulates lines in
//! a [`BlockBuilder`] and finalizes it when the next header (or end of
//! input) closes the block.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::syntax::header::Header;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(0);

/// Allocates a process-lifetime unique block id. Ids are used to synthesize
/// default names (e.g. anonymous shaders), never for ordering.
pub fn next_block_id() -> u64 {
    NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed)
}

/// Generic content tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    pub fn node(name: impl Into<String>) -> Self {
        Content {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Content {
            text: Some(text.into()),
            ..Content::node(name)
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn child(mut self, child: Content) -> Self {
        self.children.push(child);
        self
    }

    /// Sets an attribute, replacing an existing value for the same key.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One delimited unit of a document: a header and the body lines it owns.
#[derive(Debug)]
pub struct Block {
    /// Process-lifetime unique identity.
    pub id: u64,
    pub header: Header,
    /// All input lines verbatim, header line included.
    pub raw_lines: Vec<String>,
    /// Dedented body lines, in order.
    pub body: Vec<String>,
    /// The handler's result; `None` when the handler failed.
    pub content: Option<Content>,
    /// Block-scoped handler errors; never abort the document.
    pub errors: Vec<String>,
    /// Whether the content came from the cache instead of the handler.
    pub from_cache: bool,
}

impl Block {
    pub fn type_name(&self) -> &str {
        self.header.effective_type()
    }

    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    /// Reconstructs the canonical source of the block: the `@name data`
    /// line followed by the body, trailing blank lines dropped.
    pub fn source(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.raw_lines.len());
        lines.push(format!("@{} {}", self.header.name, self.header.data));
        lines.extend(self.raw_lines.iter().skip(1).cloned());
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

/// Mutable accumulation state for one block, finalized into a [`Block`].
#[derive(Debug)]
pub struct BlockBuilder {
    id: u64,
    header: Header,
    raw_lines: Vec<String>,
    body: Vec<String>,
}

impl BlockBuilder {
    pub fn new(id: u64, header: Header) -> Self {
        let raw = header.raw.clone();
        BlockBuilder {
            id,
            header,
            raw_lines: vec![raw],
            body: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn push_body(&mut self, dedented: &str, raw: &str) {
        self.body.push(dedented.to_string());
        self.raw_lines.push(raw.to_string());
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }

    /// Drops trailing blank body lines; separator blanks before the next
    /// header do not belong to the body.
    pub fn trim_trailing_blanks(&mut self) {
        while self.body.last().is_some_and(|l| l.trim().is_empty()) {
            self.body.pop();
            self.raw_lines.pop();
        }
    }

    pub fn finish(self, content: Option<Content>, errors: Vec<String>, from_cache: bool) -> Block {
        Block {
            id: self.id,
            header: self.header,
            raw_lines: self.raw_lines,
            body: self.body,
            content,
            errors,
            from_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::header::parse_header;

    #[test]
    fn block_ids_are_unique() {
        let a = next_block_id();
        let b = next_block_id();
        assert_ne!(a, b);
    }

    #[test]
    fn source_reconstruction_drops_trailing_blanks() {
        let header = parse_header("@shader glow").unwrap();
        let mut builder = BlockBuilder::new(next_block_id(), header);
        builder.push_body("void main() {}", "\tvoid main() {}");
        builder.push_body("", "");
        let block = builder.finish(None, vec![], false);
        assert_eq!(block.source(), "@shader glow\n\tvoid main() {}");
    }

    #[test]
    fn content_set_attr_replaces() {
        let mut c = Content::node("code").attr("language", "js");
        c.set_attr("language", "sugar2");
        assert_eq!(c.attribute("language"), Some("sugar2"));
        assert_eq!(c.attributes.len(), 1);
    }
}
