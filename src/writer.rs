//! Output projection: blocks to an XML-like or JSON tree.
//!
//! Each block projects to one [`Content`] node: its handler result (or a
//! bare node named after the type when the handler failed), with binding
//! attributes and block-scoped errors attached. The XML writer groups
//! meta-ish blocks under a `meta` element; the JSON writer emits the
//! projected node list.

use crate::errors::PolyblocksError;
use crate::model::{Block, Content};

/// Tags whose projection belongs under the `meta` element.
const META_TAGS: &[&str] = &[
    "title", "subtitle", "author", "focus", "date", "created", "updated", "tags",
];

/// Projects one block into its output node, surfacing binding and errors.
pub fn project(block: &Block) -> Content {
    let mut node = block
        .content
        .clone()
        .unwrap_or_else(|| Content::node(block.type_name()));
    if let Some(binding) = &block.header.binding {
        node.set_attr("binding-direction", binding.direction.as_str());
        node.set_attr("binding-internal", binding.internal.clone());
        node.set_attr("binding-external", binding.external.clone());
    }
    if !block.errors.is_empty() {
        node.children
            .push(Content::with_text("errors", block.errors.join("\n")));
    }
    node
}

/// Renders the blocks as an XML document string.
pub fn write_xml(blocks: &[Block], pretty: bool) -> String {
    let mut meta = Content::node("meta");
    let mut root = Content::node("block");
    for block in blocks {
        let node = project(block);
        if META_TAGS.contains(&block.type_name()) {
            meta.children.push(node);
        } else {
            root.children.push(node);
        }
    }
    root.children.insert(0, meta);

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    if pretty {
        out.push('\n');
    }
    write_element(&mut out, &root, pretty, 0);
    if pretty {
        out.push('\n');
    }
    out
}

/// Renders the blocks as a JSON array of projected nodes.
pub fn write_json(blocks: &[Block], pretty: bool) -> Result<String, PolyblocksError> {
    let nodes: Vec<Content> = blocks.iter().map(project).collect();
    let result = if pretty {
        serde_json::to_string_pretty(&nodes)
    } else {
        serde_json::to_string(&nodes)
    };
    result.map_err(|source| PolyblocksError::OutputEncoding { source })
}

fn write_element(out: &mut String, node: &Content, pretty: bool, depth: usize) {
    if pretty {
        out.push_str(&"\t".repeat(depth));
    }
    out.push('<');
    out.push_str(&node.name);
    for (key, value) in &node.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    if node.children.is_empty() && node.text.is_none() {
        out.push_str("/>");
        if pretty {
            out.push('\n');
        }
        return;
    }
    out.push('>');
    if let Some(text) = &node.text {
        out.push_str(&escape_text(text));
    }
    if !node.children.is_empty() {
        if pretty {
            out.push('\n');
        }
        for child in &node.children {
            write_element(out, child, pretty, depth + 1);
        }
        if pretty {
            out.push_str(&"\t".repeat(depth));
        }
    }
    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
    if pretty {
        out.push('\n');
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
