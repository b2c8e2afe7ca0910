//! The block handler capability and the built-in handlers.
//!
//! A handler turns one block's header and body lines into a [`Content`]
//! tree. The parser drives it through `start`/`feed`/`end`; `end` is called
//! at most once. Handler failures are block-scoped: they are recorded on the
//! block and never abort the document.
//!
//! The heavyweight renderers (texto markup, PAML compilation, sugar
//! transpilation, PCSS) live outside this crate; the built-ins here cover
//! the structural block types and wrap embedded source verbatim.

use thiserror::Error;

use crate::model::Content;
use crate::syntax::header::Header;

/// Block-scoped handler failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The capability the parser requires from a block type.
pub trait BlockHandler {
    /// Called once when the block's header line is recognized. `block_id` is
    /// the process-unique identity, available for default-name synthesis.
    fn start(&mut self, _header: &Header, _block_id: u64) {}

    /// Called once per dedented body line, in order.
    fn feed(&mut self, _line: &str) {}

    /// Produces the block's immutable content.
    fn end(&mut self) -> Result<Content, HandlerError>;
}

/// Instantiates a fresh handler for each block occurrence.
pub type HandlerFactory = fn() -> Box<dyn BlockHandler>;

// ============================================================================
// BUILT-IN HANDLERS
// ============================================================================

/// Meta information: the node is named after the tag, the data is its text.
/// Covers `title`, `subtitle`, `author`, `focus` and the date tags.
#[derive(Default)]
pub struct MetaHandler {
    name: String,
    data: String,
}

impl BlockHandler for MetaHandler {
    fn start(&mut self, header: &Header, _block_id: u64) {
        self.name = header.name.clone();
        self.data = header.data.clone();
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        Ok(Content::with_text(self.name.clone(), self.data.trim()))
    }
}

/// Space-separated tags, lowercased.
#[derive(Default)]
pub struct TagsHandler {
    data: String,
}

impl BlockHandler for TagsHandler {
    fn start(&mut self, header: &Header, _block_id: u64) {
        self.data = header.data.clone();
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        let mut node = Content::node("tags");
        for tag in self.data.split_whitespace() {
            node.children
                .push(Content::with_text("tag", tag.to_lowercase()));
        }
        Ok(node)
    }
}

/// Headings `h1`..`h6`; the depth comes from the tag name.
#[derive(Default)]
pub struct HeadingHandler {
    depth: String,
    data: String,
}

impl BlockHandler for HeadingHandler {
    fn start(&mut self, header: &Header, _block_id: u64) {
        self.depth = header.name.trim_start_matches('h').to_string();
        self.data = header.data.clone();
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        Ok(Content::with_text("heading", self.data.trim()).attr("depth", self.depth.clone()))
    }
}

/// Imported files/modules, one `module` child per whitespace token.
#[derive(Default)]
pub struct ImportHandler {
    data: String,
}

impl BlockHandler for ImportHandler {
    fn start(&mut self, header: &Header, _block_id: u64) {
        self.data = header.data.clone();
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        let mut node = Content::node("import");
        for path in self.data.split_whitespace() {
            let basename = path.rsplit('/').next().unwrap_or(path);
            let (name, ext) = match basename.rsplit_once('.') {
                Some((stem, ext)) => (stem, ext),
                None => (basename, ""),
            };
            node.children.push(
                Content::with_text("module", path)
                    .attr("type", ext)
                    .attr("basename", basename)
                    .attr("name", name),
            );
        }
        Ok(node)
    }
}

/// Embedded source code, kept verbatim. The data names the language (the
/// rewriter synthesizes `@embed <ext>` headers).
#[derive(Default)]
pub struct EmbedHandler {
    language: String,
    attributes: Vec<(String, String)>,
    lines: Vec<String>,
}

impl BlockHandler for EmbedHandler {
    fn start(&mut self, header: &Header, _block_id: u64) {
        self.language = header.data.split_whitespace().next().unwrap_or("").to_string();
        self.attributes = header.attributes.clone();
    }

    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        let mut node = Content::with_text("code", self.lines.join("\n"));
        if !self.language.is_empty() {
            node.set_attr("language", self.language.clone());
        }
        for (k, v) in &self.attributes {
            node.set_attr(k.clone(), v.clone());
        }
        Ok(node)
    }
}

/// Plain text body, unprocessed.
#[derive(Default)]
pub struct TextHandler {
    lines: Vec<String>,
}

impl BlockHandler for TextHandler {
    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        Ok(Content::with_text("text", self.lines.join("\n")))
    }
}

/// Raw shader source. Anonymous shaders get a name synthesized from the
/// block id.
#[derive(Default)]
pub struct ShaderHandler {
    name: String,
    lines: Vec<String>,
}

impl BlockHandler for ShaderHandler {
    fn start(&mut self, header: &Header, block_id: u64) {
        self.name = if header.data.is_empty() {
            format!("shader-{block_id}")
        } else {
            header.data.clone()
        };
    }

    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        Ok(Content::node("shader")
            .attr("name", self.name.clone())
            .child(Content::with_text("source", self.lines.join("\n"))))
    }
}

/// PAML markup, wrapped as source. The data is `title + attrs`; header
/// attributes are copied onto the node.
#[derive(Default)]
pub struct PamlHandler {
    title: String,
    attributes: Vec<(String, String)>,
    lines: Vec<String>,
}

impl BlockHandler for PamlHandler {
    fn start(&mut self, header: &Header, _block_id: u64) {
        match header.data.split_once('+') {
            Some((title, attrs)) => {
                self.title = title.trim().to_string();
                if let Ok(extra) = crate::syntax::parse_attributes(attrs.trim()) {
                    self.attributes.extend(extra);
                }
            }
            None => self.title = header.data.trim().to_string(),
        }
        self.attributes.extend(header.attributes.iter().cloned());
    }

    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        let mut node = Content::node("paml");
        if !self.title.is_empty() {
            node.set_attr("title", self.title.clone());
        }
        for (k, v) in &self.attributes {
            node.set_attr(k.clone(), v.clone());
        }
        node.children
            .push(Content::with_text("source", self.lines.join("\n")));
        Ok(node)
    }
}
