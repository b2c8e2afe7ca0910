//! Block type registry.
//!
//! The registry is the single source of truth mapping a tag to its handler
//! factory. It is constructed once at the entrypoint (see
//! [`build_default_registry`]) and passed by reference into the parser;
//! there is no global registration state. Host applications extend it with
//! [`BlockRegistry::register`] before parsing.

use std::collections::HashMap;

use crate::handlers::{
    BlockHandler, EmbedHandler, HandlerFactory, HeadingHandler, ImportHandler, MetaHandler,
    PamlHandler, ShaderHandler, TagsHandler, TextHandler,
};

/// One registered block type.
pub struct BlockType {
    pub description: &'static str,
    pub factory: HandlerFactory,
}

impl BlockType {
    pub fn instantiate(&self) -> Box<dyn BlockHandler> {
        (self.factory)()
    }
}

/// Tag to handler-factory mapping.
#[derive(Default)]
pub struct BlockRegistry {
    entries: HashMap<String, BlockType>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        tag: impl Into<String>,
        description: &'static str,
        factory: HandlerFactory,
    ) {
        self.entries
            .insert(tag.into(), BlockType { description, factory });
    }

    /// Returns the entry registered for `tag`, if any. Headers resolve
    /// through their effective type before reaching this (`Parser::resolve`).
    pub fn lookup(&self, tag: &str) -> Option<&BlockType> {
        self.entries.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// All registered tags with their descriptions, sorted by tag.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut tags: Vec<_> = self
            .entries
            .iter()
            .map(|(tag, t)| (tag.as_str(), t.description))
            .collect();
        tags.sort();
        tags
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Builds the registry with all standard block types registered.
pub fn build_default_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();
    registry.register("title", "Block title", || Box::<MetaHandler>::default());
    registry.register("subtitle", "Block subtitle", || Box::<MetaHandler>::default());
    registry.register("author", "Author meta information", || {
        Box::<MetaHandler>::default()
    });
    registry.register("focus", "Focus meta information", || {
        Box::<MetaHandler>::default()
    });
    registry.register("date", "Date (raw text)", || Box::<MetaHandler>::default());
    registry.register("created", "Creation date (raw text)", || {
        Box::<MetaHandler>::default()
    });
    registry.register("updated", "Update date (raw text)", || {
        Box::<MetaHandler>::default()
    });
    registry.register("tags", "Tags (space-separated)", || {
        Box::<TagsHandler>::default()
    });
    for h in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        registry.register(h, "Heading", || Box::<HeadingHandler>::default());
    }
    registry.register("import", "Imports files/modules", || {
        Box::<ImportHandler>::default()
    });
    registry.register("embed", "Embedded source code (raw text)", || {
        Box::<EmbedHandler>::default()
    });
    registry.register("text", "Plain text", || Box::<TextHandler>::default());
    registry.register("shader", "WebGL shader (raw text)", || {
        Box::<ShaderHandler>::default()
    });
    registry.register("paml", "PAML HTML/XML markup", || {
        Box::<PamlHandler>::default()
    });
    registry
}
