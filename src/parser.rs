//! Line classifier and parser state machine.
//!
//! The parser consumes a document line by line. It is in one of two states:
//! `AwaitingHeader` (no open block) or `InBlock` (a pending block is
//! accumulating body lines); the pending block *is* the state. A header line
//! finalizes the open block and starts the next one; indented or blank
//! lines extend the open block; `#` comment lines are consumed in any
//! state.
//!
//! Finalizing a block consults the content cache before invoking the
//! handler, so identical (type, declaration, body) triples are computed
//! once. Unknown block types abort the document; everything else is
//! recovered and reported as warnings or block-scoped errors.

use std::fs;
use std::mem;
use std::path::Path;

use miette::NamedSource;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::{self, ContentCache};
use crate::errors::{ParseWarning, PolyblocksError, WarningKind};
use crate::handlers::BlockHandler;
use crate::model::{next_block_id, Block, BlockBuilder};
use crate::registry::{BlockRegistry, BlockType};
use crate::syntax::header::{parse_header_checked, Header};

/// A content line is tab-indented or blank.
static RE_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\t(.*)|\s*)$").unwrap());

/// The result of parsing one document.
#[derive(Debug)]
pub struct ParseOutcome {
    /// Blocks in first-header-occurrence order.
    pub blocks: Vec<Block>,
    /// Recovered issues, in encounter order.
    pub warnings: Vec<ParseWarning>,
}

struct Pending {
    builder: BlockBuilder,
    handler: Box<dyn BlockHandler>,
    /// The registry tag the header resolved through; part of the cache key.
    type_id: String,
}

/// Parses block documents against an explicit registry and optional cache.
pub struct Parser<'a> {
    registry: &'a BlockRegistry,
    cache: Option<&'a ContentCache>,
    path: Option<String>,
    source: String,
    line_no: usize,
    offset: usize,
    pending: Option<Pending>,
    blocks: Vec<Block>,
    warnings: Vec<ParseWarning>,
}

impl<'a> Parser<'a> {
    pub fn new(registry: &'a BlockRegistry) -> Self {
        Parser {
            registry,
            cache: None,
            path: None,
            source: String::new(),
            line_no: 0,
            offset: 0,
            pending: None,
            blocks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: &'a ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Parses a document given as one string.
    pub fn parse_text(
        &mut self,
        text: &str,
        path: Option<&str>,
    ) -> Result<ParseOutcome, PolyblocksError> {
        let lines: Vec<&str> = text.split('\n').collect();
        self.parse_borrowed(&lines, text, path)
    }

    /// Parses a document given as a line sequence (e.g. rewriter output).
    pub fn parse_lines(
        &mut self,
        lines: &[String],
        path: Option<&str>,
    ) -> Result<ParseOutcome, PolyblocksError> {
        let source = lines.join("\n");
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.parse_borrowed(&refs, &source, path)
    }

    /// Reads and parses the file at `path` as a native block document.
    pub fn parse_path(&mut self, path: &Path) -> Result<ParseOutcome, PolyblocksError> {
        let text = fs::read_to_string(path).map_err(|source| PolyblocksError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.parse_text(&text, Some(&path.display().to_string()))
    }

    fn parse_borrowed(
        &mut self,
        lines: &[&str],
        source: &str,
        path: Option<&str>,
    ) -> Result<ParseOutcome, PolyblocksError> {
        self.on_start(source, path);
        for line in lines {
            if let Err(e) = self.on_line(line) {
                // Fatal: discard the partial block list.
                self.pending = None;
                self.blocks.clear();
                return Err(e);
            }
        }
        self.finalize_pending();
        Ok(ParseOutcome {
            blocks: mem::take(&mut self.blocks),
            warnings: mem::take(&mut self.warnings),
        })
    }

    // =========================================================================
    // PARSING EVENTS
    // =========================================================================

    fn on_start(&mut self, source: &str, path: Option<&str>) {
        self.source = source.to_string();
        self.path = path.map(str::to_string);
        self.line_no = 0;
        self.offset = 0;
        self.pending = None;
        self.blocks.clear();
        self.warnings.clear();
    }

    fn on_line(&mut self, line: &str) -> Result<(), PolyblocksError> {
        self.line_no += 1;
        let line_start = self.offset;
        self.offset += line.len() + 1;

        if line.starts_with('@') {
            return match parse_header_checked(line) {
                Some((header, recovered)) => {
                    if let Some(err) = recovered {
                        self.warn(
                            WarningKind::MalformedDeclaration,
                            format!("declaration kept as plain data: {err}"),
                        );
                    }
                    self.on_header(header, line_start)
                }
                None => {
                    self.warn(
                        WarningKind::MalformedHeader,
                        "line starts with `@` but does not match the header grammar; kept as content",
                    );
                    if let Some(pending) = &mut self.pending {
                        pending.builder.push_body(line, line);
                    }
                    Ok(())
                }
            };
        }

        if let Some(captures) = RE_CONTENT.captures(line) {
            let dedented = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            match &mut self.pending {
                Some(pending) => pending.builder.push_body(dedented, line),
                None if line.trim().is_empty() => {}
                None => self.warn(
                    WarningKind::StrayContent,
                    "content line before any block header; discarded",
                ),
            }
            return Ok(());
        }

        if line.starts_with('#') {
            // Comment: consumed, no state change.
            return Ok(());
        }

        self.warn(
            WarningKind::UnclassifiedLine,
            format!("unclassifiable line ignored: {line:?}"),
        );
        Ok(())
    }

    fn on_header(&mut self, header: Header, line_start: usize) -> Result<(), PolyblocksError> {
        self.finalize_pending();
        let Some((type_id, block_type)) = self.resolve(&header) else {
            return Err(self.unknown_block_type(&header, line_start));
        };
        let id = next_block_id();
        let mut handler = block_type.instantiate();
        handler.start(&header, id);
        self.pending = Some(Pending {
            builder: BlockBuilder::new(id, header),
            handler,
            type_id,
        });
        Ok(())
    }

    /// Flushes the open block: consult the cache, otherwise run the handler.
    fn finalize_pending(&mut self) {
        let Some(mut pending) = self.pending.take() else {
            return;
        };
        pending.builder.trim_trailing_blanks();
        let body_text = pending.builder.body_text();
        let fp = cache::fingerprint(&pending.type_id, pending.builder.header(), &body_text);

        let mut content = None;
        let mut errors = Vec::new();
        let mut from_cache = false;
        if !body_text.is_empty() {
            if let Some(cached) = self.cache.and_then(|c| c.get(&fp)) {
                content = Some(cached);
                from_cache = true;
            }
        }
        if !from_cache {
            for line in pending.builder.body() {
                pending.handler.feed(line);
            }
            match pending.handler.end() {
                Ok(produced) => {
                    if !body_text.is_empty() {
                        if let Some(cache) = self.cache {
                            if let Err(e) = cache.set(&fp, &produced) {
                                self.warn(WarningKind::CacheWrite, e.to_string());
                            }
                        }
                    }
                    content = Some(produced);
                }
                Err(e) => errors.push(e.to_string()),
            }
        }
        self.blocks
            .push(pending.builder.finish(content, errors, from_cache));
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Resolves a header to its registry entry through its effective type.
    /// With a `:type` override the leading tag is only the block's *name*,
    /// so `@title:text` dispatches through the `text` entry even though
    /// `title` is registered.
    fn resolve(&self, header: &Header) -> Option<(String, &BlockType)> {
        let ty = header.effective_type();
        self.registry
            .lookup(ty)
            .map(|block_type| (ty.to_string(), block_type))
    }

    fn unknown_block_type(&self, header: &Header, line_start: usize) -> PolyblocksError {
        PolyblocksError::UnknownBlockType {
            name: header.name.clone(),
            line: self.line_no,
            path: self.path_name(),
            src: NamedSource::new(self.path_name(), self.source.clone()),
            span: (line_start, header.name.len() + 1).into(),
        }
    }

    fn path_name(&self) -> String {
        self.path.clone().unwrap_or_else(|| "<input>".to_string())
    }

    fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        self.warnings
            .push(ParseWarning::new(kind, self.line_no, message));
    }
}
