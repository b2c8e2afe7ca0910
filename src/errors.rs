//! Unified diagnostics for the polyblocks pipeline.
//!
//! Fatal failures are represented by [`PolyblocksError`], a single
//! `miette`-based diagnostic enum covering every stage (parsing, caching,
//! output projection, I/O). Recovered issues never abort a parse; they are
//! collected as [`ParseWarning`] values on the parse outcome and surfaced to
//! the user alongside the output tree.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Fatal error type for all polyblocks failure modes.
#[derive(Debug, Error, Diagnostic)]
pub enum PolyblocksError {
    /// A header names a tag that is absent from the registry. Fatal for the
    /// whole document: the partial block list is discarded.
    #[error("unknown block type `@{name}` at line {line} in {path}")]
    #[diagnostic(
        code(polyblocks::parser::unknown_block_type),
        help("run with --list to see the registered block types")
    )]
    UnknownBlockType {
        name: String,
        line: usize,
        path: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("this tag is not registered")]
        span: SourceSpan,
    },

    #[error("I/O error on {path}")]
    #[diagnostic(code(polyblocks::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Cache storage failure. Reads are silently treated as misses; writes
    /// surface this error, which the parser downgrades to a warning.
    #[error("cache I/O error on {path}")]
    #[diagnostic(code(polyblocks::cache::io))]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode output")]
    #[diagnostic(code(polyblocks::output::encoding))]
    OutputEncoding {
        #[source]
        source: serde_json::Error,
    },
}

/// Classification of recovered (non-fatal) parse issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A line starts with `@` but does not match the header grammar; it was
    /// demoted to content of the open block.
    MalformedHeader,
    /// An attribute or binding sub-grammar failed; the declaration remainder
    /// was kept as plain data.
    MalformedDeclaration,
    /// Content appeared before any header line and was discarded.
    StrayContent,
    /// A line matched none of the header/content/comment patterns.
    UnclassifiedLine,
    /// A cache entry could not be written; the parse result is unaffected.
    CacheWrite,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MalformedHeader => "malformed-header",
            WarningKind::MalformedDeclaration => "malformed-declaration",
            WarningKind::StrayContent => "stray-content",
            WarningKind::UnclassifiedLine => "unclassified-line",
            WarningKind::CacheWrite => "cache-write",
        }
    }
}

/// A recovered parse issue, attached to the parse outcome rather than
/// aborting it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub kind: WarningKind,
    /// 1-based line number in the (possibly rewritten) document.
    pub line: usize,
    pub message: String,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] line {}: {}",
            self.kind.as_str(),
            self.line,
            self.message
        )
    }
}
