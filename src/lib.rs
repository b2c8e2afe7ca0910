//! Polyblocks parses documents that interleave multiple embedded
//! mini-languages, delimited by a line-oriented `@name ...` tag syntax.
//!
//! The pipeline: an optional embedded-source rewrite (host-language file to
//! block syntax), the line-classifying parser state machine, a
//! content-addressed cache around the block handlers, and a projection of
//! the resolved blocks into an XML-like or JSON tree.

pub mod cache;
pub mod cli;
pub mod errors;
pub mod handlers;
pub mod model;
pub mod parser;
pub mod registry;
pub mod rewriter;
pub mod syntax;
pub mod writer;

pub use cache::ContentCache;
pub use errors::{ParseWarning, PolyblocksError, WarningKind};
pub use handlers::{BlockHandler, HandlerError, HandlerFactory};
pub use model::{Block, Content};
pub use parser::{ParseOutcome, Parser};
pub use registry::{build_default_registry, BlockRegistry};
pub use syntax::{Binding, Direction, Header};
