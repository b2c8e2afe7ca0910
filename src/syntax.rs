//! The block-document grammars: header lines and their declarations.

pub mod declaration;
pub mod header;

pub use declaration::{parse_attributes, parse_binding, parse_declaration};
pub use declaration::{Binding, Declaration, DeclarationError, Direction};
pub use header::{is_header_line, parse_header, parse_header_checked, Header};
