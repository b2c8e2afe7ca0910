//! Embedded-source rewriter.
//!
//! Inverts a host-language source file into the native block syntax: lines
//! that start with one of the extension's comment delimiters are candidate
//! block syntax, everything else is wrapped into a synthesized
//! `@embed <ext>` block. A `@hidden` (or `@hide`) directive suppresses all
//! lines, directive lines included, until `@show`.
//!
//! Files whose extension already is the native document format pass through
//! unchanged.

use crate::syntax::header::is_header_line;

/// Extensions of native block documents (identity rewrite).
pub const NATIVE_EXTENSIONS: &[&str] = &["block", "polyblock"];

/// Delimiters tried for extensions missing from [`DELIMITERS`].
pub const DEFAULT_DELIMITERS: &[&str] = &["#", "//", ";;"];

/// Extension families and their comment delimiters.
const DELIMITERS: &[(&[&str], &[&str])] = &[
    (&["c", "cpp", "h", "js", "java"], &["//", "*"]),
    (&["scheme", "scm", "lisp", "tlang"], &[";;"]),
    (&["sh", "py", "ruby", "sjs", "sg"], &["#"]),
];

/// Transient automaton state, one value per processed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewriteState {
    /// Nothing seen yet.
    Idle,
    /// Between `@hidden` and `@show`: every line is suppressed.
    Hidden,
    /// Inside visible block syntax (headers, directives, indented content).
    Shown,
    /// The previous line was a passed-through block comment.
    InBlockComment,
    /// Inside a run of host-language lines wrapped in an `@embed` block.
    InRawContent,
}

pub fn is_native_extension(ext: &str) -> bool {
    NATIVE_EXTENSIONS.contains(&ext)
}

/// Returns the comment delimiters registered for a file extension.
pub fn delimiters_for_extension(ext: &str) -> &'static [&'static str] {
    for (exts, delims) in DELIMITERS {
        if exts.contains(&ext) {
            return delims;
        }
    }
    DEFAULT_DELIMITERS
}

/// Rewrites host-language source into native block-syntax lines.
pub fn rewrite_source(text: &str, ext: &str) -> Vec<String> {
    rewrite_lines(text.split('\n'), ext)
}

/// Rewrites a host-language line sequence into native block-syntax lines.
pub fn rewrite_lines<'t>(lines: impl IntoIterator<Item = &'t str>, ext: &str) -> Vec<String> {
    if is_native_extension(ext) {
        return lines.into_iter().map(str::to_string).collect();
    }
    let delimiters = delimiters_for_extension(ext);
    let mut state = RewriteState::Idle;
    let mut out = Vec::new();
    for line in lines {
        let delimited = delimiters
            .iter()
            .find(|d| line.starts_with(**d))
            .map(|d| line[d.len()..].trim());
        match delimited {
            Some(content) => {
                if content.starts_with("@hidden") || content.starts_with("@hide") {
                    state = RewriteState::Hidden;
                } else if content.starts_with("@show") {
                    state = RewriteState::Shown;
                } else if state == RewriteState::Hidden {
                    // Suppressed entirely, not even wrapped.
                } else if is_header_line(content) {
                    state = RewriteState::Shown;
                    out.push(content.to_string());
                } else if content.starts_with('#') {
                    state = RewriteState::InBlockComment;
                    out.push(content.to_string());
                } else {
                    state = RewriteState::Shown;
                    out.push(format!("\t{content}"));
                }
            }
            None => {
                if state == RewriteState::Hidden {
                    continue;
                }
                // A blank host line outside a raw run is a block separator,
                // not the start of an embedded run.
                if line.trim().is_empty() && state != RewriteState::InRawContent {
                    out.push(String::new());
                    continue;
                }
                if state != RewriteState::InRawContent {
                    out.push(format!("@embed {ext}"));
                }
                state = RewriteState::InRawContent;
                out.push(format!("\t{line}"));
            }
        }
    }
    out
}
