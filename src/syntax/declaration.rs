//! Declaration grammar: the text that follows a tag name on a header line.
//!
//! A declaration is made of up to three constructs:
//!
//! ```text
//! DATA {KEY=VALUE,KEY="QUOTED"} INTERNAL -> EXTERNAL
//! ```
//!
//! [`parse_declaration`] resolves the ambiguity between the attribute block
//! and the binding arrow with a first-occurs-wins rule: whichever construct
//! starts earlier in the text claims its suffix. Sub-grammar failures
//! (unterminated quotes, conflicting arrow directions) are recovered by
//! demoting the whole declaration to plain data; the error is kept on the
//! result so the parser can report it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arrow tokens, ASCII and Unicode glyphs alike.
static RE_ARROW: Lazy<Regex> = Lazy::new(|| Regex::new("<-|->|←|→").unwrap());

/// Data-flow direction of a binding expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// A declared data-flow link between an internal and an external name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub direction: Direction,
    pub internal: String,
    pub external: String,
}

/// Recoverable failures of the attribute/binding sub-grammars.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("unterminated {quote} quote in attribute list `{text}`")]
    UnterminatedQuote { quote: char, text: String },
    #[error("conflicting binding directions in `{text}`")]
    MixedArrows { text: String },
}

/// The parsed form of a declaration: free data, attributes, binding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Declaration {
    pub data: String,
    pub attributes: Vec<(String, String)>,
    pub binding: Option<Binding>,
    /// Set when a sub-grammar failed and the declaration was demoted to
    /// plain data.
    pub recovered: Option<DeclarationError>,
}

/// Parses an attribute list such as `a=1,b="x,y",flag`.
///
/// Splits on top-level commas outside quotes. A key with no `=` (or an empty
/// value) defaults to the string `"true"`. Quoted values run to the matching
/// unescaped quote; `\"` and `\'` escapes are unescaped in the output.
pub fn parse_attributes(text: &str) -> Result<Vec<(String, String)>, DeclarationError> {
    let mut result = Vec::new();
    let mut offset = 0;
    while offset < text.len() {
        let equal = text[offset..].find('=').map(|i| offset + i);
        let comma = text[offset..].find(',').map(|i| offset + i);
        // A comma before any `=` ends a valueless entry.
        let sep = match (equal, comma) {
            (Some(e), Some(c)) if c < e => {
                push_entry(&mut result, &text[offset..c], String::new());
                offset = c + 1;
                continue;
            }
            (None, Some(c)) => {
                push_entry(&mut result, &text[offset..c], String::new());
                offset = c + 1;
                continue;
            }
            (None, None) => {
                push_entry(&mut result, &text[offset..], String::new());
                break;
            }
            (Some(e), _) => e,
        };
        let name = text[offset..sep].to_string();
        offset = sep + 1;
        let mut value = String::new();
        if offset < text.len() {
            let first = text[offset..].chars().next().unwrap();
            if first == '\'' || first == '"' {
                let end = find_closing_quote(text, offset + 1, first).ok_or(
                    DeclarationError::UnterminatedQuote {
                        quote: first,
                        text: text.to_string(),
                    },
                )?;
                value = text[offset + 1..end].replace(&format!("\\{first}"), &first.to_string());
                offset = end + 1;
                if text[offset..].starts_with(',') {
                    offset += 1;
                }
            } else {
                match text[offset..].find(',') {
                    Some(comma) => {
                        value = text[offset..offset + comma].to_string();
                        offset = offset + comma + 1;
                    }
                    None => {
                        value = text[offset..].to_string();
                        offset = text.len();
                    }
                }
            }
        }
        push_entry(&mut result, &name, value);
    }
    Ok(result)
}

fn push_entry(result: &mut Vec<(String, String)>, name: &str, value: String) {
    let name = name.trim();
    if name.is_empty() {
        return;
    }
    let value = if value.is_empty() { "true".to_string() } else { value };
    result.push((name.to_string(), value));
}

/// Finds the next occurrence of `quote` at or after `from` that is not
/// preceded by a backslash.
fn find_closing_quote(text: &str, from: usize, quote: char) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = text[search..].find(quote) {
        let abs = search + rel;
        if abs > 0 && text.as_bytes()[abs - 1] == b'\\' {
            search = abs + 1;
        } else {
            return Some(abs);
        }
    }
    None
}

/// Parses a binding expression such as `internal -> external`.
///
/// ASCII and Unicode arrows normalize to the same [`Direction`]. A single
/// segment binds a name to itself. Mixing `->` and `<-` in one expression is
/// an error.
pub fn parse_binding(text: &str) -> Result<Binding, DeclarationError> {
    let mut direction: Option<Direction> = None;
    let mut segments: Vec<String> = Vec::new();
    let mut offset = 0;
    for m in RE_ARROW.find_iter(text) {
        let d = match m.as_str() {
            "<-" | "←" => Direction::Input,
            _ => Direction::Output,
        };
        if let Some(prev) = direction {
            if prev != d {
                return Err(DeclarationError::MixedArrows {
                    text: text.to_string(),
                });
            }
        }
        direction = Some(d);
        if m.start() != offset {
            segments.push(text[offset..m.start()].trim().to_string());
        }
        offset = m.end();
    }
    if offset < text.len() {
        segments.push(text[offset..].trim().to_string());
    }
    let internal = segments.first().cloned().unwrap_or_default();
    let external = if segments.len() == 2 {
        segments[1].clone()
    } else {
        internal.clone()
    };
    Ok(Binding {
        direction: direction.unwrap_or(Direction::Output),
        internal,
        external,
    })
}

/// Parses a full declaration into `(data, attributes, binding)`.
///
/// The attribute block and the binding arrow are located independently;
/// whichever starts first in the text wins the overlap. The remaining prefix
/// is the data, trimmed, with one matching pair of surrounding quotes
/// stripped. A braceless declaration that is itself a well-formed attribute
/// list (identifier keys, at least one `=`) is parsed as attributes.
pub fn parse_declaration(text: &str) -> Declaration {
    if text.trim().is_empty() {
        return Declaration::default();
    }
    let mut data: Option<&str> = None;
    let mut attributes = Vec::new();
    let mut binding = None;
    let mut arrow = RE_ARROW.find(text).map(|m| m.start());
    // Start of the region the binding expression may occupy; moves past the
    // attribute block once one is parsed.
    let mut region = 0;

    if let Some(open) = text.find('{') {
        let arrow_first = matches!(arrow, Some(a) if a < open);
        if !arrow_first {
            if let Some(rel) = text[open..].find('}') {
                let close = open + rel;
                data = Some(&text[..open]);
                match parse_attributes(&text[open + 1..close]) {
                    Ok(attrs) => attributes = attrs,
                    Err(e) => return Declaration::demoted(text, e),
                }
                region = close + 1;
                arrow = RE_ARROW.find(&text[region..]).map(|m| region + m.start());
            }
        }
    }
    if let Some(at) = arrow {
        // The binding expression starts at its left operand, the last
        // whitespace-separated token before the arrow.
        let start = region + binding_expr_start(&text[region..], at - region);
        match parse_binding(&text[start..]) {
            Ok(b) => binding = Some(b),
            Err(e) => return Declaration::demoted(text, e),
        }
        data = data.or(Some(&text[..start]));
    }
    let raw_data = data.unwrap_or(text).trim();

    // Edge case: `@paml a=1,b="x,y"` carries attributes without braces.
    // Only claim the data as attributes when every key is identifier-like
    // and an `=` is present.
    if attributes.is_empty() && binding.is_none() && raw_data.contains('=') {
        if let Ok(attrs) = parse_attributes(raw_data) {
            let keyish =
                |k: &str| !k.is_empty() && k.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');
            if !attrs.is_empty() && attrs.iter().all(|(k, _)| keyish(k)) {
                return Declaration {
                    data: String::new(),
                    attributes: attrs,
                    binding: None,
                    recovered: None,
                };
            }
        }
    }

    Declaration {
        data: strip_quotes(raw_data).to_string(),
        attributes,
        binding,
        recovered: None,
    }
}

impl Declaration {
    /// Fallback for sub-grammar failures: the whole text becomes data.
    fn demoted(text: &str, error: DeclarationError) -> Self {
        Declaration {
            data: text.trim().to_string(),
            attributes: Vec::new(),
            binding: None,
            recovered: Some(error),
        }
    }
}

/// Returns the offset, within `region`, of the last whitespace-separated
/// token before the arrow at `arrow_rel`.
fn binding_expr_start(region: &str, arrow_rel: usize) -> usize {
    let left = region[..arrow_rel].trim_end();
    match left.rfind(char::is_whitespace) {
        Some(p) => {
            let ws = left[p..].chars().next().unwrap();
            p + ws.len_utf8()
        }
        None => 0,
    }
}

/// Strips one matching pair of surrounding quotes, if present.
fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if text.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[text.len() - 1] == bytes[0]
    {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_with_quotes_and_defaults() {
        let attrs = parse_attributes(r#"a=1,b="x,y",flag"#).unwrap();
        assert_eq!(
            attrs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x,y".to_string()),
                ("flag".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn attributes_unescape_quotes() {
        let attrs = parse_attributes(r#"msg="say \"hi\"""#).unwrap();
        assert_eq!(attrs, vec![("msg".to_string(), r#"say "hi""#.to_string())]);
    }

    #[test]
    fn attributes_empty_value_defaults_to_true() {
        let attrs = parse_attributes("a=,b=2").unwrap();
        assert_eq!(
            attrs,
            vec![
                ("a".to_string(), "true".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn attributes_valueless_key_before_comma() {
        let attrs = parse_attributes("flag,b=2").unwrap();
        assert_eq!(
            attrs,
            vec![
                ("flag".to_string(), "true".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn declaration_quoted_data_is_not_attributes() {
        let d = parse_declaration("\"a=b\"");
        assert_eq!(d.data, "a=b");
        assert!(d.attributes.is_empty());
    }

    #[test]
    fn attributes_unterminated_quote_fails() {
        let err = parse_attributes(r#"a="oops"#).unwrap_err();
        assert!(matches!(err, DeclarationError::UnterminatedQuote { quote: '"', .. }));
    }

    #[test]
    fn binding_ascii_and_unicode_are_equivalent() {
        assert_eq!(parse_binding("a -> b").unwrap(), parse_binding("a → b").unwrap());
        assert_eq!(parse_binding("a <- b").unwrap(), parse_binding("a ← b").unwrap());
    }

    #[test]
    fn binding_single_segment_is_self_binding() {
        let b = parse_binding("-> events").unwrap();
        assert_eq!(b.direction, Direction::Output);
        assert_eq!(b.internal, "events");
        assert_eq!(b.external, "events");
    }

    #[test]
    fn binding_mixed_directions_fail() {
        let err = parse_binding("a -> b <- c").unwrap_err();
        assert!(matches!(err, DeclarationError::MixedArrows { .. }));
    }

    #[test]
    fn declaration_with_attributes_and_binding() {
        let d = parse_declaration("paml-block {a=1,b=2} x -> y");
        assert_eq!(d.data, "paml-block");
        assert_eq!(
            d.attributes,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
        let b = d.binding.unwrap();
        assert_eq!(b.direction, Direction::Output);
        assert_eq!(b.internal, "x");
        assert_eq!(b.external, "y");
    }

    #[test]
    fn declaration_arrow_before_brace_skips_attributes() {
        let d = parse_declaration("x -> handler {not=attrs}");
        assert!(d.attributes.is_empty());
        let b = d.binding.unwrap();
        assert_eq!(b.internal, "x");
        // Everything after the arrow belongs to the binding expression.
        assert_eq!(b.external, "handler {not=attrs}");
    }

    #[test]
    fn declaration_data_precedes_binding_operand() {
        let d = parse_declaration("component slot -> target");
        assert_eq!(d.data, "component");
        let b = d.binding.unwrap();
        assert_eq!(b.internal, "slot");
        assert_eq!(b.external, "target");
    }

    #[test]
    fn declaration_strips_surrounding_quotes() {
        assert_eq!(parse_declaration("\"Hello World\"").data, "Hello World");
        assert_eq!(parse_declaration("'a'").data, "a");
        assert_eq!(parse_declaration("\"unmatched").data, "\"unmatched");
    }

    #[test]
    fn declaration_braceless_attribute_list() {
        let d = parse_declaration(r#"a=1,b="x,y""#);
        assert_eq!(d.data, "");
        assert_eq!(
            d.attributes,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x,y".to_string()),
            ]
        );
    }

    #[test]
    fn declaration_plain_data_is_not_attributes() {
        let d = parse_declaration("foo bar");
        assert_eq!(d.data, "foo bar");
        assert!(d.attributes.is_empty());
        assert!(d.binding.is_none());
    }

    #[test]
    fn declaration_recovers_from_mixed_arrows() {
        let d = parse_declaration("a -> b <- c");
        assert_eq!(d.data, "a -> b <- c");
        assert!(d.binding.is_none());
        assert!(matches!(d.recovered, Some(DeclarationError::MixedArrows { .. })));
    }

    #[test]
    fn attributes_roundtrip_through_serialization() {
        let attrs = parse_attributes(r#"a=1,b="x,y",msg="say \"hi\"""#).unwrap();
        let rendered = attrs
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(parse_attributes(&rendered).unwrap(), attrs);
    }
}
