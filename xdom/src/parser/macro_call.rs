//! Reader for macro calls: `{{id k="v" flag=on}}content{{/id}}` or `{{id/}}`.
//!
//! All spans produced here are relative to the start of the text handed in;
//! callers shift them to absolute source offsets.

use crate::block::{MacroCall, Parameters};
use crate::parser::error::ParseError;

/// A macro call read from the start of a text slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMacro {
    pub call: MacroCall,
    /// Bytes consumed, from `{{` through the closing `}}`.
    pub len: usize,
}

struct OpenTag {
    identifier: String,
    parameters: Parameters,
    len: usize,
    self_closing: bool,
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// Read a macro call at the start of `text`.
///
/// Returns `Ok(None)` when `text` does not start a macro call at all (a
/// literal `{{`, a stray closing tag), and an error when it clearly starts
/// one but is malformed.
pub fn read_macro(text: &str, file_id: usize) -> Result<Option<ParsedMacro>, ParseError> {
    let Some(open) = read_open_tag(text, file_id)? else {
        return Ok(None);
    };

    let mut call = MacroCall::new(open.identifier.clone());
    call.parameters = open.parameters;

    if open.self_closing {
        return Ok(Some(ParsedMacro {
            call,
            len: open.len,
        }));
    }

    let (content_end, len) = find_close(text, &open.identifier, open.len, file_id)?;
    call.raw_content = Some(trim_content(&text[open.len..content_end]).to_string());
    Ok(Some(ParsedMacro { call, len }))
}

fn read_open_tag(text: &str, file_id: usize) -> Result<Option<OpenTag>, ParseError> {
    let Some(rest) = text.strip_prefix("{{") else {
        return Ok(None);
    };
    let ident_len = rest
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(rest.len());
    if ident_len == 0 {
        return Ok(None);
    }
    let identifier = rest[..ident_len].to_string();
    let mut pos = 2 + ident_len;
    let mut parameters = Parameters::new();

    loop {
        pos += leading_whitespace(&text[pos..]);
        let rest = &text[pos..];

        if rest.starts_with("/}}") {
            return Ok(Some(OpenTag {
                identifier,
                parameters,
                len: pos + 3,
                self_closing: true,
            }));
        }
        if rest.starts_with("}}") {
            return Ok(Some(OpenTag {
                identifier,
                parameters,
                len: pos + 2,
                self_closing: false,
            }));
        }
        let Some(c) = rest.chars().next() else {
            return Err(ParseError::error(
                format!("unterminated macro call '{}'", identifier),
                0..text.len(),
                file_id,
            )
            .with_note("macro calls end with '}}' or '/}}'"));
        };

        let key_len = rest
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(rest.len());
        if key_len == 0 {
            return Err(ParseError::error(
                format!("unexpected character '{}' in macro parameters", c),
                pos..pos + c.len_utf8(),
                file_id,
            ));
        }
        let key = rest[..key_len].to_string();
        pos += key_len;

        if !text[pos..].starts_with('=') {
            return Err(ParseError::error(
                format!("expected '=' after parameter '{}'", key),
                pos - key_len..pos,
                file_id,
            ));
        }
        pos += 1;

        let (value, consumed) = read_value(&text[pos..])
            .ok_or_else(|| {
                ParseError::error(
                    format!("unterminated value for parameter '{}'", key),
                    pos..text.len(),
                    file_id,
                )
            })?;
        pos += consumed;
        parameters.insert(key, value);
    }
}

/// Read a quoted (`"a \" b"`) or bare (`abc`) parameter value.
/// Returns the unescaped value and the bytes consumed.
fn read_value(text: &str) -> Option<(String, usize)> {
    if let Some(quoted) = text.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    let (_, escaped) = chars.next()?;
                    value.push(escaped);
                }
                '"' => return Some((value, i + 2)),
                other => value.push(other),
            }
        }
        return None;
    }

    let end = text
        .char_indices()
        .find(|(i, c)| c.is_whitespace() || *c == '}' || text[*i..].starts_with("/}}"))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    Some((text[..end].to_string(), end))
}

/// Find the `{{/identifier}}` matching an open tag ending at `from`,
/// skipping nested calls of the same macro. Returns (content end, total length).
fn find_close(
    text: &str,
    identifier: &str,
    from: usize,
    file_id: usize,
) -> Result<(usize, usize), ParseError> {
    let open_pattern = format!("{{{{{}", identifier);
    let close_pattern = format!("{{{{/{}}}}}", identifier);
    let mut depth = 1usize;
    let mut search = from;

    loop {
        let next_close = text[search..].find(&close_pattern).map(|i| i + search);
        let next_open = find_nested_open(text, search, &open_pattern, file_id);

        match (next_open, next_close) {
            (_, None) => {
                return Err(ParseError::error(
                    format!("macro '{}' is never closed", identifier),
                    0..from,
                    file_id,
                )
                .with_note(format!(
                    "close it with {{{{/{}}}}} or write {{{{{}/}}}}",
                    identifier, identifier
                )));
            }
            (Some((open_at, open_len)), Some(close_at)) if open_at < close_at => {
                depth += 1;
                search = open_at + open_len;
            }
            (_, Some(close_at)) => {
                depth -= 1;
                if depth == 0 {
                    return Ok((close_at, close_at + close_pattern.len()));
                }
                search = close_at + close_pattern.len();
            }
        }
    }
}

/// Next non-self-closing open tag of the same macro at or after `from`.
fn find_nested_open(
    text: &str,
    from: usize,
    open_pattern: &str,
    file_id: usize,
) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(i) = text[search..].find(open_pattern) {
        let at = search + i;
        let after = &text[at + open_pattern.len()..];
        let boundary = after.chars().next().is_none_or(|c| !is_identifier_char(c));
        if boundary {
            if let Ok(Some(open)) = read_open_tag(&text[at..], file_id) {
                if !open.self_closing {
                    return Some((at, open.len));
                }
                search = at + open.len;
                continue;
            }
        }
        search = at + open_pattern.len();
    }
    None
}

fn leading_whitespace(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Drop one leading and one trailing newline, so block macros may put their
/// content on separate lines.
fn trim_content(content: &str) -> &str {
    let content = content
        .strip_prefix("\r\n")
        .or_else(|| content.strip_prefix('\n'))
        .unwrap_or(content);
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn read(text: &str) -> ParsedMacro {
        read_macro(text, 0)
            .expect("macro call should parse")
            .expect("text should start a macro call")
    }

    #[test]
    fn self_closing_without_parameters() {
        let parsed = read("{{toc/}} trailing");
        assert_eq!(parsed.call, MacroCall::new("toc"));
        assert_eq!(parsed.len, 8);
    }

    #[test]
    fn quoted_and_bare_parameters() {
        let parsed = read(r#"{{box title="Hello \"you\"" width=50}}body{{/box}}"#);
        assert_eq!(
            parsed.call,
            MacroCall::new("box")
                .with_parameter("title", "Hello \"you\"")
                .with_parameter("width", "50")
                .with_content("body")
        );
    }

    #[test]
    fn bare_value_before_self_close() {
        let parsed = read("{{id name=x/}}");
        assert_eq!(parsed.call, MacroCall::new("id").with_parameter("name", "x"));
    }

    #[test]
    fn content_on_separate_lines() {
        let parsed = read("{{code}}\nline 1\nline 2\n{{/code}}");
        assert_eq!(parsed.call.raw_content.as_deref(), Some("line 1\nline 2"));
    }

    #[test]
    fn nested_calls_of_the_same_macro() {
        let text = "{{box}}a {{box}}b{{/box}} {{box/}} c{{/box}}";
        let parsed = read(text);
        assert_eq!(parsed.len, text.len());
        assert_eq!(
            parsed.call.raw_content.as_deref(),
            Some("a {{box}}b{{/box}} {{box/}} c")
        );
    }

    #[rstest]
    #[case("{{ toc/}}")]
    #[case("{{/box}}")]
    #[case("{not a macro}")]
    fn not_a_macro(#[case] text: &str) {
        assert_eq!(read_macro(text, 0).unwrap(), None);
    }

    #[rstest]
    #[case("{{toc", "unterminated macro call")]
    #[case("{{box}}never closed", "never closed")]
    #[case("{{box title}}x{{/box}}", "expected '='")]
    #[case("{{box title=\"open}}", "unterminated value")]
    #[case("{{box @}}", "unexpected character")]
    fn malformed(#[case] text: &str, #[case] message: &str) {
        let err = read_macro(text, 0).unwrap_err();
        assert!(
            err.message.contains(message),
            "expected '{}' in '{}'",
            message,
            err.message
        );
    }
}
