//! Array text literals (`{a,"b c",NULL,{1,2}}`)

use sqlcoerce_diagnostics::{CastError, CastResult};
use std::iter::Peekable;
use std::str::Chars;

/// One element of a parsed array literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayItem {
    Null,
    Text(String),
    Nested(Vec<ArrayItem>),
}

fn malformed(raw: &str) -> CastError {
    CastError::incompatible(format!("malformed array literal: \"{raw}\""))
}

/// Split an array literal into its elements
///
/// Unquoted elements are trimmed and an unquoted `NULL` (any case) is the
/// SQL NULL. Quoted elements keep their content verbatim, with `\` escaping
/// the next character.
pub fn parse_array(raw: &str) -> CastResult<Vec<ArrayItem>> {
    let mut chars = raw.trim().chars().peekable();
    let items = parse_braces(&mut chars).ok_or_else(|| malformed(raw))?;
    if chars.next().is_some() {
        return Err(malformed(raw));
    }
    Ok(items)
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn parse_braces(chars: &mut Peekable<Chars<'_>>) -> Option<Vec<ArrayItem>> {
    if chars.next()? != '{' {
        return None;
    }
    let mut items = Vec::new();
    skip_whitespace(chars);
    if chars.next_if_eq(&'}').is_some() {
        return Some(items);
    }
    loop {
        skip_whitespace(chars);
        let item = match chars.peek()? {
            '{' => ArrayItem::Nested(parse_braces(chars)?),
            '"' => ArrayItem::Text(parse_quoted(chars)?),
            _ => parse_bare(chars)?,
        };
        items.push(item);
        skip_whitespace(chars);
        match chars.next()? {
            ',' => continue,
            '}' => return Some(items),
            _ => return None,
        }
    }
}

fn parse_quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    chars.next();
    let mut out = String::new();
    loop {
        match chars.next()? {
            '"' => return Some(out),
            '\\' => out.push(chars.next()?),
            c => out.push(c),
        }
    }
}

fn parse_bare(chars: &mut Peekable<Chars<'_>>) -> Option<ArrayItem> {
    let mut out = String::new();
    while let Some(c) = chars.next_if(|c| !matches!(c, ',' | '}' | '{' | '"')) {
        out.push(c);
    }
    let text = out.trim();
    if text.is_empty() {
        None
    } else if text.eq_ignore_ascii_case("null") {
        Some(ArrayItem::Null)
    } else {
        Some(ArrayItem::Text(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(s: &str) -> ArrayItem {
        ArrayItem::Text(s.to_string())
    }

    #[test]
    fn test_flat() {
        assert_eq!(
            parse_array(r#"{a, "b c",NULL,"NULL"}"#).unwrap(),
            vec![text("a"), text("b c"), ArrayItem::Null, text("NULL")]
        );
    }

    #[test]
    fn test_nested_and_empty() {
        assert_eq!(parse_array("{}").unwrap(), vec![]);
        assert_eq!(
            parse_array("{{1,2},{3}}").unwrap(),
            vec![
                ArrayItem::Nested(vec![text("1"), text("2")]),
                ArrayItem::Nested(vec![text("3")]),
            ]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(parse_array(r#"{"a\"b"}"#).unwrap(), vec![text("a\"b")]);
    }

    #[rstest]
    #[case("")]
    #[case("a,b")]
    #[case("{a,b")]
    #[case("{a,,b}")]
    #[case("{a} x")]
    #[case(r#"{"open}"#)]
    fn test_malformed(#[case] raw: &str) {
        assert_eq!(parse_array(raw).unwrap_err().tag(), "IncompatibleTypesError");
    }
}
