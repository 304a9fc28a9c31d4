//! Markup stripping for free-text values found in workflow documents.
//!
//! Labels, help texts, and condition expressions frequently carry inline
//! HTML (`<b>`, `<br/>`, `&nbsp;`). Every emitted line is built from text
//! that has passed through [`strip_markup`], which guarantees a single
//! line with collapsed whitespace.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]{2,8});").expect("valid entity regex")
});

/// Unescape HTML entities, drop tags, collapse whitespace, and trim.
///
/// Entities are decoded before tags are removed, so escaped markup such as
/// `&lt;b&gt;` is stripped as well.
///
/// ```rust
/// use formtext_core::markup::strip_markup;
///
/// assert_eq!(strip_markup("<p>Full&nbsp;<b>Name</b></p>\n"), "Full Name");
/// ```
pub fn strip_markup(text: &str) -> String {
    let unescaped = unescape_entities(text);
    let untagged = TAG_RE.replace_all(&unescaped, " ");
    collapse_whitespace(&untagged)
}

/// Collapse whitespace runs to single spaces and trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Render a JSON value as stripped text.
///
/// Strings are stripped, numbers and booleans use their JSON spelling,
/// `null` is empty, and composite values fall back to compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => strip_markup(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => strip_markup(&other.to_string()),
    }
}

/// Like [`value_text`], but `None` for missing, `null`, or blank values.
pub fn opt_text(value: Option<&Value>) -> Option<String> {
    value.map(value_text).filter(|s| !s.is_empty())
}

fn unescape_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            decode_entity(body).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "rsquo" => '\u{2019}',
        "lsquo" => '\u{2018}',
        "rdquo" => '\u{201d}',
        "ldquo" => '\u{201c}',
        "bull" => '\u{2022}',
        _ => return None,
    };
    Some(ch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_tags_and_whitespace() {
        assert_eq!(
            strip_markup("  <div>Applicant\n\n<i>name</i></div>  "),
            "Applicant name"
        );
    }

    #[test]
    fn test_escaped_markup_is_removed() {
        assert_eq!(strip_markup("&lt;b&gt;Bold&lt;/b&gt; text"), "Bold text");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(strip_markup("A&#38;B &#x41;"), "A&B A");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(strip_markup("fish &chips; here"), "fish &chips; here");
    }

    #[test]
    fn test_value_text_scalars() {
        assert_eq!(value_text(&json!(null)), "");
        assert_eq!(value_text(&json!(3)), "3");
        assert_eq!(value_text(&json!(false)), "false");
        assert_eq!(value_text(&json!("<b>x</b>")), "x");
    }

    #[test]
    fn test_opt_text_blank_is_none() {
        assert_eq!(opt_text(Some(&json!("  <br/> "))), None);
        assert_eq!(opt_text(None), None);
        assert_eq!(opt_text(Some(&json!(0))), Some("0".to_string()));
    }
}
