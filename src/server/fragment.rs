//! Reading server-rendered HTML fragments.
//!
//! Fragments are opaque to the dashboard apart from a few class-tagged elements:
//! `experiment-id` carries the identifier, and the `experiment-detail`,
//! `experiment-loaded` and `experiment-toggle*` elements are placeholders owned by
//! the item record rather than the markup. Everything else is flattened to text
//! for the terminal.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ID_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<([a-z][a-z0-9]*)\b[^>]*\bclass\s*=\s*["'](?:[^"']*\s)?experiment-id(?:\s[^"']*)?["'][^>]*>"#,
    )
    .expect("valid id pattern")
});

static TAG_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(/?)([a-z][a-z0-9]*)\b[^>]*?(/?)>").expect("valid tag token pattern")
});

static PLACEHOLDER_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<(?:div|span|p)\b[^>]*\bclass\s*=\s*["'](?:[^"']*\s)?experiment-(?:id|detail|loaded|toggle(?:-open|-closed)?)(?:\s[^"']*)?["'][^>]*>.*?</(?:div|span|p)\s*>"#,
    )
    .expect("valid placeholder pattern")
});

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").expect("valid paragraph pattern"));

static INVISIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|title|head)\b[^>]*>.*?</(?:script|style|title|head)\s*>")
        .expect("valid invisible pattern")
});

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|tr|h[1-6]|table|ul|ol|pre|section|li)\s*>")
        .expect("valid line break pattern")
});

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").expect("valid list item pattern"));

static CELL_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</t[dh]\s*>").expect("valid cell pattern"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity pattern")
});

static SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x{a0}]+").expect("valid whitespace pattern"));

/// Longest body shown verbatim when an error page has no paragraph text.
const BARE_ERROR_BODY_MAX: usize = 200;

/// Identifier and display text of one experiment summary fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub id: String,
    pub text: String,
}

/// Extracts the experiment identifier, or `None` if the fragment has no
/// non-empty `experiment-id` element.
pub fn experiment_id(html: &str) -> Option<String> {
    let caps = ID_OPEN_TAG.captures(html)?;
    let open = caps.get(0)?;
    if open.as_str().ends_with("/>") {
        return None;
    }
    let inner = element_content(&html[open.end()..], &caps[1]);
    let id = to_lines(inner).join("");
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Markup between an opening tag named `name` (ending just before `rest`) and
/// its matching close tag. An unclosed element runs to the end of `rest`.
fn element_content<'a>(rest: &'a str, name: &str) -> &'a str {
    let mut depth = 0usize;
    for caps in TAG_TOKEN.captures_iter(rest) {
        if !caps[2].eq_ignore_ascii_case(name) || !caps[3].is_empty() {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
        } else if depth == 0 {
            let end = caps.get(0).map_or(rest.len(), |m| m.start());
            return &rest[..end];
        } else {
            depth -= 1;
        }
    }
    rest
}

pub fn parse_summary(html: &str) -> Option<Summary> {
    let id = experiment_id(html)?;
    let visible = PLACEHOLDER_ELEMENT.replace_all(html, "");
    let text = to_lines(&visible).join("  ");
    Some(Summary { id, text })
}

/// Flattens markup into trimmed, non-empty display lines.
pub fn to_lines(html: &str) -> Vec<String> {
    let text = INVISIBLE.replace_all(html, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = CELL_END.replace_all(&text, "  ");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| SPACES.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

/// The human-readable explanation inside an error page: the text of its
/// paragraphs, or the whole body when it is short and has none.
pub fn error_detail(body: &str) -> String {
    let paragraphs: Vec<String> = PARAGRAPH
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| to_lines(m.as_str()).join(" "))
        .filter(|text| !text.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        return paragraphs.join(" ");
    }

    let bare = to_lines(body).join(" ");
    if bare.chars().count() <= BARE_ERROR_BODY_MAX {
        bare
    } else {
        String::new()
    }
}

pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
