#![forbid(unsafe_code)]

//! URL detection and HTML linkification.
//!
//! Recognised links start with `http://`, `https://` (any case) or `www.`
//! and run until whitespace or one of `<>"{}|\^`[]`. A link must not start
//! in the middle of a word. Trailing sentence punctuation is left outside
//! the link, and a trailing `)` only belongs to the link when it closes a
//! `(` inside it (`https://en.wikipedia.org/wiki/Rust_(language)`).

use core::ops::Range;

const SCHEME_PREFIXES: [&str; 2] = ["https://", "http://"];
const WWW_PREFIX: &str = "www.";

/// One detected link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    /// Byte range of the link text in the source.
    pub range: Range<usize>,
    /// Target URL; `www.` links get an `https://` scheme.
    pub href: String,
}

impl LinkSpan {
    /// The link as written in `source`.
    #[must_use]
    pub fn label<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }
}

/// Anchor rendering options for [`linked_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkifyOptions {
    /// Open links in a new browsing context (`target="_blank"` with
    /// `rel="noopener noreferrer"`).
    pub new_tab: bool,
    /// CSS class attribute for anchors.
    pub class: Option<String>,
}

impl Default for LinkifyOptions {
    fn default() -> Self {
        Self {
            new_tab: true,
            class: None,
        }
    }
}

/// Find every link in `text`, in order, without overlap.
#[must_use]
pub fn find_links(text: &str) -> Vec<LinkSpan> {
    let mut spans = Vec::new();
    let mut idx = 0usize;
    while idx < text.len() {
        if let Some(span) = link_at(text, idx) {
            idx = span.range.end;
            spans.push(span);
        } else {
            idx += text[idx..].chars().next().map_or(1, char::len_utf8);
        }
    }
    spans
}

/// Escape `text` and wrap every detected link in an anchor.
///
/// ```
/// use labframe_text::{LinkifyOptions, linked_html};
///
/// let html = linked_html("See www.icmpp.ro & <b>", &LinkifyOptions::default());
/// assert_eq!(
///     html,
///     "See <a href=\"https://www.icmpp.ro\" target=\"_blank\" rel=\"noopener noreferrer\">www.icmpp.ro</a> &amp; &lt;b&gt;"
/// );
/// ```
#[must_use]
pub fn linked_html(text: &str, options: &LinkifyOptions) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut cursor = 0usize;
    for span in find_links(text) {
        push_escaped(&mut out, &text[cursor..span.range.start]);
        push_anchor(&mut out, &span.href, span.label(text), options);
        cursor = span.range.end;
    }
    push_escaped(&mut out, &text[cursor..]);
    out
}

/// Escape the five HTML-significant characters.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
}

fn push_anchor(out: &mut String, href: &str, label: &str, options: &LinkifyOptions) {
    out.push_str("<a href=\"");
    push_escaped(out, href);
    out.push('"');
    if options.new_tab {
        out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
    }
    if let Some(class) = options.class.as_deref().filter(|class| !class.is_empty()) {
        out.push_str(" class=\"");
        push_escaped(out, class);
        out.push('"');
    }
    out.push('>');
    push_escaped(out, label);
    out.push_str("</a>");
}

fn link_at(text: &str, start: usize) -> Option<LinkSpan> {
    let rest = &text[start..];
    let (prefix_len, needs_scheme) = prefix_at(rest)?;

    if let Some(prev) = text[..start].chars().next_back() {
        if prev.is_alphanumeric() || prev == '_' {
            return None;
        }
    }

    let run = rest
        .char_indices()
        .find(|&(_, ch)| !is_url_char(ch))
        .map_or(rest.len(), |(idx, _)| idx);
    let end = start + trim_trailing(&rest[..run]);
    if end <= start + prefix_len {
        return None;
    }

    let label = &text[start..end];
    let href = if needs_scheme {
        format!("https://{label}")
    } else {
        label.to_owned()
    };
    Some(LinkSpan {
        range: start..end,
        href,
    })
}

/// Length of a link prefix at the start of `rest`, and whether the link
/// lacks a scheme.
fn prefix_at(rest: &str) -> Option<(usize, bool)> {
    let head = rest.as_bytes();
    for prefix in SCHEME_PREFIXES {
        if starts_with_ignore_case(head, prefix) {
            return Some((prefix.len(), false));
        }
    }
    starts_with_ignore_case(head, WWW_PREFIX).then_some((WWW_PREFIX.len(), true))
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn is_url_char(ch: char) -> bool {
    !ch.is_whitespace()
        && !matches!(
            ch,
            '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`' | '[' | ']'
        )
}

/// Byte length of `candidate` once trailing punctuation is dropped.
///
/// Parentheses are counted once; each stripped `)` updates the tally, so a
/// long run of them stays linear.
fn trim_trailing(candidate: &str) -> usize {
    let mut opens = 0usize;
    let mut closes = 0usize;
    for ch in candidate.chars() {
        match ch {
            '(' => opens += 1,
            ')' => closes += 1,
            _ => {}
        }
    }

    let mut end = candidate.len();
    while let Some(last) = candidate[..end].chars().next_back() {
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' => true,
            ')' if opens < closes => {
                closes -= 1;
                true
            }
            _ => false,
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    end
}
