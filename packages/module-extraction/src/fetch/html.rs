//! HTML → markdown-flavoured text.
//!
//! Shared by every strategy that receives HTML. Headings become `#` lines
//! and list items become `- ` lines so the synthesizer can still see the
//! page structure after conversion.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};

use crate::text::normalize_blank_lines;

/// Containers that usually hold the main documentation body, best first.
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".docs",
    ".documentation",
    ".markdown-body",
    ".document",
    ".content",
    "#content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-body",
];

/// A candidate container must hold at least this much text to win.
const MIN_CANDIDATE_CHARS: usize = 100;

lazy_static! {
    static ref DROP_BLOCKS: Regex = Regex::new(
        r"(?is)<(script|style|noscript|template|svg|nav|footer|aside|form|iframe)\b[^>]*>.*?</\s*(script|style|noscript|template|svg|nav|footer|aside|form|iframe)\s*>"
    )
    .unwrap();
    static ref COMMENTS: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref HEADING: Regex = Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"(?is)<li\b[^>]*>(.*?)</li\s*>").unwrap();
    static ref PARAGRAPH: Regex = Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").unwrap();
    static ref LINE_BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref BLOCK_END: Regex =
        Regex::new(r"(?i)</(div|section|tr|ul|ol|dl|dd|dt|table|pre|blockquote)\s*>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    static ref INLINE_SPACE: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Convert a full HTML document to text, keeping only the main content
/// region when one can be found.
pub fn page_text(html: &str) -> String {
    html_to_markdown(&main_content_html(html))
}

/// Pick the inner HTML of the most likely main-content container.
///
/// Falls back to `<body>` and then to the whole document.
pub fn main_content_html(html: &str) -> String {
    let document = Html::parse_document(html);

    for candidate in MAIN_CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text_len: usize = element.text().map(|t| t.trim().chars().count()).sum();
            if text_len >= MIN_CANDIDATE_CHARS {
                return element.inner_html();
            }
        }
    }

    Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next().map(|e| e.inner_html()))
        .unwrap_or_else(|| html.to_string())
}

/// Convert HTML to markdown-flavoured text (simplified).
pub fn html_to_markdown(html: &str) -> String {
    let mut text = COMMENTS.replace_all(html, "").to_string();
    text = DROP_BLOCKS.replace_all(&text, "").to_string();

    text = HEADING
        .replace_all(&text, |caps: &regex::Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("\n\n{} {}\n\n", "#".repeat(level), inline_text(&caps[2]))
        })
        .to_string();

    text = LIST_ITEM
        .replace_all(&text, |caps: &regex::Captures| format!("\n- {}\n", inline_text(&caps[1])))
        .to_string();

    text = PARAGRAPH.replace_all(&text, "\n\n$1\n\n").to_string();
    text = LINE_BREAK.replace_all(&text, "\n").to_string();
    text = BLOCK_END.replace_all(&text, "\n").to_string();
    text = TAG.replace_all(&text, "").to_string();
    text = decode_entities(&text);
    text = INLINE_SPACE.replace_all(&text, " ").to_string();

    normalize_blank_lines(&text)
}

/// Whether a body is HTML regardless of what the server labelled it.
///
/// Trusts an `html` content type; a missing or `text/plain` label is
/// checked against the start of the body. Other explicit types (markdown,
/// JSON) are left alone.
pub fn is_html_body(content_type: Option<&str>, body: &str) -> bool {
    let content_type = content_type.map(str::to_ascii_lowercase);
    match content_type.as_deref() {
        Some(ct) if ct.contains("html") => true,
        None => looks_like_html(body),
        Some(ct) if ct.starts_with("text/plain") => looks_like_html(body),
        Some(_) => false,
    }
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(256).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype html")
        || head.starts_with("<html")
        || (head.starts_with('<') && (head.contains("<body") || head.contains("<head") || head.contains("<div")))
}

/// Strip tags from a heading or list item and flatten it to one line.
fn inline_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&rsquo;", "'")
        .replace("&mdash;", "-")
        .replace("&ndash;", "-")
        .replace("&amp;", "&")
}
