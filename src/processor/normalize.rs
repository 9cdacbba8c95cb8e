//! HTML-to-text normalization
//!
//! Converts rendered HTML into clean plain text: chrome elements are
//! stripped, a primary content container is located through an ordered list
//! of selector candidates (falling back to the whole body), and whitespace
//! is collapsed. The function is pure; byte-identical HTML always yields
//! byte-identical text, which the change detector's hash comparison relies
//! on.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Selector candidates for the primary content container, in priority order
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    ".content",
    "#content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".main-content",
    ".page-content",
];

/// Elements whose subtrees never contribute visible content
const STRIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "form", "noscript",
];

fn collapse_newlines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

fn collapse_spaces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("valid regex"))
}

/// Normalize rendered HTML into clean plain text.
///
/// Returns one line per text run, with very short fragments (menu arrows,
/// bullet glyphs) dropped, runs of 3+ newlines collapsed to 2, and runs of
/// 2+ spaces collapsed to 1.
pub fn normalize(html: &str) -> String {
    let document = Html::parse_document(html);
    let container = content_container(&document);

    let mut lines: Vec<String> = Vec::new();
    for node in container.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let stripped_ancestor = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => STRIPPED_ELEMENTS.contains(&el.name()),
            _ => false,
        });
        if stripped_ancestor {
            continue;
        }
        for line in text.split('\n') {
            let line = line.trim();
            // Fragments of one or two characters are navigation noise
            if line.chars().count() > 2 {
                lines.push(line.to_string());
            }
        }
    }

    let joined = lines.join("\n");
    let joined = collapse_newlines().replace_all(&joined, "\n\n");
    collapse_spaces().replace_all(&joined, " ").into_owned()
}

/// Locate the primary content container, falling back to body, then root
fn content_container(document: &Html) -> ElementRef<'_> {
    for candidate in CONTENT_SELECTORS {
        let selector = Selector::parse(candidate).expect("content selector is valid");
        if let Some(element) = document.select(&selector).next() {
            return element;
        }
    }
    let body = Selector::parse("body").expect("body selector is valid");
    document
        .select(&body)
        .next()
        .unwrap_or_else(|| document.root_element())
}
