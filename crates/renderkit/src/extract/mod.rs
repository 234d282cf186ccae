//! Structured extraction from rendered markup
//!
//! [`extract_document`] parses a snapshot once, applies the removal selectors,
//! then runs the generic [`ContentExtractor`] and, for documentation sites,
//! the [`DocumentationExtractor`].

mod content;
mod docs;

pub use content::ContentExtractor;
pub use docs::{Candidate, DocSiteHeuristic, DocsProfile, DocumentationExtractor, SectionSpec};

use crate::types::{ExtractedDocument, ExtractionOptions, PageSnapshot};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Elements whose text never renders
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Build an [`ExtractedDocument`] from a snapshot
pub fn extract_document(
    snapshot: &PageSnapshot,
    options: &ExtractionOptions,
    content: &ContentExtractor,
    docs: &DocumentationExtractor,
) -> ExtractedDocument {
    let mut document = Html::parse_document(&snapshot.raw_html);
    remove_matching(&mut document, &options.remove_selectors);

    let mut extracted = content.extract(&document, snapshot, options);

    if docs.matches(&snapshot.url, &document) {
        debug!(url = %snapshot.url, "Documentation site detected");
        let model = docs.extract(&document);
        extracted.documentation = Some(model);
    }

    extracted
}

/// Text of the `<title>` element
pub fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    parse_selector("title")
        .and_then(|sel| document.select(&sel).next().map(text_of))
        .unwrap_or_default()
}

/// Detach every element matching one of `selectors`
///
/// Removal is destructive: later lookups never see the detached subtrees.
fn remove_matching(document: &mut Html, selectors: &[String]) {
    for raw in selectors {
        let Some(selector) = parse_selector(raw) else {
            continue;
        };
        let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
        debug!(selector = %raw, count = ids.len(), "Removing elements");
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = %raw, error = %e, "Invalid selector ignored");
            None
        }
    }
}

/// Concatenated visible text of an element, untrimmed
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !INVISIBLE_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        }
    }
}

/// Trimmed visible text of an element
fn text_of(element: ElementRef<'_>) -> String {
    visible_text(element).trim().to_string()
}

/// Visible text with whitespace runs collapsed to single spaces
fn compact_text(element: ElementRef<'_>) -> String {
    visible_text(element)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(url: &str, html: &str) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            title: page_title(html),
            raw_html: html.to_string(),
            user_agent: "TestAgent".to_string(),
            rendered_at: Utc::now(),
        }
    }

    #[test]
    fn test_page_title() {
        assert_eq!(
            page_title("<html><head><title>\n  API Reference \n</title></head></html>"),
            "API Reference"
        );
        assert_eq!(page_title("<p>untitled</p>"), "");
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let document = Html::parse_fragment(
            "<div id=\"x\">Hello <script>var a = 1;</script><style>p{}</style><b>World</b></div>",
        );
        let sel = Selector::parse("#x").unwrap();
        let el = document.select(&sel).next().unwrap();
        assert_eq!(text_of(el), "Hello World");
    }

    #[test]
    fn test_compact_text() {
        let document = Html::parse_fragment("<p id=\"x\">  a\n\n   b\tc </p>");
        let sel = Selector::parse("#x").unwrap();
        let el = document.select(&sel).next().unwrap();
        assert_eq!(compact_text(el), "a b c");
    }

    #[test]
    fn test_remove_matching_detaches_elements() {
        let mut document = Html::parse_document(
            "<body><nav>Menu</nav><main>Body <span class=\"ad\">Buy!</span></main></body>",
        );
        remove_matching(&mut document, &["nav".to_string(), ".ad".to_string(), "[[".to_string()]);
        let html = document.root_element().html();
        assert!(!html.contains("Menu"));
        assert!(!html.contains("Buy!"));
        assert!(html.contains("Body"));
    }

    #[test]
    fn test_extract_document_skips_docs_for_plain_pages() {
        let snap = snapshot(
            "https://example.com/blog",
            "<html><head><title>Blog</title></head><body><p>Just a post.</p></body></html>",
        );
        let doc = extract_document(
            &snap,
            &ExtractionOptions::default(),
            &ContentExtractor::new(),
            &DocumentationExtractor::default(),
        );
        assert_eq!(doc.title, "Blog");
        assert_eq!(doc.content, "Just a post.");
        assert!(doc.documentation.is_none());
    }

    #[test]
    fn test_extract_document_enriches_doc_sites() {
        let snap = snapshot(
            "https://sapui5.hana.ondemand.com/#/api/sap.m.Button",
            "<html><body><p>Nothing structured on this page at all.</p></body></html>",
        );
        let doc = extract_document(
            &snap,
            &ExtractionOptions::default(),
            &ContentExtractor::new(),
            &DocumentationExtractor::default(),
        );
        let model = doc.documentation.expect("documentation model");
        assert_eq!(model.overview, "Nothing structured on this page at all.");
        assert!(model.properties.is_empty());
        assert!(model.methods.is_empty());
    }
}
