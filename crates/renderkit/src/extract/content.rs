//! Generic page content: text, images, links, headings, tables, outline

use super::{compact_text, parse_selector, text_of};
use crate::types::{
    ExtractedDocument, ExtractionOptions, Heading, Image, Link, Metadata, Outline, OutlineBlock,
    OutlineSection, PageSnapshot, Table,
};
use scraper::{ElementRef, Html};
use tracing::warn;

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";

/// Breadcrumb and navigation containers
const NAVIGATION: &str = ".sapUiDocumentationBreadcrumb, .breadcrumb, nav";

/// Block elements collected under an outline heading
const OUTLINE_BLOCKS: &[&str] = &["p", "div", "ul", "ol", "table", "pre", "code"];

/// Extracts the generic part of an [`ExtractedDocument`]
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract from an already parsed (and stripped) document
    pub fn extract(
        &self,
        document: &Html,
        snapshot: &PageSnapshot,
        options: &ExtractionOptions,
    ) -> ExtractedDocument {
        let (content, html) = scoped_content(document, options.selector.as_deref(), &snapshot.url);

        ExtractedDocument {
            url: snapshot.url.clone(),
            title: snapshot.title.clone(),
            content,
            html,
            images: options.extract_images.then(|| images(document)),
            links: options.extract_links.then(|| links(document)),
            tables: tables(document),
            headings: headings(document),
            outline: options.extract_outline.then(|| outline(document)),
            metadata: Metadata {
                timestamp: snapshot.rendered_at,
                user_agent: snapshot.user_agent.clone(),
            },
            documentation: None,
        }
    }
}

/// Text (and inner markup) of the first `selector` match, or the whole body
fn scoped_content(document: &Html, selector: Option<&str>, url: &str) -> (String, Option<String>) {
    if let Some(raw) = selector {
        let matched = parse_selector(raw).and_then(|sel| document.select(&sel).next());
        match matched {
            Some(element) => return (text_of(element), Some(element.inner_html())),
            None => warn!(url, selector = %raw, "Content selector matched nothing, using whole document"),
        }
    }
    (body_text(document), None)
}

fn body_text(document: &Html) -> String {
    parse_selector("body")
        .and_then(|sel| document.select(&sel).next())
        .map(text_of)
        .unwrap_or_else(|| text_of(document.root_element()))
}

fn images(document: &Html) -> Vec<Image> {
    let Some(selector) = parse_selector("img[src]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            Some(Image {
                src: src.to_string(),
                alt: img.value().attr("alt").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

fn links(document: &Html) -> Vec<Link> {
    let Some(selector) = parse_selector("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(Link {
                href: href.to_string(),
                text: text_of(a),
            })
        })
        .collect()
}

fn heading_level(element: ElementRef<'_>) -> Option<u8> {
    let name = element.value().name();
    let level = name.strip_prefix('h')?.parse::<u8>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn headings(document: &Html) -> Vec<Heading> {
    let Some(selector) = parse_selector(HEADINGS) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|h| {
            let text = text_of(h);
            if text.is_empty() {
                return None;
            }
            Some(Heading {
                level: heading_level(h)?,
                text,
            })
        })
        .collect()
}

fn tables(document: &Html) -> Vec<Table> {
    let (Some(table_sel), Some(row_sel), Some(caption_sel)) = (
        parse_selector("table"),
        parse_selector("tr"),
        parse_selector("caption"),
    ) else {
        return Vec::new();
    };

    document
        .select(&table_sel)
        .map(|table| {
            let caption = table
                .select(&caption_sel)
                .next()
                .map(text_of)
                .filter(|c| !c.is_empty());

            // Rows of nested tables belong to those tables
            let mut rows = table
                .select(&row_sel)
                .filter(|row| owning_table(*row).map(|t| t.id()) == Some(table.id()))
                .map(row_cells)
                .filter(|cells| !cells.is_empty());

            let headers = rows.next().unwrap_or_default();
            Table {
                caption,
                headers,
                rows: rows.collect(),
            }
        })
        .collect()
}

fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(text_of)
        .collect()
}

fn outline(document: &Html) -> Outline {
    let navigation = parse_selector(NAVIGATION)
        .map(|sel| {
            document
                .select(&sel)
                .map(compact_text)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let sections = parse_selector(HEADINGS)
        .map(|sel| document.select(&sel).filter_map(outline_section).collect())
        .unwrap_or_default();

    Outline {
        navigation,
        sections,
    }
}

fn outline_section(heading: ElementRef<'_>) -> Option<OutlineSection> {
    let title = text_of(heading);
    if title.is_empty() {
        return None;
    }

    let blocks = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| heading_level(*el).is_none())
        .filter(|el| OUTLINE_BLOCKS.contains(&el.value().name()))
        .filter_map(|el| {
            let text = compact_text(el);
            (!text.is_empty()).then(|| OutlineBlock {
                kind: el.value().name().to_string(),
                text,
            })
        })
        .collect();

    Some(OutlineSection {
        level: heading_level(heading)?,
        title,
        blocks,
    })
}
