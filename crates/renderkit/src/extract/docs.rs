//! API documentation extraction
//!
//! Design: every field is described by an ordered list of [`Candidate`]
//! selectors, most specific first. The first candidate whose text passes its
//! minimum length wins; when none does the field keeps its empty default.
//! Multi-item sections (properties, methods, events) locate a container
//! through an anchor and apply the same candidate lists per item.
//!
//! Extraction is best effort. A section that cannot be derived is logged and
//! left empty; [`DocumentationExtractor::extract`] always returns a model.

use super::{compact_text, text_of};
use crate::types::{
    Constructor, DocumentationModel, Event, Example, Method, Parameter, Property, Returns,
};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

/// Language assumed for code examples without a `language-<tag>` class
pub const DEFAULT_EXAMPLE_LANGUAGE: &str = "javascript";

/// Minimum length (exclusive) of an accepted code example
const MIN_EXAMPLE_LEN: usize = 10;

/// Selector accepted only when its text has at least `min_len` characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub selector: &'static str,
    pub min_len: usize,
}

impl Candidate {
    pub const fn new(selector: &'static str, min_len: usize) -> Self {
        Self { selector, min_len }
    }

    /// Any non-empty text
    pub const fn any(selector: &'static str) -> Self {
        Self::new(selector, 1)
    }
}

/// A multi-item section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    /// Element whose parent holds the section
    pub anchor: &'static str,
    /// Item elements inside the container
    pub items: &'static str,
    /// Item name candidates
    pub name: &'static [Candidate],
}

/// Candidate tables for one documentation site family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsProfile {
    pub overview: &'static [Candidate],
    pub class_name: &'static [Candidate],
    pub constructor_anchor: &'static str,
    pub properties: SectionSpec,
    pub methods: SectionSpec,
    pub events: SectionSpec,
    pub description: &'static [Candidate],
    pub type_name: &'static [Candidate],
    pub default_value: &'static [Candidate],
    pub since: &'static [Candidate],
    pub deprecated_marker: &'static str,
    pub returns_type: &'static [Candidate],
    pub returns_description: &'static [Candidate],
    pub parameter_rows: &'static str,
    pub optional_marker: &'static str,
    pub examples: &'static str,
    pub inheritance: &'static [&'static str],
}

impl DocsProfile {
    /// Selectors for SAPUI5-style API reference pages
    pub const SAPUI5: DocsProfile = DocsProfile {
        overview: &[
            Candidate::new(".sapUiDocumentationOverview", 21),
            Candidate::new("[data-section=\"overview\"]", 21),
            Candidate::new(".overview", 21),
            Candidate::new(".description", 21),
            Candidate::new("p:first-of-type", 21),
        ],
        class_name: &[
            Candidate::any(".sapUiDocumentationClassName"),
            Candidate::any("[data-section=\"title\"]"),
            Candidate::any(".class-name"),
            Candidate::any("h1"),
        ],
        constructor_anchor: "#Constructor, [data-section=\"constructor\"]",
        properties: SectionSpec {
            anchor: "#Properties, [data-section=\"properties\"]",
            items: ".sapUiDocumentationProperty, [class*=\"property\"]",
            name: &[
                Candidate::any("h4"),
                Candidate::any("h5"),
                Candidate::any(".property-name"),
            ],
        },
        methods: SectionSpec {
            anchor: "#Methods, [data-section=\"methods\"]",
            items: ".sapUiDocumentationMethod, [class*=\"method\"]",
            name: &[
                Candidate::any("h4"),
                Candidate::any("h5"),
                Candidate::any(".method-name"),
            ],
        },
        events: SectionSpec {
            anchor: "#Events, [data-section=\"events\"]",
            items: ".sapUiDocumentationEvent, [class*=\"event\"]",
            name: &[
                Candidate::any("h4"),
                Candidate::any("h5"),
                Candidate::any(".event-name"),
            ],
        },
        description: &[Candidate::any(".description"), Candidate::any("p")],
        type_name: &[Candidate::any(".type"), Candidate::any("[class*=\"type\"]")],
        default_value: &[
            Candidate::any(".default"),
            Candidate::any("[class*=\"default\"]"),
        ],
        since: &[Candidate::any(".since"), Candidate::any("[class*=\"since\"]")],
        deprecated_marker: ".deprecated, [class*=\"deprecated\"]",
        returns_type: &[
            Candidate::any(".returns .type"),
            Candidate::any("[class*=\"return-type\"]"),
        ],
        returns_description: &[
            Candidate::any(".returns p"),
            Candidate::any("[class*=\"return-desc\"]"),
        ],
        parameter_rows: "table tr",
        optional_marker: "[class*=\"optional\"]",
        examples: "pre, code, .example, [class*=\"example\"]",
        inheritance: &[
            ".sapUiDocumentationInheritance",
            "[data-section=\"inheritance\"]",
            ".inheritance",
            ".extends",
        ],
    };
}

impl Default for DocsProfile {
    fn default() -> Self {
        Self::SAPUI5
    }
}

/// Decides whether a page is a documentation page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSiteHeuristic {
    /// Substrings of the URL that identify a documentation site
    pub url_markers: Vec<String>,
    /// Substring of a class name that identifies a documentation site
    pub class_marker: Option<String>,
}

impl Default for DocSiteHeuristic {
    fn default() -> Self {
        Self {
            url_markers: vec!["sapui5".to_string(), "sap.com".to_string()],
            class_marker: Some("sap".to_string()),
        }
    }
}

impl DocSiteHeuristic {
    pub fn matches(&self, url: &str, document: &Html) -> bool {
        if self.url_markers.iter().any(|m| url.contains(m.as_str())) {
            return true;
        }
        let Some(ref marker) = self.class_marker else {
            return false;
        };
        document.root_element().descendants().any(|node| {
            node.value()
                .as_element()
                .and_then(|el| el.attr("class"))
                .is_some_and(|class| class.contains(marker.as_str()))
        })
    }
}

/// Reasons a single section could not be derived
#[derive(Debug, Error)]
enum SectionError {
    #[error("invalid selector `{0}`")]
    InvalidSelector(&'static str),

    #[error("no container for `{0}`")]
    MissingContainer(&'static str),
}

type SectionResult<T> = Result<T, SectionError>;

/// Heuristic API documentation extractor
#[derive(Debug, Clone, Default)]
pub struct DocumentationExtractor {
    heuristic: DocSiteHeuristic,
    profile: DocsProfile,
}

impl DocumentationExtractor {
    pub fn new(heuristic: DocSiteHeuristic, profile: DocsProfile) -> Self {
        Self { heuristic, profile }
    }

    pub fn heuristic(&self) -> &DocSiteHeuristic {
        &self.heuristic
    }

    /// Whether the page looks like a documentation page
    pub fn matches(&self, url: &str, document: &Html) -> bool {
        self.heuristic.matches(url, document)
    }

    /// Build the documentation model; never fails
    pub fn extract(&self, document: &Html) -> DocumentationModel {
        let root = document.root_element();

        DocumentationModel {
            class_name: or_default("class_name", first_accepted(root, self.profile.class_name)),
            overview: or_default("overview", first_accepted(root, self.profile.overview))
                .unwrap_or_default(),
            constructor: or_default("constructor", self.constructor(document)),
            properties: or_default("properties", self.properties(document)),
            methods: or_default("methods", self.methods(document)),
            events: or_default("events", self.events(document)),
            examples: or_default("examples", self.examples(document)),
            inheritance: or_default("inheritance", self.inheritance(document)),
        }
    }

    fn constructor(&self, document: &Html) -> SectionResult<Constructor> {
        let section = container(document, self.profile.constructor_anchor)?;
        Ok(Constructor {
            description: first_text(section, "p")?,
            since: self.since(section)?,
            parameters: self.parameters(section)?,
        })
    }

    fn properties(&self, document: &Html) -> SectionResult<Vec<Property>> {
        self.items(document, &self.profile.properties, |item, name| {
            let default_value = first_accepted(item, self.profile.default_value)?;
            Ok(Property {
                name,
                type_name: first_accepted(item, self.profile.type_name)?.unwrap_or_default(),
                default_value,
                description: first_text(item, "p")?,
                since: self.since(item)?,
                deprecated: has_match(item, self.profile.deprecated_marker)?,
            })
        })
    }

    fn methods(&self, document: &Html) -> SectionResult<Vec<Method>> {
        self.items(document, &self.profile.methods, |item, name| {
            Ok(Method {
                name,
                description: first_text(item, "p")?,
                parameters: self.parameters(item)?,
                returns: Returns {
                    type_name: first_accepted(item, self.profile.returns_type)?
                        .unwrap_or_default(),
                    description: first_accepted(item, self.profile.returns_description)?
                        .unwrap_or_default(),
                },
                since: self.since(item)?,
                deprecated: has_match(item, self.profile.deprecated_marker)?,
            })
        })
    }

    fn events(&self, document: &Html) -> SectionResult<Vec<Event>> {
        self.items(document, &self.profile.events, |item, name| {
            Ok(Event {
                name,
                description: first_text(item, "p")?,
                parameters: self.parameters(item)?,
                since: self.since(item)?,
            })
        })
    }

    /// Walk the items of a section, discarding those without a name
    fn items<T>(
        &self,
        document: &Html,
        spec: &SectionSpec,
        build: impl Fn(ElementRef<'_>, String) -> SectionResult<T>,
    ) -> SectionResult<Vec<T>> {
        let section = container(document, spec.anchor)?;
        let items = selector(spec.items)?;

        let mut out = Vec::new();
        for item in section.select(&items) {
            let Some(name) = first_accepted(item, spec.name)? else {
                continue;
            };
            out.push(build(item, name)?);
        }
        Ok(out)
    }

    /// Rows of a parameter table: header row skipped, at least three cells
    fn parameters(&self, scope: ElementRef<'_>) -> SectionResult<Vec<Parameter>> {
        let rows = selector(self.profile.parameter_rows)?;
        let cells = selector("td")?;
        let optional = selector(self.profile.optional_marker)?;

        let params = scope
            .select(&rows)
            .skip(1)
            .filter_map(|row| {
                let cols: Vec<ElementRef<'_>> = row.select(&cells).collect();
                if cols.len() < 3 {
                    return None;
                }
                let raw_name = text_of(cols[0]);
                let name = raw_name.replace('?', "").trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(Parameter {
                    name,
                    type_name: text_of(cols[1]),
                    description: text_of(cols[2]),
                    optional: raw_name.contains('?') || row.select(&optional).next().is_some(),
                })
            })
            .collect();
        Ok(params)
    }

    fn since(&self, scope: ElementRef<'_>) -> SectionResult<Option<String>> {
        let since = first_accepted(scope, self.profile.since)?.map(|text| {
            let trimmed = text.trim_start();
            let version = trimmed
                .strip_prefix("Since")
                .or_else(|| trimmed.strip_prefix("since"))
                .unwrap_or(trimmed);
            version.trim_start_matches(':').trim().to_string()
        });
        Ok(since.filter(|v| !v.is_empty()))
    }

    /// Code blocks anywhere on the page
    fn examples(&self, document: &Html) -> SectionResult<Vec<Example>> {
        let blocks = selector(self.profile.examples)?;
        let code = selector("pre, code")?;
        let paragraph = selector("p")?;

        let mut accepted = Vec::new();
        let mut examples = Vec::new();

        for element in document.select(&blocks) {
            // A <code> inside an accepted <pre> is the same example
            if accepted.contains(&element.id())
                || element.ancestors().any(|a| accepted.contains(&a.id()))
            {
                continue;
            }

            let is_code = matches!(element.value().name(), "pre" | "code");
            let (source, description) = if is_code {
                (element, None)
            } else {
                // The innermost container owns its code
                let wraps_container = element.select(&blocks).any(|inner| {
                    inner.id() != element.id()
                        && !matches!(inner.value().name(), "pre" | "code")
                });
                if wraps_container {
                    continue;
                }
                let inner = code_blocks(element, &code);
                match inner.as_slice() {
                    // Several blocks are visited one by one as plain code
                    [_, _, ..] => continue,
                    [single] => (*single, element.select(&paragraph).next().map(compact_text)),
                    [] => (element, None),
                }
            };
            if accepted.contains(&source.id()) {
                continue;
            }

            let text = text_of(source);
            if text.chars().count() <= MIN_EXAMPLE_LEN {
                continue;
            }

            let description = element
                .value()
                .attr("title")
                .or_else(|| element.value().attr("data-description"))
                .map(|d| d.trim().to_string())
                .or(description)
                .filter(|d| !d.is_empty());

            accepted.push(source.id());
            examples.push(Example {
                language: example_language(element)
                    .unwrap_or_else(|| DEFAULT_EXAMPLE_LANGUAGE.to_string()),
                code: text,
                description,
            });
        }
        Ok(examples)
    }

    /// Inheritance chain in source order
    fn inheritance(&self, document: &Html) -> SectionResult<Vec<String>> {
        let links = selector("a")?;
        for raw in self.profile.inheritance {
            let sel = selector(raw)?;
            let Some(block) = document.select(&sel).next() else {
                continue;
            };

            let linked: Vec<String> = block
                .select(&links)
                .map(text_of)
                .filter(|t| !t.is_empty())
                .collect();
            if !linked.is_empty() {
                return Ok(linked);
            }

            let text = compact_text(block);
            let text = text
                .strip_prefix("Extends:")
                .or_else(|| text.strip_prefix("Inheritance:"))
                .unwrap_or(&text);
            let chain: Vec<String> = text
                .split(['→', '>', ','])
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !chain.is_empty() {
                return Ok(chain);
            }
        }
        Ok(Vec::new())
    }
}

fn or_default<T: Default>(section: &str, result: SectionResult<T>) -> T {
    result.unwrap_or_else(|e| {
        debug!(section, error = %e, "Documentation section not extracted");
        T::default()
    })
}

fn selector(raw: &'static str) -> SectionResult<Selector> {
    Selector::parse(raw).map_err(|_| SectionError::InvalidSelector(raw))
}

/// Parent of the first element matching `anchor`
fn container<'a>(document: &'a Html, anchor: &'static str) -> SectionResult<ElementRef<'a>> {
    let sel = selector(anchor)?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.parent())
        .and_then(ElementRef::wrap)
        .ok_or(SectionError::MissingContainer(anchor))
}

/// Text of the first candidate passing its length threshold
fn first_accepted(
    scope: ElementRef<'_>,
    candidates: &[Candidate],
) -> SectionResult<Option<String>> {
    for candidate in candidates {
        let sel = selector(candidate.selector)?;
        if let Some(element) = scope.select(&sel).next() {
            let text = text_of(element);
            if text.chars().count() >= candidate.min_len {
                return Ok(Some(text));
            }
        }
    }
    Ok(None)
}

fn first_text(scope: ElementRef<'_>, raw: &'static str) -> SectionResult<String> {
    let sel = selector(raw)?;
    Ok(scope.select(&sel).next().map(text_of).unwrap_or_default())
}

fn has_match(scope: ElementRef<'_>, raw: &'static str) -> SectionResult<bool> {
    let sel = selector(raw)?;
    Ok(scope.select(&sel).next().is_some())
}

/// `<tag>` from a `language-<tag>` class on the element or a descendant
/// Outermost `pre`/`code` elements under `container`
fn code_blocks<'a>(container: ElementRef<'a>, code: &Selector) -> Vec<ElementRef<'a>> {
    container
        .select(code)
        .filter(|block| {
            !block
                .ancestors()
                .take_while(|a| a.id() != container.id())
                .filter_map(ElementRef::wrap)
                .any(|a| matches!(a.value().name(), "pre" | "code"))
        })
        .collect()
}

fn example_language(element: ElementRef<'_>) -> Option<String> {
    std::iter::once(element)
        .chain(element.descendants().filter_map(ElementRef::wrap))
        .filter_map(|el| el.value().attr("class"))
        .flat_map(str::split_whitespace)
        .find_map(|class| {
            let tag = class.strip_prefix("language-")?;
            let tag: String = tag
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            (!tag.is_empty()).then_some(tag)
        })
}
