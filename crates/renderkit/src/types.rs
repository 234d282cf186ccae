//! Core types for renderkit

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default navigation and selector wait budget
pub const DEFAULT_MAX_WAIT_MS: u64 = 10_000;

/// Default number of URLs extracted concurrently in a batch
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default pause between batch waves
pub const DEFAULT_INTER_BATCH_DELAY_MS: u64 = 1_000;

fn default_max_wait_ms() -> u64 {
    DEFAULT_MAX_WAIT_MS
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_inter_batch_delay_ms() -> u64 {
    DEFAULT_INTER_BATCH_DELAY_MS
}

/// Per-request extraction options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionOptions {
    /// CSS selector scoping the extracted content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// CSS selector to wait for after navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,

    /// Navigation and selector wait timeout in milliseconds
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Elements stripped from the page before extraction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_selectors: Vec<String>,

    /// Collect `<img src>` elements
    #[serde(default)]
    pub extract_images: bool,

    /// Collect `<a href>` elements
    #[serde(default)]
    pub extract_links: bool,

    /// Collect navigation and heading-scoped sections
    #[serde(default)]
    pub extract_outline: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            selector: None,
            wait_for_selector: None,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            remove_selectors: Vec::new(),
            extract_images: false,
            extract_links: false,
            extract_outline: false,
        }
    }
}

impl ExtractionOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope content to the first element matching `selector`
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Wait for `selector` after navigation
    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    /// Set the navigation and wait timeout
    pub fn max_wait(mut self, max_wait_ms: u64) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    /// Strip elements matching `selector` before extraction
    pub fn remove(mut self, selector: impl Into<String>) -> Self {
        self.remove_selectors.push(selector.into());
        self
    }

    /// Enable image collection
    pub fn with_images(mut self) -> Self {
        self.extract_images = true;
        self
    }

    /// Enable link collection
    pub fn with_links(mut self) -> Self {
        self.extract_links = true;
        self
    }

    /// Enable outline collection
    pub fn with_outline(mut self) -> Self {
        self.extract_outline = true;
        self
    }
}

/// Rendered markup captured from one page visit
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub raw_html: String,
    /// User agent reported by the rendered page
    pub user_agent: String,
    pub rendered_at: DateTime<Utc>,
}

/// Image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Hyperlink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// Table with its first row split out as headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Heading with its level (1 to 6)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Block of text following a heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineBlock {
    /// Tag name of the block element (`p`, `ul`, `pre`, ...)
    pub kind: String,
    pub text: String,
}

/// Heading together with the blocks up to the next heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineSection {
    pub level: u8,
    pub title: String,
    pub blocks: Vec<OutlineBlock>,
}

/// Page structure: breadcrumbs and heading-scoped sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Outline {
    pub navigation: Vec<String>,
    pub sections: Vec<OutlineSection>,
}

/// Extraction metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
}

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedDocument {
    pub url: String,
    pub title: String,
    /// Visible text of the scoped element, or of the whole body
    pub content: String,

    /// Inner markup of the scoped element when the selector matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Present only when images were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,

    /// Present only when links were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    #[serde(default)]
    pub tables: Vec<Table>,

    #[serde(default)]
    pub headings: Vec<Heading>,

    /// Present only when the outline was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,

    pub metadata: Metadata,

    /// Structured API documentation, for documentation sites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<DocumentationModel>,
}

/// Parameter of a constructor, method or event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
    /// Derived from a `?` marker in the name cell or an "optional" marker element
    pub optional: bool,
}

/// Constructor documentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Constructor {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    pub parameters: Vec<Parameter>,
}

/// Property documentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    pub deprecated: bool,
}

/// Method return value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Returns {
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
}

/// Method documentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Method {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub returns: Returns,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    pub deprecated: bool,
}

/// Event documentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
}

/// Code example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Example {
    pub language: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Structured API reference extracted from a documentation page
///
/// Every field has an empty default; a section missing from the page leaves
/// its field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentationModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub overview: String,
    pub constructor: Constructor,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    pub events: Vec<Event>,
    pub examples: Vec<Example>,
    /// Inheritance chain in source order
    pub inheritance: Vec<String>,
}

impl DocumentationModel {
    /// True when no section yielded anything
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Options for a multi-URL extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchOptions {
    /// Options applied to every URL
    #[serde(flatten)]
    pub extraction: ExtractionOptions,

    /// Number of extractions per wave
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between waves in milliseconds
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            extraction: ExtractionOptions::default(),
            concurrency: DEFAULT_CONCURRENCY,
            inter_batch_delay_ms: DEFAULT_INTER_BATCH_DELAY_MS,
        }
    }
}

impl BatchOptions {
    /// Create batch options around per-URL extraction options
    pub fn new(extraction: ExtractionOptions) -> Self {
        Self {
            extraction,
            ..Default::default()
        }
    }

    /// Set the wave size
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the pause between waves
    pub fn inter_batch_delay(mut self, delay_ms: u64) -> Self {
        self.inter_batch_delay_ms = delay_ms;
        self
    }
}

/// Outcome of one URL in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchItemResult {
    Success(Box<ExtractedDocument>),
    Failure { url: String, error: String },
}

impl BatchItemResult {
    /// URL this result belongs to
    pub fn url(&self) -> &str {
        match self {
            BatchItemResult::Success(doc) => &doc.url,
            BatchItemResult::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemResult::Success(_))
    }

    /// Extracted document, if the extraction succeeded
    pub fn document(&self) -> Option<&ExtractedDocument> {
        match self {
            BatchItemResult::Success(doc) => Some(doc),
            BatchItemResult::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> ExtractedDocument {
        ExtractedDocument {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            content: "Hello".to_string(),
            html: None,
            images: None,
            links: Some(vec![]),
            tables: vec![],
            headings: vec![],
            outline: None,
            metadata: Metadata {
                timestamp: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
                user_agent: "test".to_string(),
            },
            documentation: None,
        }
    }

    #[test]
    fn test_options_defaults() {
        let options = ExtractionOptions::default();
        assert_eq!(options.max_wait_ms, 10_000);
        assert!(options.selector.is_none());
        assert!(options.remove_selectors.is_empty());
        assert!(!options.extract_images);
        assert!(!options.extract_links);
    }

    #[test]
    fn test_options_builder() {
        let options = ExtractionOptions::new()
            .selector("main")
            .wait_for("#content")
            .remove("nav")
            .remove(".ads")
            .max_wait(500)
            .with_images()
            .with_links();

        assert_eq!(options.selector.as_deref(), Some("main"));
        assert_eq!(options.wait_for_selector.as_deref(), Some("#content"));
        assert_eq!(options.remove_selectors, vec!["nav", ".ads"]);
        assert_eq!(options.max_wait_ms, 500);
        assert!(options.extract_images);
        assert!(options.extract_links);
        assert!(!options.extract_outline);
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: ExtractionOptions = serde_json::from_str(r#"{"selector": "h1"}"#).unwrap();
        assert_eq!(options.selector.as_deref(), Some("h1"));
        assert_eq!(options.max_wait_ms, DEFAULT_MAX_WAIT_MS);

        let batch: BatchOptions =
            serde_json::from_str(r#"{"extract_links": true, "concurrency": 5}"#).unwrap();
        assert!(batch.extraction.extract_links);
        assert_eq!(batch.concurrency, 5);
        assert_eq!(batch.inter_batch_delay_ms, DEFAULT_INTER_BATCH_DELAY_MS);
    }

    #[test]
    fn test_document_serialization_omits_unrequested() {
        let json = serde_json::to_string(&sample_document()).unwrap();
        assert!(!json.contains("\"images\""));
        assert!(json.contains("\"links\":[]"));
        assert!(!json.contains("\"documentation\""));
        assert!(json.contains("\"tables\":[]"));
    }

    #[test]
    fn test_parameter_type_field_name() {
        let param = Parameter {
            name: "timeout".to_string(),
            type_name: "int".to_string(),
            description: "Wait budget".to_string(),
            optional: true,
        };
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["optional"], true);
    }

    #[test]
    fn test_batch_item_result_serialization() {
        let failure = BatchItemResult::Failure {
            url: "https://example.com/u2".to_string(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["url"], "https://example.com/u2");
        assert!(!failure.is_success());
        assert!(failure.document().is_none());

        let success = BatchItemResult::Success(Box::new(sample_document()));
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["title"], "Example");
        assert_eq!(success.url(), "https://example.com");
    }

    #[test]
    fn test_documentation_model_is_empty() {
        let mut model = DocumentationModel::default();
        assert!(model.is_empty());
        model.inheritance.push("sap.ui.core.Element".to_string());
        assert!(!model.is_empty());
    }
}
