//! RenderKit - structured extraction from JavaScript-rendered pages
//!
//! This crate renders pages through a pluggable headless renderer, extracts
//! their content (text, links, images, tables, headings) and, for API
//! reference sites, a structured documentation model. Documents can be
//! rendered as markdown, JSON, HTML or plain text.
//!
//! ## Renderer Backends
//!
//! The pipeline drives a [`RenderBackend`]. Built-in backends:
//! - [`HttpBackend`] - plain HTTP fetch, no script execution
//! - `ChromiumBackend` - headless Chromium over CDP (feature `chromium`)
//!
//! ## Example
//!
//! ```no_run
//! use renderkit::{format, Extractor, ExtractionOptions, OutputFormat};
//!
//! # async fn run() -> Result<(), renderkit::ExtractError> {
//! let extractor = Extractor::default();
//! let options = ExtractionOptions::new().with_links();
//! let doc = extractor.extract_one("https://example.com", &options).await?;
//! println!("{}", format(&doc, OutputFormat::Markdown));
//! extractor.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod batch;
pub mod client;
mod error;
pub mod extract;
pub mod fetcher;
mod format;
pub mod renderer;
mod session;
pub mod sink;
mod types;

pub use batch::BatchScheduler;
pub use client::{Extractor, ExtractorBuilder};
pub use error::{DeliveryError, ExtractError, RenderError};
pub use extract::{
    extract_document, page_title, Candidate, ContentExtractor, DocSiteHeuristic, DocsProfile,
    DocumentationExtractor, SectionSpec,
};
pub use fetcher::{FetcherConfig, PageFetcher, ReadinessPolicy};
pub use format::{format, to_html, to_json, to_markdown, to_text, OutputFormat};
#[cfg(feature = "chromium")]
pub use renderer::ChromiumBackend;
pub use renderer::{
    Browser, HttpBackend, LaunchConfig, RenderBackend, RenderPage, ResourceKind, Viewport,
};
pub use session::RenderSession;
pub use sink::{DocumentSink, HttpSink};
pub use types::*;

/// Default User-Agent string, matching a desktop Chrome release
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
