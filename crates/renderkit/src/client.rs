//! Extraction entry points
//!
//! [`Extractor`] ties the pipeline together: it validates the URL, makes
//! sure the shared renderer is running, fetches a snapshot, extracts the
//! document, and hands it to the configured sink.
//!
//! Deliveries run in the background. [`Extractor::shutdown`] waits for the
//! pending ones, bounded by [`DELIVERY_TIMEOUT`], before stopping the renderer.

use crate::batch::BatchScheduler;
use crate::error::ExtractError;
use crate::extract::{
    extract_document, ContentExtractor, DocSiteHeuristic, DocsProfile, DocumentationExtractor,
};
use crate::fetcher::{FetcherConfig, PageFetcher, ReadinessPolicy};
use crate::renderer::{LaunchConfig, RenderBackend, ResourceKind, Viewport};
use crate::session::RenderSession;
use crate::sink::{DocumentSink, DELIVERY_TIMEOUT};
use crate::types::{BatchItemResult, BatchOptions, ExtractedDocument, ExtractionOptions};
use schemars::schema_for;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Builder for configuring an [`Extractor`]
#[derive(Default)]
pub struct ExtractorBuilder {
    backend: Option<Arc<dyn RenderBackend>>,
    launch: LaunchConfig,
    fetcher: FetcherConfig,
    heuristic: DocSiteHeuristic,
    profile: DocsProfile,
    sink: Option<Arc<dyn DocumentSink>>,
}

impl ExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the renderer backend
    pub fn backend(mut self, backend: impl RenderBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set the renderer process configuration
    pub fn launch_config(mut self, config: LaunchConfig) -> Self {
        self.launch = config;
        self
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.fetcher.user_agent = ua.into();
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.fetcher.viewport = Viewport { width, height };
        self
    }

    /// Set how to wait for script rendering to settle
    pub fn readiness(mut self, policy: ReadinessPolicy) -> Self {
        self.fetcher.readiness = policy;
        self
    }

    /// Replace the resource kinds aborted on every page
    pub fn block_resources(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.fetcher.blocked_resources = kinds.into_iter().collect();
        self
    }

    /// Set the documentation-site detection rules
    pub fn doc_heuristic(mut self, heuristic: DocSiteHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Set the documentation selector tables
    pub fn docs_profile(mut self, profile: DocsProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Deliver every extracted document to `sink`
    pub fn sink(mut self, sink: impl DocumentSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Build the extractor; the renderer starts on first use
    pub fn build(self) -> Extractor {
        let backend = self.backend.unwrap_or_else(default_backend);
        let session = Arc::new(RenderSession::new(backend, self.launch));

        Extractor {
            fetcher: PageFetcher::new(Arc::clone(&session), self.fetcher),
            session,
            content: ContentExtractor::new(),
            docs: DocumentationExtractor::new(self.heuristic, self.profile),
            sink: self.sink,
            deliveries: Mutex::new(JoinSet::new()),
        }
    }
}

#[cfg(feature = "chromium")]
fn default_backend() -> Arc<dyn RenderBackend> {
    Arc::new(crate::renderer::ChromiumBackend::new())
}

#[cfg(not(feature = "chromium"))]
fn default_backend() -> Arc<dyn RenderBackend> {
    Arc::new(crate::renderer::HttpBackend::new())
}

/// Configured extraction pipeline
pub struct Extractor {
    session: Arc<RenderSession>,
    fetcher: PageFetcher,
    content: ContentExtractor,
    docs: DocumentationExtractor,
    sink: Option<Arc<dyn DocumentSink>>,
    deliveries: Mutex<JoinSet<()>>,
}

impl Default for Extractor {
    fn default() -> Self {
        ExtractorBuilder::new().build()
    }
}

impl Extractor {
    /// Create a new extractor builder
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    /// Name of the renderer backend in use
    pub fn backend_name(&self) -> &'static str {
        self.session.backend_name()
    }

    /// JSON Schema of the per-request options
    pub fn input_schema() -> serde_json::Value {
        let schema = schema_for!(ExtractionOptions);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// JSON Schema of an extracted document
    pub fn output_schema() -> serde_json::Value {
        let schema = schema_for!(ExtractedDocument);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Extract a single page
    pub async fn extract_one(
        &self,
        url: &str,
        options: &ExtractionOptions,
    ) -> Result<ExtractedDocument, ExtractError> {
        validate_url(url)?;
        self.session.ensure_started().await?;

        let snapshot = self.fetcher.fetch(url, options).await?;
        let document = extract_document(&snapshot, options, &self.content, &self.docs);

        info!(
            url,
            title = %document.title,
            documentation = document.documentation.is_some(),
            "Page extracted"
        );

        self.deliver(&document);
        Ok(document)
    }

    /// Extract many pages in bounded waves
    ///
    /// Returns one result per URL in input order; never fails as a whole.
    pub async fn extract_many(
        &self,
        urls: &[String],
        options: &BatchOptions,
    ) -> Vec<BatchItemResult> {
        let extraction = &options.extraction;
        BatchScheduler::from_options(options)
            .run(urls, move |url| async move {
                self.extract_one(&url, extraction).await
            })
            .await
    }

    /// Finish pending deliveries, then stop the shared renderer
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        self.drain_deliveries().await;
        self.session.shutdown().await;
    }

    async fn drain_deliveries(&self) {
        let mut pending = std::mem::take(&mut *self.lock_deliveries());
        if pending.is_empty() {
            return;
        }

        debug!(pending = pending.len(), "Waiting for deliveries");
        let drained = tokio::time::timeout(DELIVERY_TIMEOUT, async {
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Delivery task failed");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                abandoned = pending.len(),
                "Deliveries still pending at shutdown"
            );
            pending.abort_all();
        }
    }

    fn lock_deliveries(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.deliveries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn deliver(&self, document: &ExtractedDocument) {
        let Some(ref sink) = self.sink else {
            return;
        };

        let sink = Arc::clone(sink);
        let document = document.clone();
        let mut deliveries = self.lock_deliveries();
        // Reap finished tasks
        while deliveries.try_join_next().is_some() {}
        deliveries.spawn(async move {
            match sink.deliver(&document).await {
                Ok(()) => debug!(url = %document.url, sink = sink.name(), "Delivered"),
                Err(e) => {
                    warn!(url = %document.url, sink = sink.name(), error = %e, "Delivery failed")
                }
            }
        });
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("session", &self.session)
            .field("fetcher", &self.fetcher.config())
            .field("docs", &self.docs)
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .finish()
    }
}

fn validate_url(url: &str) -> Result<(), ExtractError> {
    if url.trim().is_empty() {
        return Err(ExtractError::MissingUrl);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ExtractError::InvalidUrlScheme);
    }
    Url::parse(url).map_err(|_| ExtractError::InvalidUrlScheme)?;
    Ok(())
}
