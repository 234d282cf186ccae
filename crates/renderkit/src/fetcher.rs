//! Per-request page lifecycle
//!
//! Opens a page, configures it, navigates, waits, captures the rendered
//! markup, and always closes the page again.

use crate::error::{ExtractError, RenderError};
use crate::renderer::{RenderPage, ResourceKind, Viewport};
use crate::session::RenderSession;
use crate::types::{ExtractionOptions, PageSnapshot};
use crate::DEFAULT_USER_AGENT;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default grace period for deferred script rendering
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// How to decide that script-driven rendering has settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessPolicy {
    /// Sleep a fixed duration after navigation
    FixedDelay(Duration),
    /// Poll `document.readyState` until it reports "complete"
    DocumentReady {
        timeout: Duration,
        poll_interval: Duration,
    },
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        ReadinessPolicy::FixedDelay(DEFAULT_GRACE_PERIOD)
    }
}

/// Page setup applied to every fetch
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub viewport: Viewport,
    pub user_agent: String,
    pub blocked_resources: Vec<ResourceKind>,
    pub readiness: ReadinessPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            blocked_resources: vec![ResourceKind::Stylesheet, ResourceKind::Font],
            readiness: ReadinessPolicy::default(),
        }
    }
}

/// Turns a URL into a [`PageSnapshot`]
#[derive(Debug)]
pub struct PageFetcher {
    session: Arc<RenderSession>,
    config: FetcherConfig,
}

impl PageFetcher {
    pub fn new(session: Arc<RenderSession>, config: FetcherConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Render `url` and capture its markup
    ///
    /// The page is closed on every path, including failures.
    pub async fn fetch(
        &self,
        url: &str,
        options: &ExtractionOptions,
    ) -> Result<PageSnapshot, ExtractError> {
        let mut page = self.session.new_page().await?;
        debug!(url, "Page opened");

        let result = self.render(page.as_mut(), url, options).await;

        if let Err(e) = page.close().await {
            warn!(url, error = %e, "Failed to close page");
        }
        result
    }

    async fn render(
        &self,
        page: &mut dyn RenderPage,
        url: &str,
        options: &ExtractionOptions,
    ) -> Result<PageSnapshot, ExtractError> {
        self.configure(page).await?;

        let max_wait = Duration::from_millis(options.max_wait_ms);

        info!(url, "Navigating");
        page.navigate(url, max_wait)
            .await
            .map_err(|e| e.into_navigation(url))?;

        if let Some(ref selector) = options.wait_for_selector {
            match page.wait_for(selector, max_wait).await {
                Ok(()) => debug!(url, selector = %selector, "Selector found"),
                Err(e) => {
                    warn!(url, selector = %selector, error = %e, "Selector not found, continuing")
                }
            }
        }

        self.settle(page, url).await;

        let raw_html = page.html().await.map_err(|e| e.into_navigation(url))?;
        let user_agent = match page.evaluate("navigator.userAgent").await {
            Ok(serde_json::Value::String(ua)) => ua,
            Ok(_) | Err(_) => self.config.user_agent.clone(),
        };

        Ok(PageSnapshot {
            url: url.to_string(),
            title: crate::extract::page_title(&raw_html),
            raw_html,
            user_agent,
            rendered_at: Utc::now(),
        })
    }

    async fn configure(&self, page: &mut dyn RenderPage) -> Result<(), ExtractError> {
        let blocked: Vec<ResourceKind> = self
            .config
            .blocked_resources
            .iter()
            .copied()
            .filter(|kind| {
                let ok = kind.is_blockable();
                if !ok {
                    warn!(?kind, "Ignoring request to block a required resource type");
                }
                ok
            })
            .collect();

        page.set_viewport(self.config.viewport)
            .await
            .map_err(page_setup_error)?;
        page.set_user_agent(&self.config.user_agent)
            .await
            .map_err(page_setup_error)?;
        page.block_resources(&blocked)
            .await
            .map_err(page_setup_error)?;
        Ok(())
    }

    async fn settle(&self, page: &mut dyn RenderPage, url: &str) {
        match self.config.readiness {
            ReadinessPolicy::FixedDelay(delay) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            ReadinessPolicy::DocumentReady {
                timeout,
                poll_interval,
            } => {
                let deadline = tokio::time::Instant::now() + timeout;
                loop {
                    match page.evaluate("document.readyState").await {
                        Ok(serde_json::Value::String(state)) if state == "complete" => return,
                        Ok(_) => {}
                        Err(e) => {
                            debug!(url, error = %e, "Readiness probe failed");
                            return;
                        }
                    }
                    if tokio::time::Instant::now() >= deadline {
                        warn!(url, "Document not ready before deadline, extracting anyway");
                        return;
                    }
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}

fn page_setup_error(err: RenderError) -> ExtractError {
    ExtractError::Initialization(format!("could not configure page: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::LaunchConfig;
    use crate::session::testing::FakeBackend;
    use std::sync::atomic::Ordering;

    const PAGE: &str = r#"<html><head><title>Fake Page</title></head><body><div id="app">Loaded</div></body></html>"#;

    async fn fetcher(backend: FakeBackend, config: FetcherConfig) -> PageFetcher {
        let session = Arc::new(RenderSession::new(
            Arc::new(backend),
            LaunchConfig::default(),
        ));
        session.ensure_started().await.unwrap();
        PageFetcher::new(session, config)
    }

    fn fast_config() -> FetcherConfig {
        FetcherConfig {
            readiness: ReadinessPolicy::FixedDelay(Duration::ZERO),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let backend = FakeBackend::with_page("https://example.com/", PAGE);
        let stats = Arc::clone(&backend.stats);
        let fetcher = fetcher(backend, fast_config()).await;

        let snapshot = fetcher
            .fetch("https://example.com/", &ExtractionOptions::default())
            .await
            .unwrap();

        assert_eq!(snapshot.url, "https://example.com/");
        assert_eq!(snapshot.title, "Fake Page");
        assert!(snapshot.raw_html.contains("Loaded"));
        assert_eq!(snapshot.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(stats.pages_opened.load(Ordering::SeqCst), 1);
        assert_eq!(stats.pages_closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            *stats.blocked.lock().unwrap(),
            vec![ResourceKind::Stylesheet, ResourceKind::Font]
        );
    }

    #[tokio::test]
    async fn test_navigation_failure_closes_page() {
        let backend = FakeBackend::default();
        let stats = Arc::clone(&backend.stats);
        let fetcher = fetcher(backend, fast_config()).await;

        let result = fetcher
            .fetch("https://unreachable.invalid/", &ExtractionOptions::default())
            .await;

        assert!(matches!(result, Err(ExtractError::Navigation { ref url, .. }) if url == "https://unreachable.invalid/"));
        assert_eq!(stats.pages_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_for_miss_is_soft() {
        let backend = FakeBackend::with_page("https://example.com/", PAGE);
        let fetcher = fetcher(backend, fast_config()).await;

        let options = ExtractionOptions::new().wait_for("#never-rendered").max_wait(50);
        let snapshot = fetcher.fetch("https://example.com/", &options).await.unwrap();
        assert!(snapshot.raw_html.contains("Loaded"));
    }

    #[tokio::test]
    async fn test_required_resources_never_blocked() {
        let backend = FakeBackend::with_page("https://example.com/", PAGE);
        let stats = Arc::clone(&backend.stats);
        let config = FetcherConfig {
            blocked_resources: vec![ResourceKind::Script, ResourceKind::Font, ResourceKind::Document],
            ..fast_config()
        };
        let fetcher = fetcher(backend, config).await;

        fetcher
            .fetch("https://example.com/", &ExtractionOptions::default())
            .await
            .unwrap();
        assert_eq!(*stats.blocked.lock().unwrap(), vec![ResourceKind::Font]);
    }

    #[tokio::test]
    async fn test_document_ready_policy() {
        let backend = FakeBackend::with_page("https://example.com/", PAGE);
        let config = FetcherConfig {
            readiness: ReadinessPolicy::DocumentReady {
                timeout: Duration::from_secs(1),
                poll_interval: Duration::from_millis(10),
            },
            ..Default::default()
        };
        let fetcher = fetcher(backend, config).await;

        let snapshot = fetcher
            .fetch("https://example.com/", &ExtractionOptions::default())
            .await
            .unwrap();
        assert_eq!(snapshot.title, "Fake Page");
    }

    #[tokio::test]
    async fn test_fetch_without_started_session() {
        let session = Arc::new(RenderSession::new(
            Arc::new(FakeBackend::default()),
            LaunchConfig::default(),
        ));
        let fetcher = PageFetcher::new(session, fast_config());
        let result = fetcher
            .fetch("https://example.com/", &ExtractionOptions::default())
            .await;
        assert!(matches!(result, Err(ExtractError::Initialization(_))));
    }
}
