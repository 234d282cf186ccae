//! Headless Chromium renderer (chromiumoxide)

use super::{Browser, LaunchConfig, RenderBackend, RenderPage, ResourceKind, Viewport};
use crate::error::RenderError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Interval between selector probes in [`RenderPage::wait_for`]
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Renderer backend driving a local Chromium over CDP
#[derive(Debug, Clone, Default)]
pub struct ChromiumBackend {
    executable: Option<String>,
}

impl ChromiumBackend {
    /// Use the Chromium found on the system
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chromium executable
    pub fn with_executable(path: impl Into<String>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn Browser>, RenderError> {
        let mut builder = BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if config.disable_gpu {
            builder = builder.arg("--disable-gpu");
        }
        for arg in &config.args {
            builder = builder.arg(arg.as_str());
        }
        if let Some(ref path) = self.executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumBrowser {
            browser: Mutex::new(Some(browser)),
            handler_task,
        }))
    }
}

struct ChromiumBrowser {
    browser: Mutex<Option<CdpBrowser>>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or(RenderError::Closed)?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Page(e.to_string()))?;
        Ok(Box::new(ChromiumPage {
            page,
            interceptor: None,
        }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            browser
                .close()
                .await
                .map_err(|e| RenderError::Page(e.to_string()))?;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Renderer process did not exit cleanly");
            }
        }
        self.handler_task.abort();
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
    interceptor: Option<JoinHandle<()>>,
}

fn resource_type(kind: ResourceKind) -> ResourceType {
    match kind {
        ResourceKind::Document => ResourceType::Document,
        ResourceKind::Stylesheet => ResourceType::Stylesheet,
        ResourceKind::Font => ResourceType::Font,
        ResourceKind::Image => ResourceType::Image,
        ResourceKind::Media => ResourceType::Media,
        ResourceKind::Script => ResourceType::Script,
        ResourceKind::Xhr => ResourceType::Xhr,
        ResourceKind::Fetch => ResourceType::Fetch,
        ResourceKind::Other => ResourceType::Other,
    }
}

fn page_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Page(err.to_string())
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        let params = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        );
        self.page.execute(params).await.map_err(page_error)?;
        Ok(())
    }

    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.page
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(page_error)?;
        Ok(())
    }

    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<(), RenderError> {
        if kinds.is_empty() {
            return Ok(());
        }

        // Only the blocked types are paused, everything else loads untouched
        let patterns: Vec<RequestPattern> = kinds
            .iter()
            .map(|kind| {
                RequestPattern::builder()
                    .resource_type(resource_type(*kind))
                    .build()
            })
            .collect();

        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(page_error)?;
        self.page
            .execute(EnableParams::builder().patterns(patterns).build())
            .await
            .map_err(page_error)?;

        let page = self.page.clone();
        self.interceptor = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let abort = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
                if let Err(e) = page.execute(abort).await {
                    debug!(error = %e, "Failed to abort blocked request");
                }
            }
        }));
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation(e.to_string())),
            Err(_) => Err(RenderError::Timeout(timeout.as_millis() as u64)),
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RenderError::Timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, RenderError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn html(&mut self) -> Result<String, RenderError> {
        self.page.content().await.map_err(page_error)
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let ChromiumPage { page, interceptor } = *self;
        if let Some(task) = interceptor {
            task.abort();
        }
        page.close().await.map_err(page_error)
    }
}
