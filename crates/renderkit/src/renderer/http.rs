//! Plain HTTP renderer
//!
//! Fetches the server-sent markup with reqwest. Scripts are not executed, so
//! this backend suits static pages, tests, and hosts without a browser.

use super::{Browser, LaunchConfig, RenderBackend, RenderPage, ResourceKind, Viewport};
use crate::error::RenderError;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, USER_AGENT};
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Renderer backend that performs a single GET per navigation
#[derive(Debug, Clone, Default)]
pub struct HttpBackend;

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RenderBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn launch(&self, _config: &LaunchConfig) -> Result<Box<dyn Browser>, RenderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        Ok(Box::new(HttpBrowser {
            client,
            closed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct HttpBrowser {
    client: reqwest::Client,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            closed: Arc::clone(&self.closed),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            document: None,
        }))
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct HttpPage {
    client: reqwest::Client,
    closed: Arc<AtomicBool>,
    user_agent: String,
    document: Option<String>,
}

impl HttpPage {
    fn ensure_open(&self) -> Result<(), RenderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RenderError::Closed);
        }
        Ok(())
    }

    fn document(&self) -> Result<&str, RenderError> {
        self.document
            .as_deref()
            .ok_or_else(|| RenderError::Page("no document loaded".to_string()))
    }
}

#[async_trait]
impl RenderPage for HttpPage {
    async fn set_viewport(&mut self, _viewport: Viewport) -> Result<(), RenderError> {
        self.ensure_open()
    }

    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.user_agent = user_agent.to_string();
        Ok(())
    }

    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<(), RenderError> {
        // Sub-resources are never requested, so there is nothing to abort
        debug!(?kinds, "Resource blocking is implicit for the http backend");
        self.ensure_open()
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        self.ensure_open()?;

        let user_agent = HeaderValue::from_str(&self.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml,*/*;q=0.8")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        // Error statuses still render a document, as in a browser
        debug!(url, status = response.status().as_u16(), "Document received");

        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        self.document = Some(body);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        self.ensure_open()?;
        let html = self.document()?;

        // Static markup never changes, so a miss now is a miss at the deadline
        if has_match(html, selector)? {
            Ok(())
        } else {
            Err(RenderError::Timeout(timeout.as_millis() as u64))
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, RenderError> {
        self.ensure_open()?;

        match script.trim().trim_end_matches(';') {
            "navigator.userAgent" => Ok(serde_json::Value::String(self.user_agent.clone())),
            "document.readyState" => {
                let state = if self.document.is_some() {
                    "complete"
                } else {
                    "loading"
                };
                Ok(serde_json::Value::String(state.to_string()))
            }
            "document.title" => {
                let html = self.document()?;
                Ok(serde_json::Value::String(document_title(html)))
            }
            other => Err(RenderError::Script(format!(
                "http backend cannot evaluate `{other}`"
            ))),
        }
    }

    async fn html(&mut self) -> Result<String, RenderError> {
        self.ensure_open()?;
        self.document().map(str::to_string)
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        Ok(())
    }
}

fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> RenderError {
    if err.is_timeout() {
        RenderError::Timeout(timeout.as_millis() as u64)
    } else {
        RenderError::Navigation(err.to_string())
    }
}

fn has_match(html: &str, selector: &str) -> Result<bool, RenderError> {
    let selector = Selector::parse(selector)
        .map_err(|e| RenderError::Page(format!("invalid selector `{selector}`: {e}")))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

fn document_title(html: &str) -> String {
    let document = Html::parse_document(html);
    Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}
