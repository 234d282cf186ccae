//! Renderer capability
//!
//! Design: the extraction pipeline never talks to a browser directly. It drives
//! a [`RenderBackend`], which launches a [`Browser`], which opens
//! [`RenderPage`]s. Pages are exclusively owned by one extraction call and
//! consumed by [`RenderPage::close`].

#[cfg(feature = "chromium")]
mod chromium;
mod http;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumBackend;
pub use http::HttpBackend;

use crate::error::RenderError;
use async_trait::async_trait;
use std::time::Duration;

/// Sub-resource categories a page may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Font,
    Image,
    Media,
    Script,
    Xhr,
    Fetch,
    Other,
}

impl ResourceKind {
    /// Whether requests of this kind may be aborted
    ///
    /// Extraction reads the DOM after scripts ran, so documents, scripts and
    /// data requests always load.
    pub fn is_blockable(self) -> bool {
        !matches!(
            self,
            ResourceKind::Document | ResourceKind::Script | ResourceKind::Xhr | ResourceKind::Fetch
        )
    }
}

/// Fixed renderer process configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub headless: bool,
    /// Disable the renderer sandbox (needed inside most containers)
    pub no_sandbox: bool,
    pub disable_gpu: bool,
    /// Extra command line arguments passed to the renderer process
    pub args: Vec<String>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: true,
            disable_gpu: true,
            args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--disable-accelerated-2d-canvas".to_string(),
                "--no-first-run".to_string(),
                "--no-zygote".to_string(),
            ],
        }
    }
}

/// Page viewport in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Something that can start a renderer process
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Unique identifier for this backend (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Start a renderer with the given configuration
    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn Browser>, RenderError>;
}

/// A running renderer process
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh page
    async fn new_page(&self) -> Result<Box<dyn RenderPage>, RenderError>;

    /// Close all pages and stop the process
    async fn close(&self) -> Result<(), RenderError>;
}

/// A single page (tab) of a running renderer
#[async_trait]
pub trait RenderPage: Send {
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError>;

    /// Abort requests for the given resource kinds before they complete
    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<(), RenderError>;

    /// Navigate and wait for the document to load
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Wait until an element matches `selector`
    ///
    /// Returns [`RenderError::Timeout`] when nothing matched in time.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Evaluate a script in the page and return its JSON value
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, RenderError>;

    /// Current rendered markup
    async fn html(&mut self) -> Result<String, RenderError>;

    /// Release the page
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockable_resource_kinds() {
        assert!(ResourceKind::Stylesheet.is_blockable());
        assert!(ResourceKind::Font.is_blockable());
        assert!(ResourceKind::Image.is_blockable());
        assert!(!ResourceKind::Document.is_blockable());
        assert!(!ResourceKind::Script.is_blockable());
        assert!(!ResourceKind::Xhr.is_blockable());
        assert!(!ResourceKind::Fetch.is_blockable());
    }

    #[test]
    fn test_launch_config_default() {
        let config = LaunchConfig::default();
        assert!(config.headless);
        assert!(config.no_sandbox);
        assert!(config.disable_gpu);
        assert!(config.args.iter().any(|a| a == "--disable-dev-shm-usage"));
    }

    #[test]
    fn test_viewport_default() {
        assert_eq!(
            Viewport::default(),
            Viewport {
                width: 1920,
                height: 1080
            }
        );
    }
}
