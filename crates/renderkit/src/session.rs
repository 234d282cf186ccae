//! Renderer session lifecycle
//!
//! A [`RenderSession`] owns at most one running renderer. It is started lazily,
//! shared by every request, and torn down once by the hosting process.

use crate::error::ExtractError;
use crate::renderer::{Browser, LaunchConfig, RenderBackend, RenderPage};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Owned handle to a shared renderer process
pub struct RenderSession {
    backend: Arc<dyn RenderBackend>,
    config: LaunchConfig,
    browser: Mutex<Option<Arc<dyn Browser>>>,
}

impl RenderSession {
    /// Create an unstarted session
    pub fn new(backend: Arc<dyn RenderBackend>, config: LaunchConfig) -> Self {
        Self {
            backend,
            config,
            browser: Mutex::new(None),
        }
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn is_started(&self) -> bool {
        self.browser.lock().await.is_some()
    }

    /// Start the renderer if it is not running
    ///
    /// Concurrent callers wait for a single launch. A failed launch leaves the
    /// session unstarted, so the next call tries again.
    pub async fn ensure_started(&self) -> Result<(), ExtractError> {
        let mut guard = self.browser.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        info!(backend = self.backend.name(), "Starting renderer");
        let browser = self.backend.launch(&self.config).await.map_err(|e| {
            warn!(backend = self.backend.name(), error = %e, "Renderer failed to start");
            ExtractError::Initialization(e.to_string())
        })?;
        *guard = Some(Arc::from(browser));
        info!(backend = self.backend.name(), "Renderer started");
        Ok(())
    }

    /// Open a fresh page on the running renderer
    pub async fn new_page(&self) -> Result<Box<dyn RenderPage>, ExtractError> {
        let browser = {
            let guard = self.browser.lock().await;
            guard.as_ref().map(Arc::clone).ok_or_else(|| {
                ExtractError::Initialization("renderer session is not started".to_string())
            })?
        };

        browser
            .new_page()
            .await
            .map_err(|e| ExtractError::Initialization(format!("could not open page: {e}")))
    }

    /// Close the renderer; safe to call repeatedly or before any start
    pub async fn shutdown(&self) {
        let browser = self.browser.lock().await.take();
        if let Some(browser) = browser {
            info!(backend = self.backend.name(), "Closing renderer");
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Error while closing renderer");
            }
        }
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
