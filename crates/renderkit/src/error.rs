//! Error types for renderkit

use thiserror::Error;

/// Errors that fail an extraction call
///
/// Only these surface to callers. Soft selector misses, missing documentation
/// sections and formatting problems are absorbed and logged instead.
/// [`MissingUrl`](Self::MissingUrl) and
/// [`InvalidUrlScheme`](Self::InvalidUrlScheme) are input validation errors,
/// raised before the renderer is started.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Renderer failed to launch or a page could not be created
    #[error("Renderer initialization failed: {0}")]
    Initialization(String),

    /// Target unreachable or navigation timed out
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
}

/// Errors raised by a renderer backend
#[derive(Debug, Error)]
pub enum RenderError {
    /// Renderer process could not be started
    #[error("failed to launch renderer: {0}")]
    Launch(String),

    /// Page could not be created or configured
    #[error("page error: {0}")]
    Page(String),

    /// Navigation failed before the document loaded
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// An operation exceeded its deadline
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Script evaluation failed or is not supported by the backend
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// Renderer or page already closed
    #[error("renderer closed")]
    Closed,
}

impl RenderError {
    /// Convert a page-level failure during navigation into an extraction error
    pub fn into_navigation(self, url: &str) -> ExtractError {
        ExtractError::Navigation {
            url: url.to_string(),
            reason: self.to_string(),
        }
    }
}

impl From<RenderError> for ExtractError {
    fn from(err: RenderError) -> Self {
        ExtractError::Initialization(err.to_string())
    }
}

/// Errors raised by a downstream document sink
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Request could not be sent
    #[error("Delivery request failed: {0}")]
    Request(String),

    /// Sink answered with a non-success status
    #[error("Delivery rejected with status {0}")]
    Status(u16),
}
