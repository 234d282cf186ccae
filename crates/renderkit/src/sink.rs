//! Downstream delivery of extracted documents
//!
//! Delivery is best effort: the extractor hands each document to the sink in
//! a background task and only logs failures.

use crate::error::DeliveryError;
use crate::types::ExtractedDocument;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Timeout for a single delivery request
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Path appended to the service base URL
const EMBEDDINGS_PATH: &str = "/embeddings";

/// Receiver of extracted documents
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Sink name for diagnostics
    fn name(&self) -> &'static str;

    /// Hand one document to the sink
    async fn deliver(&self, document: &ExtractedDocument) -> Result<(), DeliveryError>;
}

/// Posts documents as JSON to an embeddings service
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    /// Sink for the service at `base_url`
    pub fn new(base_url: &str) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}{EMBEDDINGS_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, document: &ExtractedDocument) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(document)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        debug!(url = %document.url, endpoint = %self.endpoint, "Document delivered");
        Ok(())
    }
}
