//! Bounded-concurrency extraction across many URLs
//!
//! URLs are processed in waves of at most `concurrency` items. A wave runs
//! to completion before the next one starts, with a pause in between.

use crate::error::ExtractError;
use crate::types::{BatchItemResult, BatchOptions, ExtractedDocument};
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wave scheduler for batch extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
    concurrency: usize,
    delay: Duration,
}

impl BatchScheduler {
    /// A concurrency of zero is treated as one
    pub fn new(concurrency: usize, delay: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            delay,
        }
    }

    pub fn from_options(options: &BatchOptions) -> Self {
        Self::new(
            options.concurrency,
            Duration::from_millis(options.inter_batch_delay_ms),
        )
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `extract` for every URL
    ///
    /// The output has one entry per input URL, in input order. A failed URL
    /// becomes a [`BatchItemResult::Failure`] and never affects the others.
    pub async fn run<F, Fut>(&self, urls: &[String], extract: F) -> Vec<BatchItemResult>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<ExtractedDocument, ExtractError>>,
    {
        let waves = urls.len().div_ceil(self.concurrency);
        info!(
            urls = urls.len(),
            concurrency = self.concurrency,
            waves,
            "Starting batch"
        );

        let mut results = Vec::with_capacity(urls.len());
        for (index, wave) in urls.chunks(self.concurrency).enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            debug!(wave = index + 1, size = wave.len(), "Running wave");

            let outcomes = join_all(wave.iter().map(|url| {
                let pending = extract(url.clone());
                async move { (url, pending.await) }
            }))
            .await;

            results.extend(outcomes.into_iter().map(|(url, outcome)| match outcome {
                Ok(doc) => BatchItemResult::Success(Box::new(doc)),
                Err(e) => {
                    warn!(url = %url, error = %e, "Batch item failed");
                    BatchItemResult::Failure {
                        url: url.clone(),
                        error: e.to_string(),
                    }
                }
            }));
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(total = results.len(), failed, "Batch finished");
        results
    }
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::from_options(&BatchOptions::default())
    }
}
