//! Bounded-concurrency enrichment of product records.

use crate::fetch::{FetchError, PageFetcher};
use crate::parse::{MetadataExtractor, ParseError};
use crate::pool::map_bounded;
use crate::product::Product;
use indicatif::ProgressBar;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 20;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("worker for {url} aborted: {reason}")]
    Aborted { url: String, reason: String },
}

/// A product that kept its empty metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichFailure {
    pub index: usize,
    pub url: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct EnrichReport {
    /// Same length and order as the input.
    pub products: Vec<Product>,
    pub failures: Vec<EnrichFailure>,
}

impl EnrichReport {
    pub fn enriched_count(&self) -> usize {
        self.products.len() - self.failures.len()
    }
}

#[derive(Clone)]
pub struct Enricher {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<MetadataExtractor>,
}

impl Enricher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, extractor: MetadataExtractor) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(extractor),
        }
    }

    /// Fetch one product page and return an enriched copy of `product`.
    pub async fn enrich(&self, product: &Product) -> Result<Product, EnrichError> {
        let html = self.fetcher.fetch_page(&product.url).await?;
        let metadata = self
            .extractor
            .extract(&html)
            .map_err(|source| EnrichError::Parse { url: product.url.clone(), source })?;
        Ok(product.clone().with_metadata(metadata))
    }

    /// [`Self::enrich_all_with_progress`] without a visible bar.
    pub async fn enrich_all(&self, products: Vec<Product>, workers: usize) -> EnrichReport {
        self.enrich_all_with_progress(products, workers, &ProgressBar::hidden())
            .await
    }

    /// Enrich every product on at most `workers` concurrent tasks, ticking
    /// `progress` once per finished item.
    ///
    /// All items are submitted at once; the semaphore is the only limit on
    /// outstanding requests. Each result is written back to the slot of its
    /// input index, so completion order never leaks into the output. A failed
    /// item keeps its input record and is listed in `failures`.
    pub async fn enrich_all_with_progress(
        &self,
        products: Vec<Product>,
        workers: usize,
        progress: &ProgressBar,
    ) -> EnrichReport {
        tracing::info!(count = products.len(), workers = workers.max(1), "starting enrichment");

        let results = map_bounded(products.clone(), workers, |product| {
            let enricher = self.clone();
            let progress = progress.clone();
            async move {
                let result = enricher.enrich(&product).await;
                progress.inc(1);
                result
            }
        })
        .await;

        let mut failures = Vec::new();
        let products = products
            .into_iter()
            .zip(results)
            .enumerate()
            .map(|(index, (original, result))| {
                let error = match result {
                    Ok(Ok(enriched)) => return enriched,
                    Ok(Err(e)) => e,
                    Err(join_err) => {
                        // The task died before it could tick.
                        progress.inc(1);
                        EnrichError::Aborted {
                            url: original.url.clone(),
                            reason: join_err.to_string(),
                        }
                    }
                };
                tracing::warn!(index, url = %original.url, error = %error, "enrichment failed");
                failures.push(EnrichFailure {
                    index,
                    url: original.url.clone(),
                    reason: error.to_string(),
                });
                original
            })
            .collect();

        let report = EnrichReport { products, failures };
        tracing::info!(
            enriched = report.enriched_count(),
            failed = report.failures.len(),
            "enrichment finished"
        );
        report
    }
}
