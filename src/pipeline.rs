//! Scrape run: Load -> Enrich (parallel) -> [Transform] -> Write.

use crate::enrich::{EnrichFailure, Enricher};
use crate::listing::{self, ListingError};
use crate::product::LISTING_TYPE_SCRAPE;
use crate::transform::{Sillify, Transform};
use indicatif::ProgressBar;
use std::path::PathBuf;

/// Parameters of one scrape invocation.
#[derive(Debug, Clone)]
pub struct ScrapeParams {
    pub input: PathBuf,
    /// Output file, already resolved.
    pub output: PathBuf,
    pub workers: usize,
    pub sample_size: Option<usize>,
    pub silly: bool,
}

#[derive(Debug)]
pub struct ScrapeSummary {
    pub output: PathBuf,
    pub written: usize,
    pub failures: Vec<EnrichFailure>,
}

/// Load errors abort before any fetch; per-product failures are reported in
/// the summary; a write error is returned after enrichment has finished.
///
/// `progress` gets its length and message once the input is loaded and
/// advances once per product. Pass [`ProgressBar::hidden`] for no output.
pub async fn scrape(
    params: &ScrapeParams,
    enricher: &Enricher,
    progress: &ProgressBar,
) -> Result<ScrapeSummary, ListingError> {
    let products = listing::read_products(&params.input)?;
    let products = listing::take_sample(products, params.sample_size);

    progress.set_length(products.len() as u64);
    progress.set_message(format!("Scraping metadata for {} products", products.len()));
    let report = enricher
        .enrich_all_with_progress(products, params.workers, progress)
        .await;

    let products = if params.silly {
        Sillify.apply_all(report.products)
    } else {
        report.products
    };

    listing::write_products(&params.output, &products, LISTING_TYPE_SCRAPE)?;

    Ok(ScrapeSummary {
        output: params.output.clone(),
        written: products.len(),
        failures: report.failures,
    })
}
