//! End-to-end scrape runs against a stubbed fetcher.

use anbl_scraper::config::SelectorConfig;
use anbl_scraper::enrich::Enricher;
use anbl_scraper::fetch::{FetchError, PageFetcher};
use anbl_scraper::listing::ListingError;
use anbl_scraper::parse::MetadataExtractor;
use anbl_scraper::pipeline::{scrape, ScrapeParams};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed page per URL; anything else is a 404. Counts every call.
struct StubFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or(FetchError::Status { url: url.to_string(), status: 404 })
    }

    async fn post_form(&self, url: &str, _form: &[(&str, String)]) -> Result<String, FetchError> {
        Err(FetchError::Status { url: url.to_string(), status: 405 })
    }
}

fn product_page(price: &str, volume: &str) -> String {
    format!(
        r#"<html><body>
        <div class="product-price"><span class="price">${price}</span></div>
        <span class="product-volume">{volume}</span>
        </body></html>"#
    )
}

fn stub() -> Arc<StubFetcher> {
    Arc::new(StubFetcher {
        pages: HashMap::from([
            ("https://x/a".to_string(), product_page("10.00", "750 mL")),
            ("https://x/b".to_string(), product_page("12.50", "1 L")),
            ("https://x/c".to_string(), product_page("7.25", "355 mL")),
        ]),
        calls: AtomicUsize::new(0),
    })
}

fn enricher(fetcher: Arc<StubFetcher>) -> Enricher {
    let extractor = MetadataExtractor::new(&SelectorConfig::default()).unwrap();
    Enricher::new(fetcher, extractor)
}

fn write_input(dir: &Path, rows: &[(&str, &str)]) -> PathBuf {
    let mut content = String::from("name,url\n");
    for (name, url) in rows {
        content.push_str(&format!("{name},{url}\n"));
    }
    let path = dir.join("input.csv");
    std::fs::write(&path, content).unwrap();
    path
}

fn params(input: PathBuf, output: PathBuf, workers: usize) -> ScrapeParams {
    ScrapeParams {
        input,
        output,
        workers,
        sample_size: None,
        silly: false,
    }
}

const ABC: [(&str, &str); 3] = [("A", "https://x/a"), ("B", "https://x/b"), ("C", "https://x/c")];
const HEADER: &str = "name,url,sku,price,volume,abv,country,category,availability,listing_type";

#[tokio::test]
async fn test_three_rows_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ABC);
    let output = dir.path().join("out.csv");

    let progress = ProgressBar::hidden();
    let summary = scrape(&params(input, output.clone(), 20), &enricher(stub()), &progress).await.unwrap();
    assert_eq!(summary.written, 3);
    assert!(summary.failures.is_empty());
    assert_eq!(progress.length(), Some(3));
    assert_eq!(progress.position(), 3);

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            HEADER,
            "A,https://x/a,,10.00,750 mL,,,,,scrape",
            "B,https://x/b,,12.50,1 L,,,,,scrape",
            "C,https://x/c,,7.25,355 mL,,,,,scrape",
        ]
    );
}

#[tokio::test]
async fn test_sample_size_caps_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ABC);
    let output = dir.path().join("out.csv");
    let fetcher = stub();

    let mut p = params(input, output.clone(), 20);
    p.sample_size = Some(2);
    let summary = scrape(&p, &enricher(Arc::clone(&fetcher)), &ProgressBar::hidden()).await.unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(!content.contains("https://x/c"));
}

#[tokio::test]
async fn test_sample_size_above_count_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ABC);
    let mut p = params(input, dir.path().join("out.csv"), 20);
    p.sample_size = Some(50);
    let summary = scrape(&p, &enricher(stub()), &ProgressBar::hidden()).await.unwrap();
    assert_eq!(summary.written, 3);
}

#[tokio::test]
async fn test_failed_fetch_keeps_row_and_neighbours() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        &[("A", "https://x/a"), ("Gone", "https://x/gone"), ("C", "https://x/c")],
    );
    let output = dir.path().join("out.csv");

    let summary = scrape(&params(input, output.clone(), 20), &enricher(stub()), &ProgressBar::hidden()).await.unwrap();
    assert_eq!(summary.written, 3);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].url, "https://x/gone");

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[1], "A,https://x/a,,10.00,750 mL,,,,,scrape");
    assert_eq!(lines[2], "Gone,https://x/gone,,,,,,,,scrape");
    assert_eq!(lines[3], "C,https://x/c,,7.25,355 mL,,,,,scrape");
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_worker_count_independent() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ABC);
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    scrape(&params(input.clone(), first.clone(), 1), &enricher(stub()), &ProgressBar::hidden()).await.unwrap();
    scrape(&params(input, second.clone(), 20), &enricher(stub()), &ProgressBar::hidden()).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(first).unwrap(),
        std::fs::read_to_string(second).unwrap()
    );
}

#[tokio::test]
async fn test_silly_rewrites_names_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &[("Dry Cider", "https://x/a")]);
    let output = dir.path().join("out.csv");
    let mut p = params(input, output.clone(), 20);
    p.silly = true;

    scrape(&p, &enricher(stub()), &ProgressBar::hidden()).await.unwrap();
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().nth(1), Some("dRy CiDeR,https://x/a,,10.00,750 mL,,,,,scrape"));
}

#[tokio::test]
async fn test_missing_columns_abort_before_any_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.csv");
    std::fs::write(&input, "title,link\nA,https://x/a\n").unwrap();
    let fetcher = stub();

    let err = scrape(&params(input, dir.path().join("out.csv"), 20), &enricher(Arc::clone(&fetcher)), &ProgressBar::hidden())
        .await
        .unwrap_err();
    assert!(matches!(err, ListingError::DataFormat { column: "name", .. }));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_write_error_reported_after_enrichment() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), &ABC);
    // A regular file where the output directory should be.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let fetcher = stub();

    let err = scrape(&params(input, blocker.join("out.csv"), 20), &enricher(Arc::clone(&fetcher)), &ProgressBar::hidden())
        .await
        .unwrap_err();
    assert!(matches!(err, ListingError::Write { .. }));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
}
