use anbl_scraper::config::Config;
use anbl_scraper::crawl::Crawler;
use anbl_scraper::fetch::http::HttpFetcher;
use anbl_scraper::listing;
use anbl_scraper::logging;
use anbl_scraper::product::LISTING_TYPE_CRAWL;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// Walk the ANBL search results for a category and write every product name
/// and URL to a CSV for anbl-scrape.
#[derive(Parser, Debug)]
#[command(name = "anbl-crawl", version, after_help = "Enjoy responsibly.")]
struct Args {
    /// Category name from the `[crawl.categories]` table, e.g. "cider".
    #[arg(long)]
    category: String,

    /// Path to output file or directory.
    #[arg(short, long, default_value = "~/Downloads")]
    output_path: String,

    /// Concurrent page fetches (defaults to the configured pool size).
    #[arg(short = 'w', long)]
    max_workers: Option<usize>,

    /// TOML configuration file.
    #[arg(short, long, env = "ANBL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(args.config.as_deref())?;
    logging::init(&config.logging)?;

    println!("  Running with args: {:?}", args);

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let crawler = Crawler::new(fetcher, &config.crawl, &config.selectors)?;
    let workers = args.max_workers.unwrap_or(config.http.max_workers);

    let report = crawler
        .crawl(&args.category, workers)
        .await
        .with_context(|| format!("crawl of '{}' failed", args.category))?;

    let output = listing::resolve_output_path(
        &args.output_path,
        LISTING_TYPE_CRAWL,
        chrono::Local::now().naive_local(),
    );
    listing::write_products(&output, &report.products, LISTING_TYPE_CRAWL)?;

    println!(
        "  Found {} products across {} pages ({} pages failed). Wrote {}.",
        report.products.len(),
        report.pages,
        report.failed_pages.len(),
        output.display()
    );
    Ok(())
}
