use anbl_scraper::config::Config;
use anbl_scraper::enrich::Enricher;
use anbl_scraper::fetch::http::HttpFetcher;
use anbl_scraper::listing;
use anbl_scraper::logging;
use anbl_scraper::parse::MetadataExtractor;
use anbl_scraper::pipeline::{self, ScrapeParams};
use anbl_scraper::product::LISTING_TYPE_SCRAPE;
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

/// Using ANBL URLs obtained from a CSV generated by anbl-crawl, fetch each
/// webpage and extract relevant metadata. Prints metadata to a new CSV.
#[derive(Parser, Debug)]
#[command(name = "anbl-scrape", version, after_help = "Enjoy responsibly.")]
struct Args {
    /// Path to file containing product names and URLs.
    #[arg(short, long)]
    input: PathBuf,

    /// Path to output file or directory.
    #[arg(short, long, default_value = "~/Downloads")]
    output_path: String,

    /// If provided, scrape only the first N items from the CSV.
    #[arg(short = 'n', long)]
    sample_size: Option<usize>,

    /// Get a bit silly with things.
    #[arg(short, long)]
    silly: bool,

    /// Concurrent fetches (defaults to the configured pool size).
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

    println!();
    println!("  ANBL Scraper v{}", env!("CARGO_PKG_VERSION"));
    println!("  ==================");
    println!();
    println!("  Running with args: {:?}", args);

    let output = listing::resolve_output_path(
        &args.output_path,
        LISTING_TYPE_SCRAPE,
        chrono::Local::now().naive_local(),
    );
    let params = ScrapeParams {
        input: args.input,
        output,
        workers: args.max_workers.unwrap_or(config.http.max_workers),
        sample_size: args.sample_size,
        silly: args.silly,
    };

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let extractor = MetadataExtractor::new(&config.selectors).context("invalid selector configuration")?;
    let enricher = Enricher::new(fetcher, extractor);

    let progress = ProgressBar::no_length().with_style(
        ProgressStyle::with_template("  {msg}\n  [{elapsed_precise}] {bar:40} {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    let summary = pipeline::scrape(&params, &enricher, &progress)
        .await
        .context("scrape failed")?;
    progress.finish();

    println!(
        "  Wrote {} products to {} ({} without metadata).",
        summary.written,
        summary.output.display(),
        summary.failures.len()
    );
    Ok(())
}
