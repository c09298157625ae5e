//! Product-link CSV files: reading the crawl output and writing enriched rows.

use crate::product::{Product, OUTPUT_COLUMNS};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("failed to read listing file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("listing file {} is missing required column '{column}'", path.display())]
    DataFormat { path: PathBuf, column: &'static str },

    #[error("malformed row at line {line} of {}: {source}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write listing file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Read `name`/`url` pairs from a CSV file. Header names are matched
/// case-insensitively; extra columns are ignored.
pub fn read_products(path: &Path) -> Result<Vec<Product>, ListingError> {
    let read_err = |source| ListingError::Read { path: path.to_path_buf(), source };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    let headers = reader.headers().map_err(read_err)?.clone();

    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
            .ok_or(ListingError::DataFormat { path: path.to_path_buf(), column: name })
    };
    let name_idx = column("name")?;
    let url_idx = column("url")?;

    let mut products = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| ListingError::MalformedRow {
            path: path.to_path_buf(),
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        let name = record.get(name_idx).unwrap_or_default().trim();
        let url = record.get(url_idx).unwrap_or_default().trim();
        products.push(Product::new(name, url));
    }

    tracing::info!(path = %path.display(), count = products.len(), "loaded product links");
    Ok(products)
}

/// Keep the first `sample_size` products. A cap at or above the count is a no-op.
pub fn take_sample(mut products: Vec<Product>, sample_size: Option<usize>) -> Vec<Product> {
    if let Some(n) = sample_size {
        if n < products.len() {
            products.truncate(n);
        }
    }
    products
}

/// Write one row per product, tagged with `listing_type`. The header row is
/// always written, even for an empty list.
pub fn write_products(
    path: &Path,
    products: &[Product],
    listing_type: &str,
) -> Result<(), ListingError> {
    let write_err = |source| ListingError::Write { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.into()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_err)?;
    writer.write_record(OUTPUT_COLUMNS).map_err(write_err)?;
    for product in products {
        writer.serialize(product.to_row(listing_type)).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;

    tracing::info!(path = %path.display(), count = products.len(), listing_type, "wrote listing file");
    Ok(())
}

/// Expand `~`, and turn a directory target into a timestamped file name.
/// Paths ending in `.csv` are taken as the output file itself.
pub fn resolve_output_path(raw: &str, listing_type: &str, now: NaiveDateTime) -> PathBuf {
    let path = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(format!("{}{}", std::env::var("HOME").unwrap_or_default(), rest))
        }
        // `~user` forms are left alone.
        _ => PathBuf::from(raw),
    };

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        path
    } else {
        path.join(format!("anbl_{}_{}.csv", listing_type, now.format("%Y%m%d_%H%M%S")))
    }
}
