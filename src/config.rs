use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Size of the enrichment worker pool.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_timeout_ms() -> u64 { 15_000 }
fn default_max_workers() -> usize { crate::enrich::DEFAULT_WORKERS }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            max_workers: default_max_workers(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_file() -> String { "anbl-scraper.log".to_string() }
fn default_log_filter() -> String { "anbl_scraper=info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

/// CSS selectors used to pull metadata out of product and listing pages.
/// Fields missing from the file fall back to the built-in selectors.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorConfig {
    pub sku: String,
    pub price: String,
    pub volume: String,
    pub abv: String,
    pub country: String,
    pub category: String,
    pub availability: String,
    pub listing_link: String,
    pub listing_total: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            sku: ".product-sku, [itemprop=sku]".to_string(),
            price: ".product-price .price, [itemprop=price]".to_string(),
            volume: ".product-volume, .product-size".to_string(),
            abv: ".product-alcohol, .product-abv".to_string(),
            country: ".product-country, .product-origin".to_string(),
            category: ".breadcrumb li:last-child, .product-category".to_string(),
            availability: ".product-availability, .stock-status".to_string(),
            listing_link: "a.product-name, .product-item a.product-link".to_string(),
            listing_total: ".search-result-count, .product-count".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CrawlConfig {
    /// Base for resolving relative product links.
    pub base_url: String,
    /// Search form endpoint (POST).
    pub endpoint: String,
    pub widget_unique_code: String,
    pub page_size: u32,
    /// Category name -> site category id.
    pub categories: HashMap<String, String>,
}

pub const CIDER_CATEGORY_ID: &str = "2e3ca746-9a93-4135-a601-ea17d291a420";
pub const WIDGET_UNIQUE_CODE: &str =
    "SdWlppw1TpFAaFHqsHbZSrnkUDJdN0iIBCSwZrYRytezwBKq8yus4ZC+KiG/Jo/v";

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.anbl.com".to_string(),
            endpoint: "https://www.anbl.com/product/search".to_string(),
            widget_unique_code: WIDGET_UNIQUE_CODE.to_string(),
            page_size: 48,
            categories: HashMap::from([("cider".to_string(), CIDER_CATEGORY_ID.to_string())]),
        }
    }
}

impl CrawlConfig {
    /// Category id for a configured category name (case-insensitive).
    pub fn category_id(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_ascii_lowercase();
        self.categories
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == wanted)
            .map(|(_, v)| v.as_str())
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))?;
        Ok(config)
    }

    /// An explicit path must exist. Without one, `config.toml` in the working
    /// directory is used when present, otherwise the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }
}
