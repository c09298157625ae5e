//! Category listing crawl: walks the site's search results page by page and
//! collects product links for the scrape stage.

use crate::config::{CrawlConfig, SelectorConfig};
use crate::fetch::{FetchError, PageFetcher};
use crate::parse::{compile, ParseError};
use crate::pool::map_bounded;
use crate::product::Product;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Results per page baked into the encoded search criteria.
const CRITERIA_RESULTS_PER_PAGE: u32 = 48;
const NIL_PROMOTION_ID: &str = "00000000-0000-0000-0000-000000000000";
const SORT_BY: &str = "3";
const DISPLAY_MODE: &str = "list";

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Selector(#[from] ParseError),

    #[error("listing page {page} failed: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchCriteria<'a> {
    quick_search_string: Option<&'a str>,
    keyword: Option<&'a str>,
    brand: Option<&'a str>,
    category: &'a str,
    supplier: Option<&'a str>,
    search_in: Option<&'a str>,
    criteria: Option<&'a str>,
    page_number_from: u32,
    page_number_to: u32,
    user_result_per_page: u32,
    id_promotion_from: &'a str,
    power_search_filters: &'a str,
}

/// Form fields for one search results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub category_id: String,
    pub page_from: String,
    pub page_to: String,
    pub user_result_per_page: String,
    pub sort_by: String,
    pub display_mode: String,
    pub widget_unique_code: String,
}

impl SearchForm {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("categoryId", self.category_id.clone()),
            ("pageFrom", self.page_from.clone()),
            ("pageTo", self.page_to.clone()),
            ("userResultPerPage", self.user_result_per_page.clone()),
            ("sortBy", self.sort_by.clone()),
            ("displayMode", self.display_mode.clone()),
            ("widgetUniqueCode", self.widget_unique_code.clone()),
        ]
    }
}

/// Build the search form for `page` of a named category (`"cider"`), using
/// the category ids and widget code from `config`.
pub fn build_data_payload(
    config: &CrawlConfig,
    category: &str,
    page: u32,
    page_size: u32,
) -> Result<SearchForm, CrawlError> {
    let category_id = config
        .category_id(category)
        .ok_or_else(|| CrawlError::UnknownCategory(category.to_string()))?;
    Ok(search_form(category_id, page, page_size, &config.widget_unique_code))
}

/// `categoryId` carries the base64 of the compact JSON search criteria.
fn search_form(category_id: &str, page: u32, page_size: u32, widget_unique_code: &str) -> SearchForm {
    let criteria = SearchCriteria {
        quick_search_string: None,
        keyword: None,
        brand: None,
        category: category_id,
        supplier: None,
        search_in: None,
        criteria: None,
        page_number_from: page,
        page_number_to: page,
        user_result_per_page: CRITERIA_RESULTS_PER_PAGE,
        id_promotion_from: NIL_PROMOTION_ID,
        power_search_filters: "",
    };
    // Serializing a struct of strings and integers cannot fail.
    let json = serde_json::to_string(&criteria).unwrap_or_default();

    SearchForm {
        category_id: STANDARD.encode(json),
        page_from: page.to_string(),
        page_to: page.to_string(),
        user_result_per_page: page_size.to_string(),
        sort_by: SORT_BY.to_string(),
        display_mode: DISPLAY_MODE.to_string(),
        widget_unique_code: widget_unique_code.to_string(),
    }
}

/// Pages needed to cover `n_products` at `page_size` per page.
pub fn number_of_pages(n_products: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    n_products.div_ceil(page_size)
}

/// Products and the advertised result count found on one listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub total: Option<usize>,
    pub products: Vec<Product>,
}

pub struct ListingExtractor {
    link: Selector,
    total: Selector,
    base: Url,
}

impl ListingExtractor {
    pub fn new(selectors: &SelectorConfig, base_url: &str) -> Result<Self, CrawlError> {
        let base = Url::parse(base_url).map_err(|source| CrawlError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            link: compile("listing_link", &selectors.listing_link)?,
            total: compile("listing_total", &selectors.listing_total)?,
            base,
        })
    }

    pub fn extract(&self, html: &str) -> ListingPage {
        let doc = Html::parse_document(html);

        let total = doc
            .select(&self.total)
            .find_map(|el| first_number(&el.text().collect::<String>()));

        let products = doc
            .select(&self.link)
            .filter_map(|el| {
                let href = el.value().attr("href")?;
                let url = self.base.join(href.trim()).ok()?;
                let name = el.text().collect::<Vec<_>>().join(" ");
                let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
                Some(Product::new(name, url.to_string()))
            })
            .collect();

        ListingPage { total, products }
    }
}

/// "1,234 results" -> 1234
fn first_number(text: &str) -> Option<usize> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[derive(Debug)]
pub struct CrawlReport {
    /// Unique by URL, in page order.
    pub products: Vec<Product>,
    pub pages: usize,
    pub failed_pages: Vec<u32>,
}

pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<ListingExtractor>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        config: &CrawlConfig,
        selectors: &SelectorConfig,
    ) -> Result<Self, CrawlError> {
        Ok(Self {
            fetcher,
            extractor: Arc::new(ListingExtractor::new(selectors, &config.base_url)?),
            config: config.clone(),
        })
    }

    async fn fetch_listing(
        fetcher: &dyn PageFetcher,
        extractor: &ListingExtractor,
        endpoint: &str,
        form: SearchForm,
        page: u32,
    ) -> Result<ListingPage, CrawlError> {
        let body = fetcher
            .post_form(endpoint, &form.to_pairs())
            .await
            .map_err(|source| CrawlError::Fetch { page, source })?;
        Ok(extractor.extract(&body))
    }

    /// Crawl every results page of `category`. The first page is required;
    /// later pages run on `workers` concurrent tasks and are skipped (and
    /// reported) when they fail.
    pub async fn crawl(&self, category: &str, workers: usize) -> Result<CrawlReport, CrawlError> {
        let category_id = self
            .config
            .category_id(category)
            .ok_or_else(|| CrawlError::UnknownCategory(category.to_string()))?
            .to_string();
        let page_size = self.config.page_size.max(1);

        let form_for = |page| search_form(&category_id, page, page_size, &self.config.widget_unique_code);

        let first = Self::fetch_listing(
            self.fetcher.as_ref(),
            &self.extractor,
            &self.config.endpoint,
            form_for(1),
            1,
        )
        .await?;
        let total = first.total.unwrap_or(first.products.len());
        let pages = number_of_pages(total, page_size as usize).max(1);
        tracing::info!(category, total, pages, "crawling category");

        let rest: Vec<(u32, SearchForm)> = (2..=pages as u32).map(|p| (p, form_for(p))).collect();
        let results = map_bounded(rest.clone(), workers, |(page, form)| {
            let fetcher = Arc::clone(&self.fetcher);
            let extractor = Arc::clone(&self.extractor);
            let endpoint = self.config.endpoint.clone();
            async move { Self::fetch_listing(fetcher.as_ref(), &extractor, &endpoint, form, page).await }
        })
        .await;

        let mut seen = HashSet::new();
        let mut products = Vec::new();
        let mut failed_pages = Vec::new();
        let mut collect = |page: ListingPage| {
            for product in page.products {
                if seen.insert(product.url.clone()) {
                    products.push(product);
                }
            }
        };

        collect(first);
        for ((page, _), result) in rest.into_iter().zip(results) {
            match result {
                Ok(Ok(listing)) => collect(listing),
                Ok(Err(e)) => {
                    tracing::warn!(page, error = %e, "listing page failed");
                    failed_pages.push(page);
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "listing worker aborted");
                    failed_pages.push(page);
                }
            }
        }

        tracing::info!(category, found = products.len(), failed = failed_pages.len(), "crawl finished");
        Ok(CrawlReport { products, pages, failed_pages })
    }
}
