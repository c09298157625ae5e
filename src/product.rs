use serde::Serialize;

/// Provenance tag written to every output row.
pub const LISTING_TYPE_SCRAPE: &str = "scrape";
pub const LISTING_TYPE_CRAWL: &str = "crawl";

/// Fields extracted from a product page. Empty when the fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub sku: Option<String>,
    pub price: Option<String>,
    pub volume: Option<String>,
    pub abv: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub availability: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill fields that are still empty from `other`.
    pub fn or(self, other: Metadata) -> Metadata {
        Metadata {
            sku: self.sku.or(other.sku),
            price: self.price.or(other.price),
            volume: self.volume.or(other.volume),
            abv: self.abv.or(other.abv),
            country: self.country.or(other.country),
            category: self.category.or(other.category),
            availability: self.availability.or(other.availability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub name: String,
    pub url: String,
    pub metadata: Metadata,
}

impl Product {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_metadata(self, metadata: Metadata) -> Self {
        Self { metadata, ..self }
    }

    pub fn to_row<'a>(&'a self, listing_type: &'a str) -> ProductRow<'a> {
        let m = &self.metadata;
        ProductRow {
            name: &self.name,
            url: &self.url,
            sku: m.sku.as_deref().unwrap_or(""),
            price: m.price.as_deref().unwrap_or(""),
            volume: m.volume.as_deref().unwrap_or(""),
            abv: m.abv.as_deref().unwrap_or(""),
            country: m.country.as_deref().unwrap_or(""),
            category: m.category.as_deref().unwrap_or(""),
            availability: m.availability.as_deref().unwrap_or(""),
            listing_type,
        }
    }
}

/// Output row; field order is the CSV column order.
#[derive(Debug, Serialize)]
pub struct ProductRow<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub sku: &'a str,
    pub price: &'a str,
    pub volume: &'a str,
    pub abv: &'a str,
    pub country: &'a str,
    pub category: &'a str,
    pub availability: &'a str,
    pub listing_type: &'a str,
}

pub const OUTPUT_COLUMNS: [&str; 10] = [
    "name",
    "url",
    "sku",
    "price",
    "volume",
    "abv",
    "country",
    "category",
    "availability",
    "listing_type",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_or_prefers_self() {
        let a = Metadata { price: Some("10.00".into()), ..Default::default() };
        let b = Metadata {
            price: Some("99.00".into()),
            sku: Some("123".into()),
            ..Default::default()
        };
        let merged = a.or(b);
        assert_eq!(merged.price.as_deref(), Some("10.00"));
        assert_eq!(merged.sku.as_deref(), Some("123"));
    }

    #[test]
    fn test_row_leaves_missing_fields_blank() {
        let p = Product::new("Cider", "https://example.com/cider");
        let row = p.to_row(LISTING_TYPE_SCRAPE);
        assert_eq!(row.price, "");
        assert_eq!(row.listing_type, "scrape");
    }
}
