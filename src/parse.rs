//! Product page metadata extraction.
//!
//! schema.org `Product` blocks embedded as JSON-LD are read first; the
//! configured CSS selectors fill whatever the structured data leaves empty.

use crate::config::SelectorConfig;
use crate::product::Metadata;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid CSS selector for {field}: {selector} - {reason}")]
    InvalidSelector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("no product metadata found in page")]
    NoMetadata,
}

pub(crate) fn compile(field: &'static str, selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub struct MetadataExtractor {
    json_ld: Selector,
    sku: Selector,
    price: Selector,
    volume: Selector,
    abv: Selector,
    country: Selector,
    category: Selector,
    availability: Selector,
}

impl MetadataExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ParseError> {
        Ok(Self {
            json_ld: compile("json_ld", r#"script[type="application/ld+json"]"#)?,
            sku: compile("sku", &selectors.sku)?,
            price: compile("price", &selectors.price)?,
            volume: compile("volume", &selectors.volume)?,
            abv: compile("abv", &selectors.abv)?,
            country: compile("country", &selectors.country)?,
            category: compile("category", &selectors.category)?,
            availability: compile("availability", &selectors.availability)?,
        })
    }

    pub fn extract(&self, html: &str) -> Result<Metadata, ParseError> {
        let doc = Html::parse_document(html);

        let structured = self.structured_metadata(&doc);
        let selected = Metadata {
            sku: first_text(&doc, &self.sku),
            price: first_text(&doc, &self.price),
            volume: first_text(&doc, &self.volume),
            abv: first_text(&doc, &self.abv),
            country: first_text(&doc, &self.country),
            category: first_text(&doc, &self.category),
            availability: first_text(&doc, &self.availability),
        };

        let mut metadata = structured.or(selected);
        metadata.price = metadata.price.as_deref().and_then(normalize_price);
        metadata.availability = metadata.availability.as_deref().map(normalize_availability);

        if metadata.is_empty() {
            return Err(ParseError::NoMetadata);
        }
        Ok(metadata)
    }

    fn structured_metadata(&self, doc: &Html) -> Metadata {
        doc.select(&self.json_ld)
            .filter_map(|script| serde_json::from_str::<Value>(&script.text().collect::<String>()).ok())
            .find_map(|value| find_product(&value).map(product_metadata))
            .unwrap_or_default()
    }
}

/// Text of the first matching element that has any. A `content` attribute
/// (microdata) wins over the element text.
fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector).find_map(element_text)
}

fn element_text(el: ElementRef<'_>) -> Option<String> {
    let raw = match el.value().attr("content") {
        Some(content) => content.to_string(),
        None => el.text().collect::<Vec<_>>().join(" "),
    };
    clean(&raw)
}

fn clean(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Locate a schema.org Product node: the value itself, an array member, or
/// an entry of `@graph`.
fn find_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product),
        Value::Object(map) => {
            let is_product = match map.get("@type") {
                Some(Value::String(t)) => t == "Product",
                Some(Value::Array(types)) => types.iter().any(|t| t == "Product"),
                _ => false,
            };
            if is_product {
                Some(value)
            } else {
                map.get("@graph").and_then(find_product)
            }
        }
        _ => None,
    }
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => clean(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => scalar(map.get("name")),
        _ => None,
    }
}

fn product_metadata(product: &Value) -> Metadata {
    let offer = match product.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    Metadata {
        sku: scalar(product.get("sku")),
        price: offer.and_then(|o| scalar(o.get("price"))),
        volume: None,
        abv: None,
        country: scalar(product.get("countryOfOrigin")),
        category: scalar(product.get("category")),
        availability: offer.and_then(|o| scalar(o.get("availability"))),
    }
}

fn price_pattern() -> &'static Regex {
    static PRICE: OnceLock<Regex> = OnceLock::new();
    PRICE.get_or_init(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap())
}

/// "$1,234.50" -> "1234.50". When the text holds several amounts (a sale
/// block like "Was $14.99 Now $12.99") the last one is the current price.
/// Returns `None` when no digits are present.
pub fn normalize_price(raw: &str) -> Option<String> {
    price_pattern()
        .find_iter(raw)
        .last()
        .map(|m| m.as_str().replace(',', ""))
}

/// "https://schema.org/InStock" -> "InStock"; plain text passes through.
pub fn normalize_availability(raw: &str) -> String {
    if raw.contains("schema.org/") {
        raw.rsplit('/').next().unwrap_or(raw).to_string()
    } else {
        raw.to_string()
    }
}
