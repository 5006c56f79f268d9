//! Pattern strategy: segment product-specification text into records.
//!
//! A product block looks like
//!
//! ```text
//! Product name: Alpha
//! Product features:
//! Fast
//! Light
//! Price: $10
//! ```
//!
//! The header (`Product name:` … `Product features:` … `Price:`) is matched
//! lazily in dot-matches-newline mode. The `regex` crate has no lookahead, so
//! the price is bounded explicitly: it runs from `Price:` to the next
//! `\nProduct name:` marker, or to the end of the text.

use crate::output::ProductRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static PRODUCT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Product name:\s*(.*?)\s*Product features:\s*(.*?)\s*Price:").unwrap()
});

static NEXT_PRODUCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\nProduct name:").unwrap());

/// Extract every product block, in order of appearance.
///
/// Text without any complete block yields an empty list.
pub fn extract_products(text: &str) -> Vec<ProductRecord> {
    let mut records = Vec::new();
    let mut pos = 0;

    while let Some(caps) = PRODUCT_HEADER.captures_at(text, pos) {
        let Some(header) = caps.get(0) else { break };
        let bound = NEXT_PRODUCT
            .find_at(text, header.end())
            .map_or(text.len(), |m| m.start());

        let name = caps.get(1).map_or("", |m| m.as_str()).trim();
        let features = caps.get(2).map_or("", |m| m.as_str());
        let price = text[header.end()..bound].trim();

        let record = ProductRecord {
            name: name.to_string(),
            features: split_features(features),
            price: price.to_string(),
        };
        debug!(
            "Product '{}': {} features, price {:?}",
            record.name,
            record.features.len(),
            record.price
        );
        records.push(record);

        pos = bound;
    }

    info!("Matched {} product blocks", records.len());
    records
}

/// One feature per line; surrounding whitespace trimmed and blank lines
/// dropped.
fn split_features(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}
