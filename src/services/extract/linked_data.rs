//! Defensive parsing of embedded linked-data blocks.
//!
//! Storefront pages embed `application/ld+json` blocks of wildly varying
//! quality. They are consumed only for the product image and description;
//! a malformed block folds into "strategy returned nothing", never an error.

use scraper::{Html, Selector};
use serde_json::Value;

/// Image and description fields of a linked-data `Product` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductLinkedData {
    pub description: Option<String>,
    pub images: Vec<String>,
}

/// Outcome of parsing one linked-data block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedDataParse {
    Product(ProductLinkedData),
    Malformed,
}

/// Parse a single linked-data block.
pub fn parse_block(json_text: &str) -> LinkedDataParse {
    let Ok(value) = serde_json::from_str::<Value>(json_text) else {
        return LinkedDataParse::Malformed;
    };

    match find_product(&value) {
        Some(product) => LinkedDataParse::Product(product),
        None => LinkedDataParse::Malformed,
    }
}

/// Scan every linked-data block in the document; first `Product` wins.
pub fn product_linked_data(document: &Html) -> Option<ProductLinkedData> {
    let selector =
        Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector");

    for script in document.select(&selector) {
        let text: String = script.text().collect();
        if let LinkedDataParse::Product(product) = parse_block(&text) {
            return Some(product);
        }
    }
    None
}

/// Locate a `Product` object at the top level or inside an `@graph` array.
fn find_product(value: &Value) -> Option<ProductLinkedData> {
    if is_product(value) {
        return Some(extract_product(value));
    }

    if let Some(items) = value.as_array() {
        return items.iter().find(|v| is_product(v)).map(extract_product);
    }

    if let Some(graph) = value.get("@graph").and_then(Value::as_array) {
        return graph.iter().find(|v| is_product(v)).map(extract_product);
    }

    None
}

fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Product")),
        _ => false,
    }
}

fn extract_product(value: &Value) -> ProductLinkedData {
    ProductLinkedData {
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        images: image_urls(value.get("image")),
    }
}

/// The `image` field may be a string, a list, or an ImageObject.
fn image_urls(value: Option<&Value>) -> Vec<String> {
    let mut urls = Vec::new();
    let Some(value) = value else {
        return urls;
    };

    match value {
        Value::String(s) => {
            if !s.trim().is_empty() {
                urls.push(s.trim().to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                urls.extend(image_urls(Some(item)));
            }
        }
        Value::Object(_) => {
            if let Some(url) = value.get("url").and_then(Value::as_str) {
                if !url.trim().is_empty() {
                    urls.push(url.trim().to_string());
                }
            }
        }
        _ => {}
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_product_block() {
        let json = r#"{
            "@context": "https://schema.org",
            "@type": "Product",
            "name": "Arm Chair",
            "description": "Solid oak frame.",
            "image": ["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"]
        }"#;

        match parse_block(json) {
            LinkedDataParse::Product(p) => {
                assert_eq!(p.description.as_deref(), Some("Solid oak frame."));
                assert_eq!(p.images.len(), 2);
            }
            LinkedDataParse::Malformed => panic!("expected product"),
        }
    }

    #[test]
    fn test_image_object_form() {
        let json = r#"{
            "@type": "Product",
            "image": {"@type": "ImageObject", "url": "https://cdn.example.com/a.jpg"}
        }"#;

        match parse_block(json) {
            LinkedDataParse::Product(p) => {
                assert_eq!(p.images, vec!["https://cdn.example.com/a.jpg"]);
            }
            LinkedDataParse::Malformed => panic!("expected product"),
        }
    }

    #[test]
    fn test_graph_wrapper() {
        let json = r#"{
            "@graph": [
                {"@type": "BreadcrumbList"},
                {"@type": "Product", "image": "https://cdn.example.com/a.jpg"}
            ]
        }"#;

        assert!(matches!(parse_block(json), LinkedDataParse::Product(_)));
    }

    #[test]
    fn test_malformed_json_folds_to_malformed() {
        assert_eq!(parse_block("{not json"), LinkedDataParse::Malformed);
        assert_eq!(parse_block(r#"{"@type": "Article"}"#), LinkedDataParse::Malformed);
    }

    #[test]
    fn test_document_scan_skips_bad_blocks() {
        let html = Html::parse_document(
            r#"<html><head>
            <script type="application/ld+json">{broken</script>
            <script type="application/ld+json">{"@type":"Product","image":"https://cdn.example.com/x.jpg"}</script>
            </head><body></body></html>"#,
        );

        let product = product_linked_data(&html).unwrap();
        assert_eq!(product.images, vec!["https://cdn.example.com/x.jpg"]);
    }
}
