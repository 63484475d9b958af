//! Per-field extraction strategies.
//!
//! Each field is resolved by a fixed, ordered list of independent strategies
//! sharing one policy: first non-empty value wins, and a strategy that finds
//! nothing yields `None` rather than failing.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

/// An element-scoped image strategy.
pub type ImageStrategy = fn(&ElementRef) -> Option<String>;

/// Ordered image strategies for an element scope (a product card or gallery
/// slot): explicit src, responsive srcset candidate, inline background
/// image, platform lazy-load markers.
pub const IMAGE_STRATEGIES: &[ImageStrategy] = &[
    explicit_src,
    srcset_candidate,
    background_image,
    lazy_marker,
];

/// Run the image strategy chain over a scope.
pub fn first_image(scope: &ElementRef) -> Option<String> {
    IMAGE_STRATEGIES.iter().find_map(|strategy| strategy(scope))
}

fn img_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("img").expect("static selector"))
}

fn source_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("source[srcset]").expect("static selector"))
}

fn styled_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse(r#"[style*="background"]"#).expect("static selector"))
}

fn background_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("static pattern"))
}

/// The scope itself when it is an `<img>`, else its first `<img>` descendant.
fn primary_img<'a>(scope: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    if scope.value().name() == "img" {
        return Some(*scope);
    }
    scope.select(img_selector()).next()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// (a) Explicit media reference on the primary element.
pub fn explicit_src(scope: &ElementRef) -> Option<String> {
    primary_img(scope)
        .and_then(|img| img.value().attr("src"))
        .and_then(non_empty)
}

/// (b) First candidate of a responsive source set, on the `<img>` itself or
/// an enclosing `<picture>`'s `<source>`.
pub fn srcset_candidate(scope: &ElementRef) -> Option<String> {
    let from_img = primary_img(scope).and_then(|img| img.value().attr("srcset"));
    let from_source = scope
        .select(source_selector())
        .next()
        .and_then(|source| source.value().attr("srcset"));

    from_img
        .or(from_source)
        .and_then(first_srcset_url)
}

/// (d) A computed background-image reference in inline style.
pub fn background_image(scope: &ElementRef) -> Option<String> {
    let own = scope.value().attr("style");
    let descendant = scope
        .select(styled_selector())
        .next()
        .and_then(|el| el.value().attr("style"));

    own.into_iter()
        .chain(descendant)
        .find_map(|style| {
            background_re()
                .captures(style)
                .and_then(|caps| non_empty(&caps[1]))
        })
}

/// (e) Platform lazy-load marker attributes.
pub fn lazy_marker(scope: &ElementRef) -> Option<String> {
    const MARKERS: &[&str] = &["ec-data-src", "data-src", "data-original", "data-lazy"];

    let candidates = primary_img(scope).into_iter().chain(std::iter::once(*scope));
    for element in candidates {
        for marker in MARKERS {
            if let Some(value) = element.value().attr(marker).and_then(non_empty) {
                return Some(value);
            }
        }
    }
    None
}

/// Parse the first URL out of a `srcset` attribute value.
fn first_srcset_url(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .find_map(non_empty)
}

/// Scrub a displayed price down to minor units.
///
/// Keeps ASCII digits only, so "1,280,000원" and "₩1 280 000" both parse.
pub fn parse_price(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > 15 {
        return None;
    }
    digits.parse().ok()
}
