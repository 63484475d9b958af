//! Utility functions and helpers.

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Extract the domain from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

/// Derive a URL-safe slug from arbitrary text.
///
/// Alphanumerics are lowercased, runs of anything else collapse to a single
/// hyphen. Returns `None` when nothing survives.
pub fn slugify(text: &str) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() { None } else { Some(slug) }
}

/// Derive a category slug from its link, falling back to the display name.
///
/// Storefront category links carry a stable path segment
/// (`/category/arm-chairs/42/`); the last non-numeric segment is the most
/// readable stable key.
pub fn slug_from_url(url: &str, fallback_name: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(segments) = parsed.path_segments() {
            let candidate = segments
                .filter(|s| !s.is_empty())
                .filter(|s| !s.chars().all(|c| c.is_ascii_digit()))
                .next_back();
            if let Some(segment) = candidate {
                let trimmed = segment
                    .trim_end_matches(".html")
                    .trim_end_matches(".do")
                    .trim_end_matches(".php");
                if let Some(slug) = slugify(trimmed) {
                    return Some(slug);
                }
            }
        }
    }
    slugify(fallback_name)
}
