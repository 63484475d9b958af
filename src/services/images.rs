//! Image URL canonicalization and deduplication.
//!
//! Storefront CDNs publish the same photo under many size variants
//! (`chair_100x100.jpg`, `chair_500x500.jpg`, `chair.jpg?w=300`). This
//! module collapses every variant of a photo to a single canonical URL and
//! produces a minimal ordered gallery.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use url::Url;

use crate::models::ImageConfig;

/// A normalized URL with its parsed size-variant suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Normalized form of the input URL
    pub url: String,

    /// Grouping key: the URL with size suffix and stripped query removed
    pub base: String,

    /// Parsed `_WxH` / `_Wx` suffix; `None` is the bare form
    pub variant: Option<SizeVariant>,
}

/// A parsed size-variant filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeVariant {
    pub width: u32,
    pub height: Option<u32>,
}

impl SizeVariant {
    /// Pixel area used for ranking. A width-only suffix is treated as a
    /// square.
    pub fn area(&self) -> u64 {
        let w = u64::from(self.width);
        let h = self.height.map_or(w, u64::from);
        w * h
    }
}

/// Result of canonicalizing a raw URL list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGallery {
    /// One canonical URL per distinct photo, in first-seen order
    pub gallery: Vec<String>,

    /// First gallery element, when any survived
    pub primary: Option<String>,
}

/// Canonicalizes and deduplicates discovered image URLs.
pub struct ImageResolver {
    placeholder_patterns: Vec<String>,
    strip_params: Vec<String>,
    variant_re: Regex,
}

impl ImageResolver {
    /// Create a resolver from the image configuration.
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            placeholder_patterns: config
                .placeholder_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            strip_params: config.strip_params.iter().map(|p| p.to_lowercase()).collect(),
            // underscore + integer x optional-integer, before the extension
            variant_re: Regex::new(r"_(\d{1,5})x(\d{0,5})(\.[A-Za-z0-9]+)$")
                .expect("variant suffix pattern is valid"),
        }
    }

    /// Canonicalize `raw_urls` into a deduplicated ordered gallery.
    ///
    /// Re-running on the output yields the same output: normalization is a
    /// projection, so normalized URLs re-normalize to themselves.
    pub fn resolve(&self, raw_urls: &[String], base_url: &Url) -> ResolvedGallery {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<ImageCandidate>> = HashMap::new();

        for raw in raw_urls {
            let Some(candidate) = self.candidate(raw, base_url) else {
                continue;
            };
            if !groups.contains_key(&candidate.base) {
                order.push(candidate.base.clone());
            }
            groups.entry(candidate.base.clone()).or_default().push(candidate);
        }

        let mut seen = HashSet::new();
        let mut gallery = Vec::new();
        for base in order {
            let canonical = Self::pick_canonical(&groups[&base]);
            if seen.insert(canonical.clone()) {
                gallery.push(canonical);
            }
        }

        ResolvedGallery {
            primary: gallery.first().cloned(),
            gallery,
        }
    }

    /// Normalize a single raw URL, or `None` when it is a placeholder or
    /// unusable.
    pub fn normalize(&self, raw: &str, base_url: &Url) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let resolved = base_url.join(trimmed).ok()?;
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            return None;
        }

        let lower = resolved.as_str().to_lowercase();
        if self.placeholder_patterns.iter().any(|p| lower.contains(p)) {
            return None;
        }

        let mut normalized = resolved;
        let kept: Vec<(String, String)> = normalized
            .query_pairs()
            .filter(|(key, _)| !self.strip_params.contains(&key.to_lowercase()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            normalized.set_query(None);
        } else {
            let query: String = kept
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{k}={v}")
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            normalized.set_query(Some(&query));
        }

        Some(normalized.to_string())
    }

    /// Build a grouped candidate from a raw URL.
    fn candidate(&self, raw: &str, base_url: &Url) -> Option<ImageCandidate> {
        let url = self.normalize(raw, base_url)?;
        let (base, variant) = self.split_variant(&url);
        Some(ImageCandidate { url, base, variant })
    }

    /// Strip a trailing `_{W}x{H}` / `_{W}x` filename suffix, yielding the
    /// canonical base and the parsed variant.
    fn split_variant(&self, url: &str) -> (String, Option<SizeVariant>) {
        let (head, query) = match url.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (url, None),
        };

        let Some(caps) = self.variant_re.captures(head) else {
            return (url.to_string(), None);
        };

        let full = caps.get(0).expect("whole match").start();
        let width: u32 = match caps[1].parse() {
            Ok(w) => w,
            Err(_) => return (url.to_string(), None),
        };
        let height: Option<u32> = if caps[2].is_empty() {
            None
        } else {
            match caps[2].parse() {
                Ok(h) => Some(h),
                Err(_) => return (url.to_string(), None),
            }
        };

        let mut base = format!("{}{}", &head[..full], &caps[3]);
        if let Some(query) = query {
            base.push('?');
            base.push_str(query);
        }

        (base, Some(SizeVariant { width, height }))
    }

    /// Select the canonical member of a group.
    ///
    /// The bare form wins outright. Otherwise the largest pixel area wins;
    /// equal areas break by shortest URL. That tie-break assumes shorter
    /// URLs sit closer to the origin form; it is a heuristic, not a
    /// guarantee.
    fn pick_canonical(candidates: &[ImageCandidate]) -> String {
        if let Some(bare) = candidates.iter().find(|c| c.variant.is_none()) {
            return bare.url.clone();
        }

        let mut best: Option<(&ImageCandidate, u64)> = None;
        for candidate in candidates {
            let Some(variant) = candidate.variant else {
                continue;
            };
            let area = variant.area();
            let better = match best {
                None => true,
                Some((current, current_area)) => {
                    area > current_area
                        || (area == current_area && candidate.url.len() < current.url.len())
                }
            };
            if better {
                best = Some((candidate, area));
            }
        }

        best.map(|(c, _)| c.url.clone())
            .unwrap_or_else(|| candidates[0].url.clone())
    }
}
