//! Catalog data structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A category discovered on the storefront's catalog page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCategory {
    /// Category name in the source language
    pub name_source: String,

    /// Natural key, unique within a run
    pub slug: String,

    /// Full URL of the category's product list page
    pub url: String,

    /// Category tile image, if any
    pub image_url: Option<String>,
}

/// A product as it appears on a category's list page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawProductSummary {
    /// Product name in the source language
    pub name_source: String,

    /// Vendor product code, if shown on the list page
    pub product_code: Option<String>,

    /// Full URL of the product detail page; natural key for the product
    pub detail_url: String,

    /// List-page thumbnail
    pub image_url: Option<String>,

    /// Displayed price in minor units
    pub price: Option<i64>,

    /// Dimension string as displayed (e.g. "W600 x D550 x H790")
    pub dimensions: Option<String>,

    /// Slug of the category the product was discovered under
    pub category_slug: String,
}

/// A product color option with its translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorOption {
    pub name_source: String,
    pub name_target: Option<String>,
}

/// A "product in scene" photo linking to the scene it was shot for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SceneImage {
    pub name: String,
    pub image_url: String,
    pub scene_url: String,
}

/// Supplementary fields extracted from a product detail page.
///
/// Everything is optional; a field the page does not carry is simply absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductDetail {
    /// Product name, when the detail page shows one
    pub name_source: Option<String>,

    /// Vendor product code
    pub product_code: Option<String>,

    /// Long description in the source language
    pub description_source: Option<String>,

    /// Material line
    pub material: Option<String>,

    /// Specification table rows, keyed by the row label
    pub specs: BTreeMap<String, String>,

    /// Color option names in the source language
    pub color_options: Vec<String>,

    /// Photos of the product staged in a scene
    pub scene_images: Vec<SceneImage>,

    /// Gallery image URLs in page order, raw until canonicalized
    pub image_gallery: Vec<String>,

    /// Pre-discount price in minor units
    pub regular_price: Option<i64>,

    /// Discounted price in minor units
    pub sale_price: Option<i64>,

    /// Free-form callouts (shipping, preorder, care notes)
    pub special_notes: Vec<String>,
}

impl ProductDetail {
    /// Whether the page yielded anything at all.
    pub fn is_empty(&self) -> bool {
        self.name_source.is_none()
            && self.product_code.is_none()
            && self.description_source.is_none()
            && self.material.is_none()
            && self.specs.is_empty()
            && self.color_options.is_empty()
            && self.scene_images.is_empty()
            && self.image_gallery.is_empty()
            && self.regular_price.is_none()
            && self.sale_price.is_none()
            && self.special_notes.is_empty()
    }
}

/// A category as persisted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRecord {
    pub slug: String,
    pub name_source: String,
    pub name_target: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
}

impl CategoryRecord {
    /// Build an untranslated record from a discovered category.
    pub fn from_raw(raw: &RawCategory) -> Self {
        Self {
            slug: raw.slug.clone(),
            name_source: raw.name_source.clone(),
            name_target: None,
            url: raw.url.clone(),
            image_url: raw.image_url.clone(),
        }
    }
}

/// The merged product shape handed to the persistence gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRecord {
    pub detail_url: String,
    pub category_slug: String,
    pub product_code: Option<String>,

    pub name_source: String,
    pub name_target: Option<String>,
    pub description_source: Option<String>,
    pub description_target: Option<String>,
    pub material_source: Option<String>,
    pub material_target: Option<String>,

    /// Spec rows in the source language, keyed by row label
    pub specs: BTreeMap<String, String>,

    /// Translated spec values for the keys that translated
    pub specs_target: BTreeMap<String, String>,

    pub color_options: Vec<ColorOption>,
    pub scene_images: Vec<SceneImage>,

    /// Canonical, deduplicated gallery in discovery order
    pub image_gallery: Vec<String>,

    /// First gallery element, when the gallery is non-empty
    pub primary_image: Option<String>,

    pub price: Option<i64>,
    pub regular_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub dimensions: Option<String>,
    pub special_notes: Vec<String>,
}

impl ProductRecord {
    /// Merge a list-page summary with an optional detail-page supplement.
    ///
    /// Detail fields win where both carry a value; translation targets start
    /// empty and are filled by the memoization pass.
    pub fn from_parts(summary: &RawProductSummary, detail: Option<&ProductDetail>) -> Self {
        let detail_image = detail.and_then(|d| d.image_gallery.first().cloned());
        let image_gallery = detail.map(|d| d.image_gallery.clone()).unwrap_or_default();
        let primary_image = detail_image.or_else(|| summary.image_url.clone());

        Self {
            detail_url: summary.detail_url.clone(),
            category_slug: summary.category_slug.clone(),
            product_code: detail
                .and_then(|d| d.product_code.clone())
                .or_else(|| summary.product_code.clone()),
            name_source: detail
                .and_then(|d| d.name_source.clone())
                .unwrap_or_else(|| summary.name_source.clone()),
            name_target: None,
            description_source: detail.and_then(|d| d.description_source.clone()),
            description_target: None,
            material_source: detail.and_then(|d| d.material.clone()),
            material_target: None,
            specs: detail.map(|d| d.specs.clone()).unwrap_or_default(),
            specs_target: BTreeMap::new(),
            color_options: detail
                .map(|d| {
                    d.color_options
                        .iter()
                        .map(|name| ColorOption {
                            name_source: name.clone(),
                            name_target: None,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            scene_images: detail.map(|d| d.scene_images.clone()).unwrap_or_default(),
            image_gallery,
            primary_image,
            price: summary.price,
            regular_price: detail.and_then(|d| d.regular_price),
            sale_price: detail.and_then(|d| d.sale_price),
            dimensions: summary.dimensions.clone(),
            special_notes: detail.map(|d| d.special_notes.clone()).unwrap_or_default(),
        }
    }

    /// Fallback record when the detail fetch failed: the summary alone.
    pub fn from_summary(summary: &RawProductSummary) -> Self {
        Self::from_parts(summary, None)
    }
}
