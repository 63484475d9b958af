//! Persistence gateway for the ingested catalog.
//!
//! Records are keyed by their natural keys (category slug, product detail
//! URL) and upserts are idempotent: re-ingesting unchanged data produces no
//! observable diff beyond an updated timestamp.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CategoryRecord, ProductRecord};

// Re-export for convenience
pub use local::JsonCatalogStore;

/// A category with persistence metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCategory {
    #[serde(flatten)]
    pub record: CategoryRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with persistence metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProduct {
    #[serde(flatten)]
    pub record: ProductRecord,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate storage counts for the info surface.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub categories: usize,
    pub products: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Trait for catalog persistence backends.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up a category by its slug.
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>>;

    /// Insert or update a category; returns its id.
    async fn upsert_category(&self, category: &CategoryRecord) -> Result<String>;

    /// Look up a product by its detail URL.
    async fn get_product_by_detail_url(&self, detail_url: &str) -> Result<Option<ProductRecord>>;

    /// Insert or update a product under a category; returns its id.
    async fn upsert_product(&self, product: &ProductRecord, category_id: &str) -> Result<String>;
}
