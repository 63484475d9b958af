//! Local JSON-file storage implementation.
//!
//! Stores the catalog as two JSON documents under a root directory:
//!
//! ```text
//! {root}/
//! ├── categories.json       # slug → StoredCategory
//! └── products.json         # detail URL → StoredProduct
//! ```
//!
//! Writes are atomic (write to temp, then rename) and serialized behind a
//! mutex; readers never observe a half-written document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CategoryRecord, ProductRecord};
use crate::storage::{CatalogStore, StoreStats, StoredCategory, StoredProduct};

const CATEGORIES_KEY: &str = "categories.json";
const PRODUCTS_KEY: &str = "products.json";

/// Local filesystem storage backend.
pub struct JsonCatalogStore {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonCatalogStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn load_categories(&self) -> Result<BTreeMap<String, StoredCategory>> {
        Ok(self.read_json(CATEGORIES_KEY).await?.unwrap_or_default())
    }

    async fn load_products(&self) -> Result<BTreeMap<String, StoredProduct>> {
        Ok(self.read_json(PRODUCTS_KEY).await?.unwrap_or_default())
    }

    /// Aggregate counts for the info surface.
    pub async fn stats(&self) -> Result<StoreStats> {
        let categories = self.load_categories().await?;
        let products = self.load_products().await?;
        let last_updated = categories
            .values()
            .map(|c| c.updated_at)
            .chain(products.values().map(|p| p.updated_at))
            .max();

        Ok(StoreStats {
            categories: categories.len(),
            products: products.len(),
            last_updated,
        })
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>> {
        let categories = self.load_categories().await?;
        Ok(categories.get(slug).map(|stored| stored.record.clone()))
    }

    async fn upsert_category(&self, category: &CategoryRecord) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let mut categories = self.load_categories().await?;

        match categories.get_mut(&category.slug) {
            Some(existing) => {
                if existing.record != *category {
                    existing.record = category.clone();
                }
                existing.updated_at = now;
            }
            None => {
                categories.insert(
                    category.slug.clone(),
                    StoredCategory {
                        record: category.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }

        self.write_json(CATEGORIES_KEY, &categories).await?;
        Ok(category.slug.clone())
    }

    async fn get_product_by_detail_url(&self, detail_url: &str) -> Result<Option<ProductRecord>> {
        let products = self.load_products().await?;
        Ok(products.get(detail_url).map(|stored| stored.record.clone()))
    }

    async fn upsert_product(&self, product: &ProductRecord, category_id: &str) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let mut products = self.load_products().await?;

        match products.get_mut(&product.detail_url) {
            Some(existing) => {
                if existing.record != *product {
                    existing.record = product.clone();
                }
                existing.category_id = category_id.to_string();
                existing.updated_at = now;
            }
            None => {
                products.insert(
                    product.detail_url.clone(),
                    StoredProduct {
                        record: product.clone(),
                        category_id: category_id.to_string(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }

        self.write_json(PRODUCTS_KEY, &products).await?;
        Ok(product.detail_url.clone())
    }
}
