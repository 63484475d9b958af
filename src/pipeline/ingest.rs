//! Ingestion orchestration.
//!
//! Drives a full catalog run: sequential category traversal,
//! bounded-concurrency product batches, per-item and per-category failure
//! isolation, and aggregate statistics. Categories are intentionally not
//! parallelized; the batch limit bounds total load on the origin and the
//! metered translation provider.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    CategoryRecord, Config, CrawlRun, ProductDetail, ProductRecord, RawCategory,
    RawProductSummary, RunResult,
};
use crate::pipeline::StatusTracker;
use crate::services::{
    Extractor, FieldTranslation, ImageResolver, PageSource, TranslationMemo, TranslationService,
    service_from_config,
};
use crate::storage::CatalogStore;

/// Result of one product worker. Workers never fail; trouble is recorded in
/// the flags and the record falls back to the bare summary.
struct WorkerOutcome {
    record: ProductRecord,
    detail_attempted: bool,
    detail_failed: bool,
    translated: usize,
    skipped: usize,
}

/// The catalog ingestion orchestrator.
pub struct Ingestor {
    config: Arc<Config>,
    source: Arc<dyn PageSource>,
    store: Arc<dyn CatalogStore>,
    extractor: Extractor,
    resolver: ImageResolver,
    memo: TranslationMemo,
    base_url: Url,
}

impl Ingestor {
    /// Create an ingestor with the provider implied by the configuration.
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn PageSource>,
        store: Arc<dyn CatalogStore>,
    ) -> Result<Self> {
        let service = service_from_config(&config.translation)?;
        Self::with_translator(config, source, store, service)
    }

    /// Create an ingestor with an explicit translation provider.
    pub fn with_translator(
        config: Arc<Config>,
        source: Arc<dyn PageSource>,
        store: Arc<dyn CatalogStore>,
        service: Arc<dyn TranslationService>,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.site.base_url)?;
        Ok(Self {
            extractor: Extractor::new()?,
            resolver: ImageResolver::new(&config.images),
            memo: TranslationMemo::new(service, config.translation.batch_limit),
            config,
            source,
            store,
            base_url,
        })
    }

    /// Start a run in the background, or report the one in progress.
    ///
    /// If a run is `Running`, the current snapshot is returned and nothing
    /// starts; concurrent triggers coalesce into the in-progress run.
    pub fn trigger(self: Arc<Self>, tracker: &StatusTracker) -> CrawlRun {
        if !tracker.begin() {
            log::info!("Ingestion already running; returning current snapshot");
            return tracker.snapshot();
        }

        let tracker_task = tracker.clone();
        tokio::spawn(async move {
            match self.execute(&tracker_task).await {
                Ok(result) => tracker_task.finish(result),
                Err(e) => {
                    log::error!("Ingestion run failed: {}", e);
                    tracker_task.fail(e.to_string());
                }
            }
        });

        tracker.snapshot()
    }

    /// Run one ingestion to completion on the caller's task.
    pub async fn run_to_completion(&self, tracker: &StatusTracker) -> Result<RunResult> {
        if !tracker.begin() {
            return Err(AppError::ingest("run", "a run is already in progress"));
        }
        match self.execute(tracker).await {
            Ok(result) => {
                tracker.finish(result.clone());
                Ok(result)
            }
            Err(e) => {
                tracker.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// The run body. Failures below the category level never reach here;
    /// an error out of this function is a terminal run failure.
    async fn execute(&self, tracker: &StatusTracker) -> Result<RunResult> {
        tracker.update(10, "Fetching categories");
        let html = self.source.fetch(&self.config.site.catalog_url).await?;
        let categories = {
            let document = Html::parse_document(&html);
            self.extractor
                .extract_categories(&document, &self.config.site.catalog_url)
        };
        log::info!("Discovered {} categories", categories.len());

        let mut result = RunResult {
            categories_total: categories.len(),
            ..RunResult::default()
        };

        let delay = Duration::from_millis(self.config.crawler.request_delay_ms);
        let total = categories.len().max(1);

        for (index, category) in categories.iter().enumerate() {
            let progress = 10 + ((index * 80) / total) as u8;
            tracker.update(
                progress,
                format!(
                    "Category {} ({}/{})",
                    category.slug,
                    index + 1,
                    categories.len()
                ),
            );

            if let Err(e) = self.ingest_category(category, &mut result).await {
                result.categories_failed += 1;
                result.errors.push(format!("{}: {}", category.slug, e));
                log::warn!("Category {} failed: {}", category.slug, e);
            }

            if !delay.is_zero() && index + 1 < categories.len() {
                tokio::time::sleep(delay).await;
            }
        }

        tracker.update(95, "Finalizing");
        log::info!("Run complete: {}", result.summary());
        Ok(result)
    }

    /// Ingest one category: memoized name translation, list-page fetch,
    /// bounded-parallel product workers, ordered persistence.
    async fn ingest_category(
        &self,
        category: &RawCategory,
        result: &mut RunResult,
    ) -> Result<()> {
        let prior = self.store.get_category_by_slug(&category.slug).await?;
        let mut record = CategoryRecord::from_raw(category);
        let field = FieldTranslation {
            source: record.name_source.clone(),
            prior_source: prior.as_ref().map(|p| p.name_source.clone()),
            prior_translated: prior.as_ref().and_then(|p| p.name_target.clone()),
        };
        let outcome = self.memo.resolve_fields(std::slice::from_ref(&field)).await;
        record.name_target = outcome.values.into_iter().next().flatten();
        result.translation_calls += outcome.translated;
        result.translation_skipped += outcome.skipped;

        let category_id = self.store.upsert_category(&record).await?;

        let html = self.source.fetch(&category.url).await?;
        let summaries = {
            let document = Html::parse_document(&html);
            self.extractor
                .extract_product_summaries(&document, &category.url, &category.slug)
        };
        log::info!("Category {}: {} products", category.slug, summaries.len());

        let batch_size = self.config.crawler.batch_size.max(1);
        let mut outcomes: Vec<(usize, WorkerOutcome)> =
            stream::iter(summaries.into_iter().enumerate())
                .map(|(index, summary)| async move {
                    (index, self.process_product(summary).await)
                })
                .buffer_unordered(batch_size)
                .collect()
                .await;

        // Workers complete in any order; reinsert at the original index so
        // the product list keeps discovery order.
        outcomes.sort_by_key(|(index, _)| *index);

        for (_, outcome) in outcomes {
            result.products_total += 1;
            if outcome.record.primary_image.is_some() {
                result.products_with_image += 1;
            } else {
                result.products_without_image += 1;
            }
            if outcome.detail_attempted {
                result.detail_attempted += 1;
            }
            if outcome.detail_failed {
                result.detail_failed += 1;
            }
            result.translation_calls += outcome.translated;
            result.translation_skipped += outcome.skipped;

            self.store
                .upsert_product(&outcome.record, &category_id)
                .await?;
        }

        Ok(())
    }

    /// One product worker. Any failure is absorbed here: the product falls
    /// back to its summary record rather than aborting the batch.
    async fn process_product(&self, summary: RawProductSummary) -> WorkerOutcome {
        let prior = match self.store.get_product_by_detail_url(&summary.detail_url).await {
            Ok(prior) => prior,
            Err(e) => {
                log::warn!("Prior lookup failed for {}: {}", summary.detail_url, e);
                None
            }
        };

        let has_image = summary.image_url.is_some()
            || prior.as_ref().is_some_and(|p| p.primary_image.is_some());
        let has_description = prior
            .as_ref()
            .is_some_and(|p| p.description_source.is_some());
        let has_code = summary.product_code.is_some()
            || prior.as_ref().is_some_and(|p| p.product_code.is_some());
        let needs_detail = !has_image || !has_description || !has_code;

        let mut detail_attempted = false;
        let mut detail_failed = false;
        let detail = if needs_detail {
            detail_attempted = true;
            match self.fetch_detail(&summary.detail_url).await {
                Ok(Some(detail)) => Some(detail),
                Ok(None) => {
                    detail_failed = true;
                    log::warn!("Detail page yielded nothing for {}", summary.detail_url);
                    None
                }
                Err(e) => {
                    detail_failed = true;
                    log::warn!("Detail fetch failed for {}: {}", summary.detail_url, e);
                    None
                }
            }
        } else {
            None
        };

        let mut record = ProductRecord::from_parts(&summary, detail.as_ref());

        // Without a detail gallery the summary thumbnail is all there is;
        // run it through the same canonicalization.
        if record.image_gallery.is_empty() {
            if let Some(raw) = record.primary_image.take() {
                let resolved = self.resolver.resolve(std::slice::from_ref(&raw), &self.base_url);
                record.image_gallery = resolved.gallery;
                record.primary_image = resolved.primary;
            }
        }

        if let Some(prior) = &prior {
            merge_prior(&mut record, prior);
        }

        let (translated, skipped) = self.translate_record(&mut record, prior.as_ref()).await;

        WorkerOutcome {
            record,
            detail_attempted,
            detail_failed,
            translated,
            skipped,
        }
    }

    /// Fetch and extract a detail page; the gallery comes back canonical.
    async fn fetch_detail(&self, url: &str) -> Result<Option<ProductDetail>> {
        let html = self.source.fetch(url).await?;
        let mut detail = {
            let document = Html::parse_document(&html);
            self.extractor.extract_product_detail(&document, url)
        };

        if let Some(detail) = detail.as_mut() {
            let base = Url::parse(url).unwrap_or_else(|_| self.base_url.clone());
            let resolved = self.resolver.resolve(&detail.image_gallery, &base);
            detail.image_gallery = resolved.gallery;
        }

        Ok(detail)
    }

    /// Memoized translation of every text field of a record, in one batched
    /// pass: name, description, material, spec values, color names.
    async fn translate_record(
        &self,
        record: &mut ProductRecord,
        prior: Option<&ProductRecord>,
    ) -> (usize, usize) {
        let mut fields = Vec::new();

        fields.push(FieldTranslation {
            source: record.name_source.clone(),
            prior_source: prior.map(|p| p.name_source.clone()),
            prior_translated: prior.and_then(|p| p.name_target.clone()),
        });
        fields.push(FieldTranslation {
            source: record.description_source.clone().unwrap_or_default(),
            prior_source: prior.and_then(|p| p.description_source.clone()),
            prior_translated: prior.and_then(|p| p.description_target.clone()),
        });
        fields.push(FieldTranslation {
            source: record.material_source.clone().unwrap_or_default(),
            prior_source: prior.and_then(|p| p.material_source.clone()),
            prior_translated: prior.and_then(|p| p.material_target.clone()),
        });

        let spec_keys: Vec<String> = record.specs.keys().cloned().collect();
        for key in &spec_keys {
            fields.push(FieldTranslation {
                source: record.specs[key].clone(),
                prior_source: prior.and_then(|p| p.specs.get(key).cloned()),
                prior_translated: prior.and_then(|p| p.specs_target.get(key).cloned()),
            });
        }

        for color in &record.color_options {
            let prior_color = prior.and_then(|p| {
                p.color_options
                    .iter()
                    .find(|c| c.name_source == color.name_source)
            });
            fields.push(FieldTranslation {
                source: color.name_source.clone(),
                prior_source: prior_color.map(|c| c.name_source.clone()),
                prior_translated: prior_color.and_then(|c| c.name_target.clone()),
            });
        }

        let outcome = self.memo.resolve_fields(&fields).await;
        let mut values = outcome.values.into_iter();

        record.name_target = values.next().flatten();
        record.description_target = values.next().flatten();
        record.material_target = values.next().flatten();
        for key in spec_keys {
            if let Some(value) = values.next().flatten() {
                record.specs_target.insert(key, value);
            }
        }
        for color in &mut record.color_options {
            color.name_target = values.next().flatten();
        }

        (outcome.translated, outcome.skipped)
    }
}

/// Fill fields the current crawl did not produce from the stored record, so
/// a skipped or failed detail fetch never erases previously ingested data.
fn merge_prior(record: &mut ProductRecord, prior: &ProductRecord) {
    if record.product_code.is_none() {
        record.product_code = prior.product_code.clone();
    }
    if record.description_source.is_none() {
        record.description_source = prior.description_source.clone();
    }
    if record.material_source.is_none() {
        record.material_source = prior.material_source.clone();
    }
    if record.specs.is_empty() {
        record.specs = prior.specs.clone();
    }
    if record.color_options.is_empty() {
        record.color_options = prior.color_options.clone();
    }
    if record.scene_images.is_empty() {
        record.scene_images = prior.scene_images.clone();
    }
    if record.image_gallery.is_empty() {
        record.image_gallery = prior.image_gallery.clone();
    }
    if record.primary_image.is_none() {
        record.primary_image = prior.primary_image.clone();
    }
    if record.regular_price.is_none() {
        record.regular_price = prior.regular_price;
    }
    if record.sale_price.is_none() {
        record.sale_price = prior.sale_price;
    }
    if record.dimensions.is_none() {
        record.dimensions = prior.dimensions.clone();
    }
    if record.special_notes.is_empty() {
        record.special_notes = prior.special_notes.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::models::RunState;
    use crate::services::FetchError;

    /// Canned page source with hit counting and an in-flight high-water
    /// mark.
    struct FakeSource {
        pages: HashMap<String, String>,
        hits: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl FakeSource {
        fn new(pages: Vec<(&str, String)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(url, html)| (url.to_string(), html))
                    .collect(),
                hits: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: Duration::from_millis(5),
            }
        }

        fn hit_count(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
            *self.hits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Network {
                    url: url.to_string(),
                    message: "no such page".to_string(),
                })
        }
    }

    /// In-memory gateway.
    #[derive(Default)]
    struct MemoryStore {
        categories: Mutex<HashMap<String, CategoryRecord>>,
        products: Mutex<HashMap<String, (ProductRecord, String)>>,
    }

    #[async_trait]
    impl CatalogStore for MemoryStore {
        async fn get_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>> {
            Ok(self.categories.lock().unwrap().get(slug).cloned())
        }

        async fn upsert_category(&self, category: &CategoryRecord) -> Result<String> {
            self.categories
                .lock()
                .unwrap()
                .insert(category.slug.clone(), category.clone());
            Ok(category.slug.clone())
        }

        async fn get_product_by_detail_url(
            &self,
            detail_url: &str,
        ) -> Result<Option<ProductRecord>> {
            Ok(self
                .products
                .lock()
                .unwrap()
                .get(detail_url)
                .map(|(record, _)| record.clone()))
        }

        async fn upsert_product(
            &self,
            product: &ProductRecord,
            category_id: &str,
        ) -> Result<String> {
            self.products.lock().unwrap().insert(
                product.detail_url.clone(),
                (product.clone(), category_id.to_string()),
            );
            Ok(product.detail_url.clone())
        }
    }

    /// Uppercasing provider double.
    struct UpperTranslator;

    #[async_trait]
    impl TranslationService for UpperTranslator {
        async fn translate(&self, text: &str) -> Result<Option<String>> {
            Ok(Some(text.to_uppercase()))
        }

        async fn translate_batch(&self, texts: &[String]) -> Result<Vec<Option<String>>> {
            Ok(texts.iter().map(|t| Some(t.to_uppercase())).collect())
        }
    }

    const CATALOG_URL: &str = "https://shop.example.com/category/all";

    fn test_config(batch_size: usize) -> Arc<Config> {
        let mut config = Config::default();
        config.crawler.batch_size = batch_size;
        config.crawler.request_delay_ms = 0;
        config.site.base_url = "https://shop.example.com".to_string();
        config.site.catalog_url = CATALOG_URL.to_string();
        Arc::new(config)
    }

    fn catalog_page(slugs: &[&str]) -> String {
        let items: String = slugs
            .iter()
            .map(|slug| {
                format!(
                    r#"<li><a href="/category/{slug}/1/"><span class="title">{slug}</span></a></li>"#
                )
            })
            .collect();
        format!(r#"<html><body><ul class="category-list">{items}</ul></body></html>"#)
    }

    fn list_page(slug: &str, count: usize) -> String {
        let items: String = (0..count)
            .map(|i| {
                format!(
                    r#"<li><a href="/product/{slug}-{i}/"></a><p class="prd-name">product {i}</p></li>"#
                )
            })
            .collect();
        format!(r#"<html><body><ul class="prdList">{items}</ul></body></html>"#)
    }

    fn detail_page(description: &str, images: &[&str]) -> String {
        let imgs: String = images
            .iter()
            .map(|src| format!(r#"<img src="{src}">"#))
            .collect();
        format!(
            r#"<html><body>
            <div class="infoArea"><span class="code">CODE-1</span></div>
            <div class="product-description">{description}</div>
            <div class="xans-product-image">{imgs}</div>
            </body></html>"#
        )
    }

    fn ingestor(
        config: Arc<Config>,
        source: Arc<FakeSource>,
        store: Arc<MemoryStore>,
    ) -> Arc<Ingestor> {
        Arc::new(
            Ingestor::with_translator(config, source, store, Arc::new(UpperTranslator)).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let pages = vec![
            (CATALOG_URL, catalog_page(&["chairs"])),
            (
                "https://shop.example.com/category/chairs/1/",
                list_page("chairs", 2),
            ),
            (
                "https://shop.example.com/product/chairs-0/",
                detail_page("solid oak", &["/img/x_50x50.jpg", "/img/x_500x500.jpg"]),
            ),
            (
                "https://shop.example.com/product/chairs-1/",
                detail_page("walnut veneer", &["/img/y.jpg"]),
            ),
        ];
        let source = Arc::new(FakeSource::new(pages));
        let store = Arc::new(MemoryStore::default());
        let ingestor = ingestor(test_config(5), source.clone(), store.clone());

        let tracker = StatusTracker::new();
        let result = ingestor.run_to_completion(&tracker).await.unwrap();

        assert_eq!(result.categories_total, 1);
        assert_eq!(result.categories_failed, 0);
        assert_eq!(result.products_total, 2);
        assert_eq!(result.detail_attempted, 2);
        assert_eq!(result.detail_failed, 0);
        assert!(result.errors.is_empty());

        let products = store.products.lock().unwrap();
        let (record, category_id) = products
            .get("https://shop.example.com/product/chairs-0/")
            .unwrap();
        assert_eq!(category_id, "chairs");
        // The two size variants collapse to the larger one.
        assert_eq!(
            record.image_gallery,
            vec!["https://shop.example.com/img/x_500x500.jpg"]
        );
        assert_eq!(record.description_source.as_deref(), Some("solid oak"));
        assert_eq!(record.description_target.as_deref(), Some("SOLID OAK"));
        assert_eq!(record.name_target.as_deref(), Some("PRODUCT 0"));
        assert_eq!(record.product_code.as_deref(), Some("CODE-1"));

        let categories = store.categories.lock().unwrap();
        assert_eq!(
            categories.get("chairs").unwrap().name_target.as_deref(),
            Some("CHAIRS")
        );

        assert_eq!(tracker.snapshot().state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        // Product 3 has no detail page: its fetch fails, the other nine
        // enrich normally, and all ten records land.
        let mut pages = vec![
            (CATALOG_URL, catalog_page(&["chairs"])),
            (
                "https://shop.example.com/category/chairs/1/",
                list_page("chairs", 10),
            ),
        ];
        let detail_urls: Vec<String> = (0..10)
            .map(|i| format!("https://shop.example.com/product/chairs-{i}/"))
            .collect();
        for (i, url) in detail_urls.iter().enumerate() {
            if i != 3 {
                pages.push((url.as_str(), detail_page("desc", &["/img/a.jpg"])));
            }
        }

        let source = Arc::new(FakeSource::new(pages));
        let store = Arc::new(MemoryStore::default());
        let ingestor = ingestor(test_config(4), source, store.clone());

        let tracker = StatusTracker::new();
        let result = ingestor.run_to_completion(&tracker).await.unwrap();

        assert_eq!(result.products_total, 10);
        assert_eq!(result.detail_attempted, 10);
        assert_eq!(result.detail_failed, 1);
        assert!(result.errors.is_empty());

        let products = store.products.lock().unwrap();
        assert_eq!(products.len(), 10);
        // The failed product fell back to its summary record.
        let (fallback, _) = products.get(detail_urls[3].as_str()).unwrap();
        assert_eq!(fallback.name_source, "product 3");
        assert!(fallback.description_source.is_none());
    }

    #[tokio::test]
    async fn test_category_failure_does_not_abort_run() {
        let pages = vec![
            (CATALOG_URL, catalog_page(&["chairs", "tables"])),
            // chairs list page missing entirely
            (
                "https://shop.example.com/category/tables/1/",
                list_page("tables", 1),
            ),
            (
                "https://shop.example.com/product/tables-0/",
                detail_page("desc", &["/img/t.jpg"]),
            ),
        ];
        let source = Arc::new(FakeSource::new(pages));
        let store = Arc::new(MemoryStore::default());
        let ingestor = ingestor(test_config(2), source, store.clone());

        let tracker = StatusTracker::new();
        let result = ingestor.run_to_completion(&tracker).await.unwrap();

        assert_eq!(result.categories_total, 2);
        assert_eq!(result.categories_failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("chairs:"));
        assert_eq!(result.products_total, 1);
        assert_eq!(tracker.snapshot().state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_batch_bound_holds() {
        let mut pages = vec![
            (CATALOG_URL, catalog_page(&["chairs"])),
            (
                "https://shop.example.com/category/chairs/1/",
                list_page("chairs", 20),
            ),
        ];
        let detail_urls: Vec<String> = (0..20)
            .map(|i| format!("https://shop.example.com/product/chairs-{i}/"))
            .collect();
        for url in &detail_urls {
            pages.push((url.as_str(), detail_page("desc", &["/img/a.jpg"])));
        }

        let source = Arc::new(FakeSource::new(pages));
        let store = Arc::new(MemoryStore::default());
        let ingestor = ingestor(test_config(5), source.clone(), store);

        let tracker = StatusTracker::new();
        let result = ingestor.run_to_completion(&tracker).await.unwrap();

        assert_eq!(result.products_total, 20);
        assert!(
            source.max_in_flight.load(Ordering::SeqCst) <= 5,
            "no more than batch_size detail fetches may be in flight"
        );
    }

    #[tokio::test]
    async fn test_single_flight_trigger() {
        let pages = vec![
            (CATALOG_URL, catalog_page(&["chairs"])),
            (
                "https://shop.example.com/category/chairs/1/",
                list_page("chairs", 1),
            ),
            (
                "https://shop.example.com/product/chairs-0/",
                detail_page("desc", &["/img/a.jpg"]),
            ),
        ];
        let source = Arc::new(FakeSource::new(pages));
        let store = Arc::new(MemoryStore::default());
        let ingestor = ingestor(test_config(2), source.clone(), store);

        let tracker = StatusTracker::new();
        let first = Arc::clone(&ingestor).trigger(&tracker);
        let second = Arc::clone(&ingestor).trigger(&tracker);

        assert_eq!(first.state, RunState::Running);
        assert_eq!(second.state, RunState::Running);

        // Wait for the background run to finish.
        for _ in 0..200 {
            if tracker.snapshot().state != RunState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(tracker.snapshot().state, RunState::Completed);

        // Exactly one underlying category-fetch sequence ran.
        assert_eq!(source.hit_count(CATALOG_URL), 1);

        // A trigger after completion starts a fresh run.
        let third = Arc::clone(&ingestor).trigger(&tracker);
        assert_eq!(third.state, RunState::Running);
        for _ in 0..200 {
            if tracker.snapshot().state != RunState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(source.hit_count(CATALOG_URL), 2);
    }

    #[tokio::test]
    async fn test_detail_skip_when_summary_and_prior_suffice() {
        let list_html = r#"<html><body><ul class="prdList">
            <li><a href="/product/chairs-0/"><img src="/img/known.jpg"></a>
                <p class="prd-name">known product</p>
                <span class="product-code">CH-1</span></li>
        </ul></body></html>"#;

        let pages = vec![
            (CATALOG_URL, catalog_page(&["chairs"])),
            (
                "https://shop.example.com/category/chairs/1/",
                list_html.to_string(),
            ),
        ];
        let source = Arc::new(FakeSource::new(pages));
        let store = Arc::new(MemoryStore::default());

        // Seed the store with a fully described prior record.
        let prior = ProductRecord {
            description_source: Some("known description".to_string()),
            description_target: Some("KNOWN DESCRIPTION".to_string()),
            ..ProductRecord::from_summary(&RawProductSummary {
                name_source: "known product".to_string(),
                product_code: Some("CH-1".to_string()),
                detail_url: "https://shop.example.com/product/chairs-0/".to_string(),
                image_url: Some("https://shop.example.com/img/known.jpg".to_string()),
                price: None,
                dimensions: None,
                category_slug: "chairs".to_string(),
            })
        };
        store
            .products
            .lock()
            .unwrap()
            .insert(prior.detail_url.clone(), (prior, "chairs".to_string()));

        let ingestor = ingestor(test_config(2), source.clone(), store.clone());
        let tracker = StatusTracker::new();
        let result = ingestor.run_to_completion(&tracker).await.unwrap();

        assert_eq!(result.products_total, 1);
        assert_eq!(result.detail_attempted, 0, "sufficient data skips the detail fetch");
        assert_eq!(
            source.hit_count("https://shop.example.com/product/chairs-0/"),
            0
        );

        // The stored description survived the summary-only pass.
        let products = store.products.lock().unwrap();
        let (record, _) = products
            .get("https://shop.example.com/product/chairs-0/")
            .unwrap();
        assert_eq!(
            record.description_source.as_deref(),
            Some("known description")
        );
        assert_eq!(
            record.description_target.as_deref(),
            Some("KNOWN DESCRIPTION")
        );
    }
}
