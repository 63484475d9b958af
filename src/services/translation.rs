//! Translation service client and change-aware memoization.
//!
//! Re-crawling an unchanged source page must not re-invoke the paid
//! translation provider: every text field is compared against its previously
//! stored source before any network call, and only changed fields go out,
//! in one batched request.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::TranslationConfig;

/// Per-field translation input: the current source text and what was stored
/// for it last time, if anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTranslation {
    pub source: String,
    pub prior_source: Option<String>,
    pub prior_translated: Option<String>,
}

impl FieldTranslation {
    /// A field with no prior record.
    pub fn fresh(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            prior_source: None,
            prior_translated: None,
        }
    }
}

/// Outcome of the memoization decision for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The stored translation is still valid
    Skip,
    /// The source changed or was never translated
    Translate,
}

/// Decide whether a field needs a translation call.
///
/// `Skip` iff a prior translation exists and the prior source text matches
/// the current source exactly. No fuzzy comparison.
pub fn decide(field: &FieldTranslation) -> Decision {
    if field.prior_translated.is_some() && field.prior_source.as_deref() == Some(&field.source) {
        Decision::Skip
    } else {
        Decision::Translate
    }
}

/// External translation provider.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translate a single text.
    async fn translate(&self, text: &str) -> Result<Option<String>>;

    /// Translate a batch, preserving input order and length.
    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<Option<String>>>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    texts: &'a [String],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<Option<String>>,
}

/// REST client for the configured translation endpoint.
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    source_lang: String,
    target_lang: String,
}

impl HttpTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
        })
    }
}

#[async_trait]
impl TranslationService for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<Option<String>> {
        let mut result = self.translate_batch(&[text.to_string()]).await?;
        Ok(result.pop().flatten())
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<Option<String>>> {
        let request = TranslateRequest {
            texts,
            source_lang: &self.source_lang,
            target_lang: &self.target_lang,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: TranslateResponse = response.json().await?;
        if body.translations.len() != texts.len() {
            return Err(AppError::translation(format!(
                "provider returned {} translations for {} texts",
                body.translations.len(),
                texts.len()
            )));
        }
        Ok(body.translations)
    }
}

/// No-op provider used when no endpoint is configured.
pub struct DisabledTranslator;

#[async_trait]
impl TranslationService for DisabledTranslator {
    async fn translate(&self, _text: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<Option<String>>> {
        Ok(vec![None; texts.len()])
    }
}

/// Build the provider implied by the configuration.
pub fn service_from_config(config: &TranslationConfig) -> Result<Arc<dyn TranslationService>> {
    if config.endpoint.trim().is_empty() {
        log::info!("Translation endpoint not configured; running untranslated");
        Ok(Arc::new(DisabledTranslator))
    } else {
        Ok(Arc::new(HttpTranslator::new(config)?))
    }
}

/// Aggregate outcome of one memoized field pass.
#[derive(Debug, Clone, Default)]
pub struct MemoOutcome {
    /// Resolved target text per input field, in input order
    pub values: Vec<Option<String>>,

    /// Fields sent to the provider
    pub translated: usize,

    /// Fields whose stored translation was reused
    pub skipped: usize,
}

/// Change-aware memoization layer over a [`TranslationService`].
#[derive(Clone)]
pub struct TranslationMemo {
    service: Arc<dyn TranslationService>,
    batch_limit: usize,
}

impl TranslationMemo {
    pub fn new(service: Arc<dyn TranslationService>, batch_limit: usize) -> Self {
        Self {
            service,
            batch_limit: batch_limit.max(1),
        }
    }

    /// Translate a batch of texts, preserving input order and length.
    ///
    /// Empty and whitespace-only entries pass through as `None` without
    /// reaching the provider. A provider error yields `None` for every entry
    /// of the failed chunk and is never fatal.
    pub async fn translate_batch(&self, texts: &[String]) -> Vec<Option<String>> {
        let mut values: Vec<Option<String>> = vec![None; texts.len()];

        let pending: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i, text.clone()))
            .collect();

        for chunk in pending.chunks(self.batch_limit) {
            let chunk_texts: Vec<String> = chunk.iter().map(|(_, t)| t.clone()).collect();
            match self.service.translate_batch(&chunk_texts).await {
                Ok(translations) => {
                    for ((index, _), translated) in chunk.iter().zip(translations) {
                        values[*index] = translated;
                    }
                }
                Err(e) => {
                    log::warn!("Translation batch of {} failed: {}", chunk.len(), e);
                }
            }
        }

        values
    }

    /// Resolve a list of fields: skip unchanged ones, translate the rest in
    /// one batched pass, and reinsert results at their original index.
    ///
    /// On skip, and on provider failure, the prior translated value is
    /// carried when available.
    pub async fn resolve_fields(&self, fields: &[FieldTranslation]) -> MemoOutcome {
        let mut outcome = MemoOutcome {
            values: vec![None; fields.len()],
            ..MemoOutcome::default()
        };

        let mut pending: Vec<usize> = Vec::new();
        for (index, field) in fields.iter().enumerate() {
            match decide(field) {
                Decision::Skip => {
                    outcome.values[index] = field.prior_translated.clone();
                    outcome.skipped += 1;
                }
                Decision::Translate => pending.push(index),
            }
        }

        if pending.is_empty() {
            return outcome;
        }

        let texts: Vec<String> = pending.iter().map(|&i| fields[i].source.clone()).collect();
        let translated = self.translate_batch(&texts).await;
        outcome.translated = pending.len();

        for (&index, value) in pending.iter().zip(translated) {
            outcome.values[index] = value.or_else(|| fields[index].prior_translated.clone());
        }

        outcome
    }
}
