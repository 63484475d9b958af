// src/services/mod.rs

//! Services: fetching, extraction, image canonicalization, translation.

pub mod extract;
pub mod fetcher;
pub mod images;
pub mod translation;

pub use extract::Extractor;
pub use fetcher::{FetchError, PageFetcher, PageSource};
pub use images::{ImageCandidate, ImageResolver, ResolvedGallery, SizeVariant};
pub use translation::{
    Decision, DisabledTranslator, FieldTranslation, HttpTranslator, MemoOutcome, TranslationMemo,
    TranslationService, decide, service_from_config,
};
