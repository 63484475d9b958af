// src/models/mod.rs

//! Domain models for the ingestion application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod run;

// Re-export all public types
pub use catalog::{
    CategoryRecord, ColorOption, ProductDetail, ProductRecord, RawCategory, RawProductSummary,
    SceneImage,
};
pub use config::{Config, CrawlerConfig, ImageConfig, SiteConfig, TranslationConfig};
pub use run::{CrawlRun, RunResult, RunState};
