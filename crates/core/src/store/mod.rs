//! SQLite-backed store for scraped research pages.
//!
//! This module provides persistent, deduplicated storage using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Idempotent page storage keyed by (url, company)
//! - Content fingerprinting using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Atomic reuse counting, usage provenance, and dedup metrics
//! - Stale-page and domain purges

pub mod connection;
pub mod hash;
pub mod metrics;
pub mod migrations;
pub mod pages;
pub mod usage;

pub use crate::Error;

pub use connection::ResearchDb;
pub use metrics::{DedupSummary, MetricsSample};
pub use pages::{
    ContentAnnotations, MAX_BATCH_URLS, NewScrapedPage, PageStats, ProcessingStatus,
    ResearchContext, ScrapedPage, SourceMethod, StoreOutcome,
};
pub use usage::{UsageKind, UsageRecord};
