//! Research dedup and caching engine for interview-prep research.
//!
//! This crate decides which previously scraped pages a (company, role,
//! country) research request can reuse instead of re-fetching, scores
//! stored content, and tracks reuse provenance and savings:
//!
//! - Store: idempotent page storage with SQLite backend
//! - Quality: deterministic content scoring and classification
//! - Reuse: ranked selection under a hard latency budget
//! - Recorder: fail-soft usage and metrics bookkeeping
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod quality;
pub mod recorder;
pub mod reuse;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use quality::{ContentType, QualityScorer, QualityWeights};
pub use recorder::UsageRecorder;
pub use reuse::{ReuseRequest, ReuseSelection, ReuseSelector};
pub use store::{
    ContentAnnotations, NewScrapedPage, ProcessingStatus, ResearchContext, ResearchDb, ScrapedPage,
    SourceMethod, StoreOutcome, UsageKind,
};
