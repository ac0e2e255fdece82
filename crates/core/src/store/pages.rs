//! Scraped-page CRUD operations.
//!
//! One row per (url, company) pair. Insertion is idempotent: writers that
//! race to store the same page resolve the uniqueness conflict to
//! `AlreadyKnown` instead of an error, so storage converges no matter how
//! many request handlers submit the same search results.

use super::connection::ResearchDb;
use super::hash::content_fingerprint;
use crate::Error;
use crate::quality::ContentType;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Maximum URLs accepted by a single batch lookup. Input beyond the cap
/// is truncated so caller-supplied volume cannot blow up query cost.
pub const MAX_BATCH_URLS: usize = 20;

/// Current version written into new annotation payloads.
pub const ANNOTATIONS_VERSION: u32 = 1;

/// The (company, role, country) tuple a stored page was scraped for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchContext {
    pub company: String,
    pub role: Option<String>,
    pub country: Option<String>,
}

impl ResearchContext {
    /// Context with only the company set.
    pub fn for_company(company: impl Into<String>) -> Self {
        Self { company: company.into(), ..Default::default() }
    }
}

/// Pipeline position of a stored page.
///
/// Transitions only move forward (raw, processed, analyzed); any
/// non-failed state may additionally move to failed. There is no path
/// out of failed short of re-scraping under a fresh row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Raw,
    Processed,
    Analyzed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Raw => "raw",
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Analyzed => "analyzed",
            ProcessingStatus::Failed => "failed",
        }
    }

    /// Parse a stored status; unknown values fall back to `Raw`, which
    /// forces reprocessing rather than trusting a corrupt row.
    pub fn parse(s: &str) -> Self {
        match s {
            "processed" => ProcessingStatus::Processed,
            "analyzed" => ProcessingStatus::Analyzed,
            "failed" => ProcessingStatus::Failed,
            _ => ProcessingStatus::Raw,
        }
    }

    /// States an update may transition from when moving to `self`.
    fn allowed_predecessors(&self) -> &'static [&'static str] {
        match self {
            ProcessingStatus::Raw => &[],
            ProcessingStatus::Processed => &["raw"],
            ProcessingStatus::Analyzed => &["raw", "processed"],
            ProcessingStatus::Failed => &["raw", "processed", "analyzed"],
        }
    }
}

/// How a page entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    SearchResult,
    DeepExtract,
    Manual,
}

impl SourceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMethod::SearchResult => "search_result",
            SourceMethod::DeepExtract => "deep_extract",
            SourceMethod::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "deep_extract" => SourceMethod::DeepExtract,
            "manual" => SourceMethod::Manual,
            _ => SourceMethod::SearchResult,
        }
    }
}

/// Structured annotations produced by the analysis workflow.
///
/// `version` is the annotation schema version, kept so old rows stay
/// readable if the payload shape evolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnnotations {
    pub version: u32,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl ContentAnnotations {
    pub fn new(questions: Vec<String>, insights: Vec<String>) -> Self {
        Self { version: ANNOTATIONS_VERSION, questions, insights }
    }
}

/// A stored research page with all scrape and reuse metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub content_hash: String,
    pub company: String,
    pub role: Option<String>,
    pub country: Option<String>,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub content_type: ContentType,
    pub raw_content: Option<String>,
    pub summary: Option<String>,
    pub annotations: Option<ContentAnnotations>,
    pub quality_score: f64,
    pub status: ProcessingStatus,
    pub reuse_count: i64,
    pub first_seen_at: String,
    pub last_reused_at: Option<String>,
    pub word_count: i64,
    pub source: SourceMethod,
}

/// A page as first handed to the store, before deep extraction.
#[derive(Debug, Clone)]
pub struct NewScrapedPage {
    pub url: String,
    pub context: ResearchContext,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub content_type: ContentType,
    pub raw_content: Option<String>,
    pub quality_score: f64,
    pub source: SourceMethod,
}

/// Result of an insert attempt.
///
/// `AlreadyKnown` is the expected outcome when concurrent requests race
/// to store the same page; it carries the surviving row's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted(i64),
    AlreadyKnown(i64),
}

impl StoreOutcome {
    /// Row id regardless of which writer won.
    pub fn id(&self) -> i64 {
        match self {
            StoreOutcome::Inserted(id) | StoreOutcome::AlreadyKnown(id) => *id,
        }
    }
}

/// Store-level totals for dashboards and purge decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageStats {
    pub total_pages: u64,
    pub pages_with_content: u64,
    pub total_reuses: u64,
    pub avg_quality: f64,
}

const PAGE_COLUMNS: &str = "id, url, domain, content_hash, company, role, country, title, snippet,
     content_type, raw_content, summary, annotations_json, quality_score,
     processing_status, reuse_count, first_seen_at, last_reused_at, word_count, source";

fn row_to_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScrapedPage> {
    let content_type: String = row.get(9)?;
    let annotations_json: Option<String> = row.get(12)?;
    let annotations = match annotations_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };
    let status: String = row.get(14)?;
    let source: String = row.get(19)?;

    Ok(ScrapedPage {
        id: row.get(0)?,
        url: row.get(1)?,
        domain: row.get(2)?,
        content_hash: row.get(3)?,
        company: row.get(4)?,
        role: row.get(5)?,
        country: row.get(6)?,
        title: row.get(7)?,
        snippet: row.get(8)?,
        content_type: ContentType::parse(&content_type),
        raw_content: row.get(10)?,
        summary: row.get(11)?,
        annotations,
        quality_score: row.get(13)?,
        status: ProcessingStatus::parse(&status),
        reuse_count: row.get(15)?,
        first_seen_at: row.get(16)?,
        last_reused_at: row.get(17)?,
        word_count: row.get(18)?,
        source: SourceMethod::parse(&source),
    })
}

fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h).to_ascii_lowercase()))
        .unwrap_or_default()
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

impl ResearchDb {
    /// Store a newly scraped page.
    ///
    /// Racing inserts for the same (url, company) pair are expected: the
    /// constraint hit resolves to `AlreadyKnown` with the surviving row's
    /// id and is logged at debug level, never surfaced as an error.
    pub async fn insert_page(&self, page: &NewScrapedPage) -> Result<StoreOutcome, Error> {
        let page = page.clone();
        self.conn
            .call(move |conn| -> Result<StoreOutcome, Error> {
                let domain = domain_of(&page.url);
                let fingerprint =
                    content_fingerprint(page.raw_content.as_deref().unwrap_or(&page.url));
                let word_count = page.raw_content.as_deref().map(count_words).unwrap_or(0) as i64;
                let now = Utc::now().to_rfc3339();

                let changed = conn.execute(
                    "INSERT INTO scraped_pages (
                        url, domain, content_hash, company, role, country,
                        title, snippet, content_type, raw_content,
                        quality_score, processing_status, first_seen_at, word_count, source
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                    ON CONFLICT (url, company) DO NOTHING",
                    params![
                        &page.url,
                        &domain,
                        &fingerprint,
                        &page.context.company,
                        &page.context.role,
                        &page.context.country,
                        &page.title,
                        &page.snippet,
                        page.content_type.as_str(),
                        &page.raw_content,
                        page.quality_score,
                        ProcessingStatus::Raw.as_str(),
                        &now,
                        word_count,
                        page.source.as_str(),
                    ],
                )?;

                if changed == 0 {
                    let id: i64 = conn.query_row(
                        "SELECT id FROM scraped_pages WHERE url = ?1 AND company = ?2",
                        params![&page.url, &page.context.company],
                        |row| row.get(0),
                    )?;
                    tracing::debug!(url = %page.url, company = %page.context.company, id, "page already stored");
                    return Ok(StoreOutcome::AlreadyKnown(id));
                }

                Ok(StoreOutcome::Inserted(conn.last_insert_rowid()))
            })
            .await
            .map_err(Error::from)
    }

    /// Get a page by id.
    ///
    /// Returns None if the id doesn't exist.
    pub async fn get_page(&self, id: i64) -> Result<Option<ScrapedPage>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<ScrapedPage>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {PAGE_COLUMNS} FROM scraped_pages WHERE id = ?1"))?;
                let result = stmt.query_row(params![id], row_to_page);

                match result {
                    Ok(page) => Ok(Some(page)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Fetch previously stored pages for a batch of URLs.
    ///
    /// Empty input returns without touching the store. Input beyond
    /// [`MAX_BATCH_URLS`] is truncated before the query. Only rows that
    /// actually carry extracted content come back; a URL known to the
    /// store but never extracted is not a usable hit.
    pub async fn get_by_urls(&self, urls: &[String], company: &str) -> Result<Vec<ScrapedPage>, Error> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let urls: Vec<String> = urls.iter().take(MAX_BATCH_URLS).cloned().collect();
        let company = company.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<ScrapedPage>, Error> {
                let placeholders =
                    (2..=urls.len() + 1).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PAGE_COLUMNS} FROM scraped_pages
                     WHERE company = ?1
                       AND raw_content IS NOT NULL AND raw_content != ''
                       AND url IN ({placeholders})"
                ))?;

                let rows = stmt.query_map(
                    rusqlite::params_from_iter(std::iter::once(company).chain(urls)),
                    row_to_page,
                )?;

                let mut pages = Vec::new();
                for row in rows {
                    pages.push(row?);
                }
                Ok(pages)
            })
            .await
            .map_err(Error::from)
    }

    /// Attach extracted content to an existing page.
    ///
    /// Recomputes the fingerprint and word count, and advances raw pages
    /// to `processed`; pages already past `processed` keep their status.
    /// Returns false when no row has that id.
    pub async fn update_content(
        &self,
        id: i64,
        content: &str,
        summary: &str,
        annotations: &ContentAnnotations,
    ) -> Result<bool, Error> {
        let content = content.to_string();
        let summary = summary.to_string();
        let annotations_json = serde_json::to_string(annotations)
            .map_err(|e| Error::InvalidInput(format!("annotations: {e}")))?;

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let fingerprint = content_fingerprint(&content);
                let word_count = count_words(&content) as i64;
                let changed = conn.execute(
                    "UPDATE scraped_pages SET
                        raw_content = ?2,
                        summary = ?3,
                        annotations_json = ?4,
                        content_hash = ?5,
                        word_count = ?6,
                        processing_status = CASE processing_status
                            WHEN 'raw' THEN 'processed'
                            ELSE processing_status
                        END
                     WHERE id = ?1",
                    params![id, &content, &summary, &annotations_json, &fingerprint, word_count],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Move a page's processing status forward.
    ///
    /// Returns false when the transition would regress the lifecycle or
    /// the id is unknown; the row is left untouched in that case.
    pub async fn advance_status(&self, id: i64, status: ProcessingStatus) -> Result<bool, Error> {
        let allowed = status.allowed_predecessors();
        if allowed.is_empty() {
            return Ok(false);
        }

        // Predecessor names are static literals, safe to inline.
        let from_list = allowed.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", ");
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changed = conn.execute(
                    &format!(
                        "UPDATE scraped_pages SET processing_status = ?2
                         WHERE id = ?1 AND processing_status IN ({from_list})"
                    ),
                    params![id, status.as_str()],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Bump a page's reuse counter and stamp the reuse time.
    ///
    /// Single statement, so concurrent bumps serialize in the store and
    /// none are lost.
    pub async fn increment_reuse(&self, id: i64) -> Result<(), Error> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE scraped_pages
                     SET reuse_count = reuse_count + 1, last_reused_at = ?2
                     WHERE id = ?1",
                    params![id, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Query pages worth reusing for a fresh research request.
    ///
    /// Returns the capped, ranked rows plus the uncapped qualifying
    /// count. Quality ranks first; among equals, pages that have proven
    /// useful before win. Only rows carrying extracted content qualify:
    /// a known URL with nothing stored cannot be served from cache.
    pub async fn select_reusable(
        &self,
        company: &str,
        role: Option<&str>,
        min_quality: f64,
        max_age_days: i64,
        limit: usize,
    ) -> Result<(Vec<ScrapedPage>, u64), Error> {
        let company = company.to_string();
        let role = role.map(|r| format!("%{r}%"));
        let cutoff = (Utc::now() - Duration::days(max_age_days)).to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(Vec<ScrapedPage>, u64), Error> {
                let filter = "company = ?1
                       AND (?2 IS NULL OR role LIKE ?2)
                       AND quality_score >= ?3
                       AND first_seen_at >= ?4
                       AND raw_content IS NOT NULL AND raw_content != ''";

                let mut stmt = conn.prepare(&format!(
                    "SELECT {PAGE_COLUMNS} FROM scraped_pages
                     WHERE {filter}
                     ORDER BY quality_score DESC, reuse_count DESC
                     LIMIT ?5"
                ))?;
                let rows = stmt.query_map(
                    params![company, role, min_quality, cutoff, limit as i64],
                    row_to_page,
                )?;

                let mut pages = Vec::new();
                for row in rows {
                    pages.push(row?);
                }

                let total: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM scraped_pages WHERE {filter}"),
                    params![company, role, min_quality, cutoff],
                    |row| row.get(0),
                )?;

                Ok((pages, total as u64))
            })
            .await
            .map_err(Error::from)
    }

    /// Delete old, low-quality pages that never earned a reuse.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_stale(&self, max_age_days: i64, min_quality: f64) -> Result<u64, Error> {
        let cutoff = (Utc::now() - Duration::days(max_age_days)).to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute(
                    "DELETE FROM scraped_pages
                     WHERE first_seen_at < ?1 AND quality_score < ?2 AND reuse_count = 0",
                    params![cutoff, min_quality],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every page on a domain, subdomains included.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_by_domain(&self, domain: &str) -> Result<u64, Error> {
        let exact = domain.to_ascii_lowercase();
        let suffix = format!("%.{exact}");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute(
                    "DELETE FROM scraped_pages WHERE domain = ?1 OR domain LIKE ?2",
                    params![exact, suffix],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Store-level totals.
    pub async fn page_stats(&self) -> Result<PageStats, Error> {
        self.conn
            .call(|conn| -> Result<PageStats, Error> {
                conn.query_row(
                    "SELECT COUNT(*),
                            COUNT(CASE WHEN raw_content IS NOT NULL AND raw_content != '' THEN 1 END),
                            COALESCE(SUM(reuse_count), 0),
                            COALESCE(AVG(quality_score), 0.0)
                     FROM scraped_pages",
                    [],
                    |row| {
                        Ok(PageStats {
                            total_pages: row.get::<_, i64>(0)? as u64,
                            pages_with_content: row.get::<_, i64>(1)? as u64,
                            total_reuses: row.get::<_, i64>(2)? as u64,
                            avg_quality: row.get(3)?,
                        })
                    },
                )
                .map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }
}
