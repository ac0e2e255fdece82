//! Reuse selection for incoming research requests.
//!
//! Given a new (company, role, country) research request, decides which
//! previously scraped pages the caller may skip re-fetching. Reuse is a
//! cost optimization, never a correctness dependency: the selector
//! degrades to "nothing reusable" on any store failure and enforces a
//! hard latency budget so a slow store cannot stall the request path.

use std::time::{Duration, Instant};

use serde::Serialize;
use url::Url;

use crate::Error;
use crate::config::AppConfig;
use crate::store::{MetricsSample, ResearchDb};

/// Deadline for the post-lookup metrics write. Bounded on its own so a
/// store that just blew the lookup budget cannot hold the caller here.
const METRICS_WRITE_BUDGET: Duration = Duration::from_millis(250);

/// Parameters for one reuse lookup.
#[derive(Debug, Clone)]
pub struct ReuseRequest {
    pub company: String,
    /// Optional role substring match against stored rows.
    pub role: Option<String>,
    /// Carried for provenance; the store query does not filter on it.
    pub country: Option<String>,
    pub max_age_days: i64,
    pub min_quality: f64,
    pub limit: usize,
}

impl ReuseRequest {
    /// Request for a company with the configured defaults.
    pub fn for_company(company: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            company: company.into(),
            role: None,
            country: None,
            max_age_days: config.max_age_days,
            min_quality: config.min_quality_score,
            limit: config.reuse_limit,
        }
    }
}

/// What a reuse lookup found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReuseSelection {
    /// Reusable URLs, best quality first.
    pub urls: Vec<String>,
    /// Distinct domains of the reusable URLs, for the caller to exclude
    /// from its fresh search.
    pub excluded_domains: Vec<String>,
    /// Qualifying rows before the cap; tells "limit reached" apart from
    /// "store exhausted".
    pub total_count: u64,
}

/// Picks reusable pages for research requests within a latency budget.
#[derive(Debug, Clone)]
pub struct ReuseSelector {
    db: ResearchDb,
    budget: Duration,
    max_limit: usize,
}

impl ReuseSelector {
    pub fn new(db: ResearchDb, config: &AppConfig) -> Self {
        Self { db, budget: config.selector_timeout(), max_limit: config.reuse_limit }
    }

    /// Find pages the caller may skip re-fetching.
    ///
    /// Never fails: a slow or broken store yields an empty selection and
    /// a warning, and the caller proceeds with fresh research. The
    /// requested limit is clamped to the configured `reuse_limit`, and a
    /// metrics sample is emitted best-effort either way, under its own
    /// short deadline.
    pub async fn find_reusable(&self, req: &ReuseRequest) -> ReuseSelection {
        let start = Instant::now();
        let limit = req.limit.min(self.max_limit);
        let query = self.db.select_reusable(
            &req.company,
            req.role.as_deref(),
            req.min_quality,
            req.max_age_days,
            limit,
        );

        let selection = match with_deadline(self.budget, query).await {
            Ok(Ok((pages, total_count))) => {
                let urls: Vec<String> = pages.into_iter().map(|p| p.url).collect();
                let excluded_domains = unique_domains(&urls);
                ReuseSelection { urls, excluded_domains, total_count }
            }
            Ok(Err(e)) => {
                tracing::warn!(company = %req.company, error = %e, "reuse lookup failed, continuing without cache");
                ReuseSelection::default()
            }
            Err(e) => {
                tracing::warn!(company = %req.company, error = %e, "reuse lookup timed out, continuing without cache");
                ReuseSelection::default()
            }
        };

        let hits = selection.urls.len() as u64;
        let sample = MetricsSample {
            cache_hits: hits,
            total_needed: limit as u64,
            response_ms: start.elapsed().as_millis() as u64,
            api_calls_saved: hits,
        };
        match with_deadline(METRICS_WRITE_BUDGET, self.db.insert_metrics(&sample)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) | Err(e) => {
                tracing::warn!(error = %e, "failed to record dedup metrics");
            }
        }

        tracing::debug!(
            company = %req.company,
            hits,
            total = selection.total_count,
            "reuse selection complete"
        );
        selection
    }
}

/// Race a future against a wall-clock budget.
async fn with_deadline<T>(
    budget: Duration,
    fut: impl std::future::Future<Output = T>,
) -> Result<T, Error> {
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| Error::Timeout(budget.as_millis() as u64))
}

/// Distinct hosts of the selected URLs, selection order preserved.
/// Unparseable URLs are skipped rather than failing the selection.
fn unique_domains(urls: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    for url in urls {
        if let Ok(parsed) = Url::parse(url)
            && let Some(host) = parsed.host_str()
        {
            let host = host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase();
            if !domains.contains(&host) {
                domains.push(host);
            }
        }
    }
    domains
}
