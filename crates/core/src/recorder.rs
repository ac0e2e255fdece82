//! Fail-soft provenance and metrics recording.
//!
//! Everything here runs off the caller's critical path: a failed write
//! costs observability, never research results. Store errors are logged
//! and dropped instead of propagated, so a research request cannot fail
//! because its bookkeeping did.

use crate::store::{MetricsSample, ResearchDb, UsageKind};

/// Records which stored pages served which requests, and the savings the
/// cache produced.
#[derive(Debug, Clone)]
pub struct UsageRecorder {
    db: ResearchDb,
}

impl UsageRecorder {
    pub fn new(db: ResearchDb) -> Self {
        Self { db }
    }

    /// Record that a request consumed a page.
    ///
    /// A `Reused` usage also bumps the page's reuse counter, but only
    /// when this call actually wrote the record, so retried submissions
    /// cannot double-count. Returns whether a new record was written;
    /// store failures are logged and swallowed.
    pub async fn record_usage(
        &self,
        request_id: &str,
        page_id: i64,
        kind: UsageKind,
        relevance_score: f64,
        contributed: bool,
    ) -> bool {
        let written = match self
            .db
            .insert_usage(request_id, page_id, kind, relevance_score, contributed)
            .await
        {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(request_id, page_id, error = %e, "failed to record page usage");
                return false;
            }
        };

        if written
            && kind == UsageKind::Reused
            && let Err(e) = self.db.increment_reuse(page_id).await
        {
            tracing::warn!(page_id, error = %e, "failed to bump reuse counter");
        }

        written
    }

    /// Append a dedup metrics sample, best effort.
    pub async fn record_metrics(&self, sample: &MetricsSample) {
        if let Err(e) = self.db.insert_metrics(sample).await {
            tracing::warn!(error = %e, "failed to record dedup metrics");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::ContentType;
    use crate::store::{NewScrapedPage, ResearchContext, SourceMethod};
    use tokio_rusqlite::rusqlite;

    async fn recorder_with_page() -> (UsageRecorder, ResearchDb, i64) {
        let db = ResearchDb::open_in_memory().await.unwrap();
        let page = NewScrapedPage {
            url: "https://glassdoor.com/r/1".to_string(),
            context: ResearchContext::for_company("Acme"),
            title: None,
            snippet: None,
            content_type: ContentType::InterviewReview,
            raw_content: Some("three rounds then an offer".to_string()),
            quality_score: 0.7,
            source: SourceMethod::SearchResult,
        };
        let id = db.insert_page(&page).await.unwrap().id();
        (UsageRecorder::new(db.clone()), db, id)
    }

    #[tokio::test]
    async fn test_reused_usage_increments_counter() {
        let (recorder, db, page_id) = recorder_with_page().await;

        let written = recorder.record_usage("req-1", page_id, UsageKind::Reused, 0.9, true).await;
        assert!(written);

        let page = db.get_page(page_id).await.unwrap().unwrap();
        assert_eq!(page.reuse_count, 1);
        assert!(page.last_reused_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_usage_does_not_double_count() {
        let (recorder, db, page_id) = recorder_with_page().await;

        assert!(recorder.record_usage("req-1", page_id, UsageKind::Reused, 0.9, true).await);
        assert!(!recorder.record_usage("req-1", page_id, UsageKind::Reused, 0.9, true).await);

        let page = db.get_page(page_id).await.unwrap().unwrap();
        assert_eq!(page.reuse_count, 1);
    }

    #[tokio::test]
    async fn test_fresh_scrape_does_not_increment() {
        let (recorder, db, page_id) = recorder_with_page().await;

        assert!(recorder.record_usage("req-1", page_id, UsageKind::FreshScrape, 0.5, true).await);

        let page = db.get_page(page_id).await.unwrap().unwrap();
        assert_eq!(page.reuse_count, 0);
        assert!(page.last_reused_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_page_swallowed() {
        let (recorder, _db, _page_id) = recorder_with_page().await;
        let written = recorder.record_usage("req-1", 9999, UsageKind::Reused, 0.9, true).await;
        assert!(!written);
    }

    #[tokio::test]
    async fn test_record_metrics_best_effort() {
        let (recorder, db, _page_id) = recorder_with_page().await;
        let sample =
            MetricsSample { cache_hits: 4, total_needed: 10, response_ms: 25, api_calls_saved: 4 };

        recorder.record_metrics(&sample).await;
        let summary = db.metrics_summary(1).await.unwrap();
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.cache_hits, 4);

        // A broken metrics table degrades to a logged warning, not a panic.
        db.conn
            .call(|conn| -> rusqlite::Result<()> {
                conn.execute_batch("DROP TABLE dedup_metrics")?;
                Ok(())
            })
            .await
            .unwrap();
        recorder.record_metrics(&sample).await;
    }
}
