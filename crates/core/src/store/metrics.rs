//! Deduplication savings metrics.
//!
//! Append-only samples, one per reuse-selector invocation, answering
//! "how much search and scraping did the cache save us". Writers on the
//! research path treat failures here as log-and-continue; nothing reads
//! these rows to make decisions.

use super::connection::ResearchDb;
use crate::Error;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// One reuse-selector invocation's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// URLs served from the store.
    pub cache_hits: u64,
    /// URLs the request wanted in total.
    pub total_needed: u64,
    /// Wall-clock time of the lookup.
    pub response_ms: u64,
    /// External API calls the hits avoided.
    pub api_calls_saved: u64,
}

/// Aggregate over a metrics window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DedupSummary {
    pub samples: u64,
    pub cache_hits: u64,
    pub total_needed: u64,
    pub api_calls_saved: u64,
    pub avg_response_ms: f64,
    /// cache_hits over total_needed; 0 when nothing was needed.
    pub hit_rate: f64,
}

impl ResearchDb {
    /// Append one metrics sample. Returns the row id.
    pub async fn insert_metrics(&self, sample: &MetricsSample) -> Result<i64, Error> {
        let sample = *sample;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO dedup_metrics (
                        cache_hits, total_needed, response_ms, api_calls_saved, recorded_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        sample.cache_hits as i64,
                        sample.total_needed as i64,
                        sample.response_ms as i64,
                        sample.api_calls_saved as i64,
                        now
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// Aggregate the samples recorded over the past `since_days` days.
    pub async fn metrics_summary(&self, since_days: i64) -> Result<DedupSummary, Error> {
        let cutoff = (Utc::now() - Duration::days(since_days)).to_rfc3339();
        self.conn
            .call(move |conn| -> Result<DedupSummary, Error> {
                let (samples, hits, needed, saved, avg_ms) = conn
                    .query_row(
                        "SELECT COUNT(*),
                                COALESCE(SUM(cache_hits), 0),
                                COALESCE(SUM(total_needed), 0),
                                COALESCE(SUM(api_calls_saved), 0),
                                COALESCE(AVG(response_ms), 0.0)
                         FROM dedup_metrics WHERE recorded_at >= ?1",
                        params![cutoff],
                        |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, i64>(3)?,
                                row.get::<_, f64>(4)?,
                            ))
                        },
                    )
                    .map_err(Error::from)?;

                let hit_rate = if needed > 0 { hits as f64 / needed as f64 } else { 0.0 };
                Ok(DedupSummary {
                    samples: samples as u64,
                    cache_hits: hits as u64,
                    total_needed: needed as u64,
                    api_calls_saved: saved as u64,
                    avg_response_ms: avg_ms,
                    hit_rate,
                })
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hits: u64, needed: u64, ms: u64) -> MetricsSample {
        MetricsSample {
            cache_hits: hits,
            total_needed: needed,
            response_ms: ms,
            api_calls_saved: hits,
        }
    }

    #[tokio::test]
    async fn test_insert_and_summarize() {
        let db = ResearchDb::open_in_memory().await.unwrap();
        db.insert_metrics(&sample(3, 10, 40)).await.unwrap();
        db.insert_metrics(&sample(7, 10, 60)).await.unwrap();

        let summary = db.metrics_summary(7).await.unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.cache_hits, 10);
        assert_eq!(summary.total_needed, 20);
        assert_eq!(summary.api_calls_saved, 10);
        assert!((summary.avg_response_ms - 50.0).abs() < 1e-9);
        assert!((summary.hit_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summary_empty_window() {
        let db = ResearchDb::open_in_memory().await.unwrap();
        let summary = db.metrics_summary(7).await.unwrap();
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.hit_rate, 0.0);
        assert_eq!(summary.avg_response_ms, 0.0);
    }

    #[tokio::test]
    async fn test_summary_window_excludes_old_samples() {
        let db = ResearchDb::open_in_memory().await.unwrap();
        let id = db.insert_metrics(&sample(5, 5, 30)).await.unwrap();

        let old = (Utc::now() - Duration::days(10)).to_rfc3339();
        db.conn
            .call(move |conn| -> tokio_rusqlite::rusqlite::Result<()> {
                conn.execute(
                    "UPDATE dedup_metrics SET recorded_at = ?1 WHERE id = ?2",
                    params![old, id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let summary = db.metrics_summary(7).await.unwrap();
        assert_eq!(summary.samples, 0);

        let summary = db.metrics_summary(30).await.unwrap();
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.cache_hits, 5);
    }
}
