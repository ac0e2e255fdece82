//! Usage provenance records.
//!
//! One immutable row per (request, page) pair, linking a research request
//! to the stored pages it drew on. Duplicate submissions are ignored at
//! the constraint, which is what keeps reuse counting exact under
//! retries.

use super::connection::ResearchDb;
use crate::Error;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// How a stored page served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    /// Served from the store instead of a fresh fetch.
    Reused,
    /// Fetched fresh for this request and recorded for provenance.
    FreshScrape,
    /// Consulted to validate or cross-check other findings.
    Validation,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::Reused => "reused",
            UsageKind::FreshScrape => "fresh_scrape",
            UsageKind::Validation => "validation",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "reused" => UsageKind::Reused,
            "validation" => UsageKind::Validation,
            _ => UsageKind::FreshScrape,
        }
    }
}

/// Provenance row linking a request to a page it consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    pub request_id: String,
    pub page_id: i64,
    pub kind: UsageKind,
    pub relevance_score: f64,
    pub contributed: bool,
    pub recorded_at: String,
}

impl ResearchDb {
    /// Insert a usage record.
    ///
    /// Returns false when the (request, page) pair is already recorded;
    /// records are immutable, so the duplicate is simply ignored. An
    /// unknown page id fails the foreign key and surfaces as an error.
    pub async fn insert_usage(
        &self,
        request_id: &str,
        page_id: i64,
        kind: UsageKind,
        relevance_score: f64,
        contributed: bool,
    ) -> Result<bool, Error> {
        let request_id = request_id.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let changed = conn.execute(
                    "INSERT INTO usage_records (
                        request_id, page_id, usage_kind, relevance_score, contributed, recorded_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT (request_id, page_id) DO NOTHING",
                    params![
                        request_id,
                        page_id,
                        kind.as_str(),
                        relevance_score,
                        contributed as i64,
                        now
                    ],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All usage rows for one request, oldest first.
    pub async fn usage_for_request(&self, request_id: &str) -> Result<Vec<UsageRecord>, Error> {
        let request_id = request_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<UsageRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, request_id, page_id, usage_kind, relevance_score, contributed, recorded_at
                     FROM usage_records WHERE request_id = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![request_id], |row| {
                    let kind: String = row.get(3)?;
                    Ok(UsageRecord {
                        id: row.get(0)?,
                        request_id: row.get(1)?,
                        page_id: row.get(2)?,
                        kind: UsageKind::parse(&kind),
                        relevance_score: row.get(4)?,
                        contributed: row.get::<_, i64>(5)? == 1,
                        recorded_at: row.get(6)?,
                    })
                })?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row?);
                }
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }
}
