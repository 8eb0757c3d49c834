// src/store/sqlite.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use super::{empty_counts, RequestStore, StatusCounts};
use crate::core::Database;
use crate::types::{RequestStatus, RequestUpdate, ScrapeRequest};

// A missed compare-and-set means a cancel or restart recovery moved the status.
const MAX_UPDATE_ATTEMPTS: usize = 3;

const SELECT_COLUMNS: &str = r#"
    SELECT id, source_url, resume_text, status, raw_results, filtered_results,
           enriched_results, error_message, created_at, completed_at
    FROM scrape_requests
"#;

#[derive(Debug, sqlx::FromRow)]
struct ScrapeRequestRow {
    id: String,
    source_url: String,
    resume_text: Option<String>,
    status: String,
    raw_results: Option<String>,
    filtered_results: Option<String>,
    enriched_results: Option<String>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

fn from_json<T: DeserializeOwned>(column: &str, text: Option<String>) -> Result<Option<T>> {
    text.map(|text| {
        serde_json::from_str(&text).with_context(|| format!("Corrupt {} column", column))
    })
    .transpose()
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|value| serde_json::to_string(value).context("Failed to encode results"))
        .transpose()
}

impl TryFrom<ScrapeRequestRow> for ScrapeRequest {
    type Error = anyhow::Error;

    fn try_from(row: ScrapeRequestRow) -> Result<Self> {
        Ok(Self {
            status: row.status.parse()?,
            raw_results: from_json("raw_results", row.raw_results)?,
            filtered_results: from_json("filtered_results", row.filtered_results)?,
            enriched_results: from_json("enriched_results", row.enriched_results)?,
            id: row.id,
            source_url: row.source_url,
            resume_text: row.resume_text,
            error_message: row.error_message,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

/// Requests persisted in the `scrape_requests` table, results as JSON text.
#[derive(Clone)]
pub struct SqliteRequestStore {
    pool: SqlitePool,
}

impl SqliteRequestStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<ScrapeRequest>> {
        let row = sqlx::query_as::<_, ScrapeRequestRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ScrapeRequest::try_from).transpose()
    }

    async fn fetch_all(&self, query: &str, bind: Option<&str>, limit: Option<i64>) -> Result<Vec<ScrapeRequest>> {
        let mut q = sqlx::query_as::<_, ScrapeRequestRow>(query);
        if let Some(value) = bind {
            q = q.bind(value.to_string());
        }
        if let Some(limit) = limit {
            q = q.bind(limit);
        }
        q.fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ScrapeRequest::try_from)
            .collect()
    }
}

#[async_trait]
impl RequestStore for SqliteRequestStore {
    async fn create(&self, source_url: &str, resume_text: Option<String>) -> Result<ScrapeRequest> {
        let request = ScrapeRequest::new(source_url, resume_text);

        sqlx::query(
            r#"
            INSERT INTO scrape_requests (id, source_url, resume_text, status, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.source_url)
        .bind(&request.resume_text)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert scrape request")?;

        debug!(request_id = %request.id, "Scrape request stored");
        Ok(request)
    }

    async fn get(&self, id: &str) -> Result<Option<ScrapeRequest>> {
        self.fetch(id).await
    }

    async fn update(&self, id: &str, update: RequestUpdate) -> Result<bool> {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let mut request = self
                .fetch(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Scrape request not found: {}", id))?;

            if !update.check_against(&request)? {
                return Ok(false);
            }
            let previous = request.status;
            update.clone().apply_to(&mut request);

            // Only write if nobody moved the status since the read.
            let result = sqlx::query(
                r#"
                UPDATE scrape_requests
                SET status = ?, raw_results = ?, filtered_results = ?, enriched_results = ?,
                    error_message = ?, completed_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(request.status.as_str())
            .bind(to_json(&request.raw_results)?)
            .bind(to_json(&request.filtered_results)?)
            .bind(to_json(&request.enriched_results)?)
            .bind(&request.error_message)
            .bind(request.completed_at)
            .bind(id)
            .bind(previous.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update scrape request")?;

            if result.rows_affected() > 0 {
                return Ok(true);
            }
            debug!(request_id = %id, "Status moved during update, re-reading");
        }
        anyhow::bail!("Scrape request {} kept changing during update", id)
    }

    async fn cancel(&self, id: &str) -> Result<bool> {
        let mut query = sqlx::query(
            r#"
            UPDATE scrape_requests
            SET status = ?, completed_at = ?
            WHERE id = ? AND status IN (?, ?, ?, ?)
            "#,
        )
        .bind(RequestStatus::Cancelled.as_str())
        .bind(Utc::now())
        .bind(id);
        for status in RequestStatus::ACTIVE {
            query = query.bind(status.as_str());
        }
        let result = query
            .execute(&self.pool)
            .await
            .context("Failed to cancel scrape request")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<ScrapeRequest>> {
        self.fetch_all(
            &format!("{} WHERE status = ? ORDER BY created_at ASC, rowid ASC", SELECT_COLUMNS),
            Some(status.as_str()),
            None,
        )
        .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ScrapeRequest>> {
        self.fetch_all(
            &format!("{} ORDER BY created_at DESC, rowid DESC LIMIT ?", SELECT_COLUMNS),
            None,
            Some(i64::try_from(limit).unwrap_or(i64::MAX)),
        )
        .await
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM scrape_requests GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = empty_counts();
        for (status, count) in rows {
            let status: RequestStatus = status.parse()?;
            counts.insert(status.as_str(), u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests as shared;
    use crate::types::EnrichedResults;
    use std::sync::Arc;

    async fn store() -> SqliteRequestStore {
        SqliteRequestStore::new(&Database::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_then_get() {
        shared::create_then_get(&store().await).await;
    }

    #[tokio::test]
    async fn test_update_writes_fields_together() {
        shared::update_writes_fields_together(&store().await).await;
    }

    #[tokio::test]
    async fn test_terminal_requests_are_immutable() {
        shared::terminal_requests_are_immutable(&store().await).await;
    }

    #[tokio::test]
    async fn test_regression_is_rejected() {
        shared::regression_is_rejected(&store().await).await;
    }

    #[tokio::test]
    async fn test_results_frontier_is_enforced() {
        shared::results_frontier_is_enforced(&store().await).await;
    }

    #[tokio::test]
    async fn test_cancel_wins_against_concurrent_writes() {
        shared::cancel_wins_against_concurrent_writes(&store().await).await;
    }

    #[tokio::test]
    async fn test_listing_and_counts() {
        shared::listing_and_counts(&store().await).await;
    }

    #[tokio::test]
    async fn test_recovery_fails_active_requests() {
        shared::recovery_fails_active_requests(&store().await).await;
    }

    #[tokio::test]
    async fn test_results_round_trip_through_json_columns() {
        let store = store().await;
        let request = shared::enriching_request(&store).await;
        let mut job = crate::pipeline::enrichment::tests::filtered("Acme", Some("https://linkedin.com/in/a"));
        job.can_apply = true;
        job.job_poster_email = Some("a@acme.com".to_string());
        let enriched = EnrichedResults::from_jobs(vec![job]);

        store
            .update(
                &request.id,
                RequestUpdate::status(RequestStatus::Completed)
                    .with_enriched_results(enriched.clone())
                    .with_completed_at(Utc::now()),
            )
            .await
            .unwrap();

        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Completed);
        assert_eq!(stored.enriched_results, Some(enriched));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_races_pipeline_writes_on_file_database() {
        let path = std::env::temp_dir().join(format!("jobscout-{}.db", uuid::Uuid::new_v4()));
        let store = Arc::new(SqliteRequestStore::new(&Database::new(&path).await.unwrap()));

        for _ in 0..100 {
            let request = store.create("https://www.linkedin.com/jobs/view/1", None).await.unwrap();
            let writer = {
                let store = store.clone();
                let id = request.id.clone();
                tokio::spawn(async move {
                    store
                        .update(&id, RequestUpdate::status(RequestStatus::Processing))
                        .await
                })
            };
            let canceller = {
                let store = store.clone();
                let id = request.id.clone();
                tokio::spawn(async move { store.cancel(&id).await })
            };

            writer.await.unwrap().unwrap();
            assert!(canceller.await.unwrap().unwrap());
            let stored = store.get(&request.id).await.unwrap().unwrap();
            assert_eq!(stored.status, RequestStatus::Cancelled);
            assert!(stored.completed_at.is_some());
        }

        store.pool.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
