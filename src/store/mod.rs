// src/store/mod.rs
//! Durable keyed storage for scrape requests.
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRequestStore;
pub use sqlite::SqliteRequestStore;

use crate::types::{RequestStatus, RequestUpdate, ScrapeRequest};

pub const INTERRUPTED_MESSAGE: &str = "Interrupted by server restart";

/// Number of requests per status, every status present.
pub type StatusCounts = BTreeMap<&'static str, u64>;

pub(crate) fn empty_counts() -> StatusCounts {
    RequestStatus::ALL
        .iter()
        .map(|status| (status.as_str(), 0))
        .collect()
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a new `pending` request.
    async fn create(&self, source_url: &str, resume_text: Option<String>) -> Result<ScrapeRequest>;

    async fn get(&self, id: &str) -> Result<Option<ScrapeRequest>>;

    /// Write the fields carried by `update` in one step.
    ///
    /// Returns `false` without writing when the stored request is terminal.
    /// Unknown ids and status regressions are errors.
    async fn update(&self, id: &str, update: RequestUpdate) -> Result<bool>;

    /// Oldest first.
    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<ScrapeRequest>>;

    /// Newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ScrapeRequest>>;

    async fn count_by_status(&self) -> Result<StatusCounts>;

    /// Mark the request `cancelled` unless it is already terminal or unknown.
    async fn cancel(&self, id: &str) -> Result<bool> {
        match self.update(id, RequestUpdate::cancelled()).await {
            Ok(written) => Ok(written),
            Err(_) if self.get(id).await?.is_none() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Fail every request a previous process left active. Returns how many were marked.
pub async fn recover_interrupted(store: &dyn RequestStore) -> Result<usize> {
    let mut recovered = 0;
    for status in RequestStatus::ACTIVE {
        for request in store.list_by_status(status).await? {
            if store
                .update(&request.id, RequestUpdate::failed(INTERRUPTED_MESSAGE))
                .await?
            {
                recovered += 1;
            }
        }
    }
    if recovered > 0 {
        tracing::warn!(recovered, "Marked interrupted requests as failed");
    }
    Ok(recovered)
}

#[cfg(test)]
pub(crate) mod tests {
    //! Behaviour every store must share, run against each implementation.
    use super::*;
    use crate::types::{FilteredResults, RawResults};
    use chrono::Utc;

    const URL: &str = "https://www.linkedin.com/jobs/search/?keywords=rust";

    fn raw(total_count: usize) -> RawResults {
        RawResults {
            jobs: vec![],
            total_count,
            scraped_at: Utc::now(),
        }
    }

    fn filtered() -> FilteredResults {
        FilteredResults {
            jobs: vec![],
            total_count: 0,
            original_count: 0,
            dropped_incomplete: 0,
            dropped_duplicates: 0,
            filtered_at: Utc::now(),
        }
    }

    /// Walk a new request to `enriching` the way a pipeline run does.
    pub(crate) async fn enriching_request(store: &dyn RequestStore) -> ScrapeRequest {
        let request = store.create(URL, None).await.unwrap();
        for update in [
            RequestUpdate::status(RequestStatus::Processing),
            RequestUpdate::status(RequestStatus::Filtering).with_raw_results(raw(0)),
            RequestUpdate::status(RequestStatus::Enriching).with_filtered_results(filtered()),
        ] {
            assert!(store.update(&request.id, update).await.unwrap());
        }
        store.get(&request.id).await.unwrap().unwrap()
    }

    pub(crate) async fn create_then_get(store: &dyn RequestStore) {
        let created = store.create(URL, Some("resume".to_string())).await.unwrap();
        assert_eq!(created.status, RequestStatus::Pending);
        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    pub(crate) async fn update_writes_fields_together(store: &dyn RequestStore) {
        let request = store.create(URL, None).await.unwrap();
        let raw = raw(0);
        let written = store
            .update(
                &request.id,
                RequestUpdate::status(RequestStatus::Filtering).with_raw_results(raw.clone()),
            )
            .await
            .unwrap();
        assert!(written);

        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Filtering);
        assert_eq!(stored.raw_results, Some(raw));
        assert!(stored.filtered_results.is_none());
    }

    pub(crate) async fn terminal_requests_are_immutable(store: &dyn RequestStore) {
        let request = store.create(URL, None).await.unwrap();
        assert!(store.cancel(&request.id).await.unwrap());
        assert!(!store.cancel(&request.id).await.unwrap());
        assert!(!store
            .update(&request.id, RequestUpdate::status(RequestStatus::Processing))
            .await
            .unwrap());
        assert!(!store
            .update(&request.id, RequestUpdate::failed("late"))
            .await
            .unwrap());

        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Cancelled);
        assert!(stored.completed_at.is_some());
        assert!(stored.error_message.is_none());
        assert!(!store.cancel("missing").await.unwrap());
    }

    pub(crate) async fn regression_is_rejected(store: &dyn RequestStore) {
        let request = enriching_request(store).await;
        assert!(store
            .update(&request.id, RequestUpdate::status(RequestStatus::Processing))
            .await
            .is_err());
        assert!(store
            .update("missing", RequestUpdate::status(RequestStatus::Processing))
            .await
            .is_err());
        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Enriching);
    }

    pub(crate) async fn results_frontier_is_enforced(store: &dyn RequestStore) {
        let request = store.create(URL, None).await.unwrap();
        assert!(store
            .update(&request.id, RequestUpdate::status(RequestStatus::Enriching))
            .await
            .is_err());
        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert!(stored.filtered_results.is_none());

        let request = enriching_request(store).await;
        assert!(store
            .update(&request.id, RequestUpdate::default().with_raw_results(raw(99)))
            .await
            .is_err());
        let stored = store.get(&request.id).await.unwrap().unwrap();
        assert_eq!(stored.raw_results.map(|raw| raw.total_count), Some(0));
    }

    /// A pipeline write racing a cancel never makes the cancel fail.
    pub(crate) async fn cancel_wins_against_concurrent_writes(store: &dyn RequestStore) {
        for _ in 0..50 {
            let request = store.create(URL, None).await.unwrap();
            let (written, cancelled) = tokio::join!(
                store.update(&request.id, RequestUpdate::status(RequestStatus::Processing)),
                store.cancel(&request.id),
            );
            written.unwrap();
            assert!(cancelled.unwrap());
            let stored = store.get(&request.id).await.unwrap().unwrap();
            assert_eq!(stored.status, RequestStatus::Cancelled);
        }
    }

    pub(crate) async fn listing_and_counts(store: &dyn RequestStore) {
        let first = store.create(URL, None).await.unwrap();
        let second = store.create(URL, None).await.unwrap();
        let done = store.create(URL, None).await.unwrap();
        store
            .update(&done.id, RequestUpdate::failed("boom"))
            .await
            .unwrap();

        let pending: Vec<_> = store
            .list_by_status(RequestStatus::Pending)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(pending, vec![first.id.clone(), second.id.clone()]);

        let recent = store.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, done.id);

        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts["pending"], 2);
        assert_eq!(counts["failed"], 1);
        assert_eq!(counts["completed"], 0);
    }

    pub(crate) async fn recovery_fails_active_requests(store: &dyn RequestStore) {
        let active = enriching_request(store).await;
        let cancelled = store.create(URL, None).await.unwrap();
        store.cancel(&cancelled.id).await.unwrap();

        assert_eq!(recover_interrupted(store).await.unwrap(), 1);

        let stored = store.get(&active.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some(INTERRUPTED_MESSAGE));
        assert!(stored.completed_at.is_some());
        let untouched = store.get(&cancelled.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, RequestStatus::Cancelled);
    }
}
