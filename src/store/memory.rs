// src/store/memory.rs
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{empty_counts, RequestStore, StatusCounts};
use crate::types::{RequestStatus, RequestUpdate, ScrapeRequest};

#[derive(Default)]
struct Inner {
    requests: HashMap<String, ScrapeRequest>,
    // ids in creation order
    order: Vec<String>,
}

/// Process-local store for the CLI and tests. Writes are atomic per call.
#[derive(Default)]
pub struct MemoryRequestStore {
    inner: RwLock<Inner>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn create(&self, source_url: &str, resume_text: Option<String>) -> Result<ScrapeRequest> {
        let request = ScrapeRequest::new(source_url, resume_text);
        let mut inner = self.inner.write().await;
        inner.order.push(request.id.clone());
        inner.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn get(&self, id: &str) -> Result<Option<ScrapeRequest>> {
        Ok(self.inner.read().await.requests.get(id).cloned())
    }

    async fn update(&self, id: &str, update: RequestUpdate) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Scrape request not found: {}", id))?;

        if !update.check_against(request)? {
            return Ok(false);
        }
        update.apply_to(request);
        Ok(true)
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<ScrapeRequest>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.requests.get(id))
            .filter(|request| request.status == status)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ScrapeRequest>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.requests.get(id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        let inner = self.inner.read().await;
        let mut counts = empty_counts();
        for request in inner.requests.values() {
            *counts.entry(request.status.as_str()).or_default() += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests as shared;

    #[tokio::test]
    async fn test_create_then_get() {
        shared::create_then_get(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_update_writes_fields_together() {
        shared::update_writes_fields_together(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_terminal_requests_are_immutable() {
        shared::terminal_requests_are_immutable(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_regression_is_rejected() {
        shared::regression_is_rejected(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_results_frontier_is_enforced() {
        shared::results_frontier_is_enforced(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_cancel_wins_against_concurrent_writes() {
        shared::cancel_wins_against_concurrent_writes(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_listing_and_counts() {
        shared::listing_and_counts(&MemoryRequestStore::new()).await;
    }

    #[tokio::test]
    async fn test_recovery_fails_active_requests() {
        shared::recovery_fails_active_requests(&MemoryRequestStore::new()).await;
    }
}
