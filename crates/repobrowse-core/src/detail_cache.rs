// Memoizing detail fetcher shared by every view
use crate::{
    models::{RepoDetail, Repository},
    provider::RepoProvider,
    Result,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

type Slot = Arc<AsyncMutex<Option<RepoDetail>>>;

/// Detail lookups, memoized by qualified name
///
/// Every key gets its own async lock. The first caller for a key holds it
/// across the network round trip; anyone else asking for the same key waits
/// on that lock and then reads the stored value, so one key never has two
/// requests in flight. Different keys don't share a lock and run in parallel.
/// A key whose fetch failed keeps no slot once nobody is waiting on it.
pub struct DetailCache {
    provider: Arc<dyn RepoProvider>,
    slots: parking_lot::Mutex<HashMap<String, Slot>>,
}

impl DetailCache {
    pub fn new(provider: Arc<dyn RepoProvider>) -> Self {
        Self {
            provider,
            slots: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &str) -> Slot {
        // Short sync critical section; never held across an await
        let mut slots = self.slots.lock();
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Detail for one repository, from memory if we already have it
    ///
    /// Failures are returned to the caller and nothing is stored, so the
    /// next call tries the network again.
    pub async fn fetch_one(&self, repo: &Repository) -> Result<RepoDetail> {
        let key = repo.full_name.as_str();
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(detail) = entry.as_ref() {
            debug!("Detail cache hit for {}", key);
            return Ok(detail.clone());
        }

        debug!("Detail cache miss for {}, fetching", key);
        match self.provider.fetch_detail(key).await {
            Ok(detail) => {
                *entry = Some(detail.clone());
                Ok(detail)
            }
            Err(e) => {
                self.release(key, &slot);
                Err(e)
            }
        }
    }

    /// Forget an empty slot unless someone else is already waiting on it
    fn release(&self, key: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        // One reference in the map, one held by the caller
        if Arc::strong_count(slot) == 2 {
            slots.remove(key);
        }
    }

    /// Fetch details for many repositories at once
    ///
    /// Runs every lookup concurrently and keeps only the ones that worked.
    /// A failing item is logged and left out; it never fails the batch or
    /// stops its siblings.
    pub async fn fetch_batch(&self, repos: &[Repository]) -> HashMap<String, RepoDetail> {
        let lookups = repos.iter().map(|repo| async move {
            match self.fetch_one(repo).await {
                Ok(detail) => Some((repo.full_name.clone(), detail)),
                Err(e) => {
                    debug!("Skipping detail for {}: {}", repo.full_name, e);
                    None
                }
            }
        });

        let details: HashMap<String, RepoDetail> =
            join_all(lookups).await.into_iter().flatten().collect();

        info!(
            "Enriched {} of {} repositories",
            details.len(),
            repos.len()
        );
        details
    }

    /// Memoized detail without touching the network
    ///
    /// Returns None while a fetch for the key is still running.
    pub fn cached(&self, full_name: &str) -> Option<RepoDetail> {
        let slot = self.slots.lock().get(full_name).cloned()?;
        let entry = slot.try_lock().ok()?;
        entry.clone()
    }
}
