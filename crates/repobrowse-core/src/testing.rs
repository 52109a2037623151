// Fakes shared by the store tests
use crate::{
    enrichment::EnrichmentBroadcaster,
    models::{Owner, Page, PageCursor, RepoDetail, Repository},
    persistence::MemoryPersistence,
    provider::RepoProvider,
    registry::{AppServices, ServiceRegistry},
    Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use repobrowse_api::FetchError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn repo(id: u64) -> Repository {
    Repository::new(
        id,
        format!("r{}", id),
        format!("o/r{}", id),
        None,
        false,
        format!("https://github.com/o/r{}", id),
        Owner {
            login: "o".to_string(),
            avatar_url: None,
            kind: None,
        },
    )
}

pub(crate) fn stars(n: u32) -> RepoDetail {
    RepoDetail {
        stars: Some(n),
        ..RepoDetail::default()
    }
}

/// Provider that plays back scripted page responses in call order
///
/// Detail lookups come from a fixed map; unknown names are NotFound.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    pages: Mutex<VecDeque<(Duration, Result<Page>)>>,
    details: HashMap<String, RepoDetail>,
    detail_delay: Duration,
    pub page_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub cursors: Mutex<Vec<Option<PageCursor>>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, ids: &[u64], next: Option<&str>) -> Self {
        self.slow_page(Duration::ZERO, ids, next)
    }

    pub(crate) fn slow_page(self, delay: Duration, ids: &[u64], next: Option<&str>) -> Self {
        let page = Page {
            repositories: ids.iter().map(|id| repo(*id)).collect(),
            next: next.map(PageCursor::new),
        };
        self.pages.lock().push_back((delay, Ok(page)));
        self
    }

    pub(crate) fn failing_page(self, error: FetchError) -> Self {
        self.pages.lock().push_back((Duration::ZERO, Err(error.into())));
        self
    }

    pub(crate) fn detail(mut self, full_name: &str, detail: RepoDetail) -> Self {
        self.details.insert(full_name.to_string(), detail);
        self
    }

    pub(crate) fn detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }

    pub(crate) fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoProvider for ScriptedProvider {
    async fn fetch_page(&self, cursor: Option<PageCursor>) -> Result<Page> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.cursors.lock().push(cursor);

        let next = self.pages.lock().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Err(FetchError::NotFound.into())));
        tokio::time::sleep(delay).await;
        result
    }

    async fn fetch_detail(&self, full_name: &str) -> Result<RepoDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.detail_delay).await;
        self.details
            .get(full_name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound.into())
    }

    async fn fetch_repository(&self, full_name: &str) -> Result<Repository> {
        let detail = self.fetch_detail(full_name).await?;
        Ok(repo(1).merging(detail))
    }
}

/// Services over an in-memory bookmark store
pub(crate) fn services(provider: Arc<ScriptedProvider>) -> AppServices {
    services_with(provider, MemoryPersistence::new())
}

pub(crate) fn services_with(
    provider: Arc<ScriptedProvider>,
    persistence: MemoryPersistence,
) -> AppServices {
    ServiceRegistry::new()
        .register_provider(provider)
        .register_persistence(Arc::new(persistence))
        .register_enrichment(EnrichmentBroadcaster::default())
        .resolve()
        .unwrap()
}
