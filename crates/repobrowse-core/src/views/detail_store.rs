use super::detail::{reduce, DetailEvent, RepoDetailState};
use super::handle::StoreHandle;
use crate::{
    bookmarks::{BookmarkEvent, BookmarkStore},
    detail_cache::DetailCache,
    enrichment::{EnrichmentBroadcaster, EnrichmentSubscription},
    models::{RepoId, Repository},
    registry::AppServices,
    task::TaskGuard,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

/// Detail screen for a single repository
///
/// Fetches through the shared detail cache, so opening the same repository
/// from two places costs one request.
pub struct RepoDetailStore {
    handle: StoreHandle<RepoDetailState, DetailEvent>,
}

impl RepoDetailStore {
    pub fn new(services: &AppServices, repository: Repository) -> Self {
        let bookmark_events = services.bookmarks.subscribe();
        let enrichments = services.enrichment.subscribe();
        let initial = RepoDetailState::new(
            repository.clone(),
            services.bookmarks.is_bookmarked(repository.id),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let runner = DetailRunner {
            id: repository.id,
            details: services.details.clone(),
            bookmarks: services.bookmarks.clone(),
            enrichment: services.enrichment.clone(),
            events: tx.clone(),
            fetch_task: None,
        };

        let handle = StoreHandle::spawn(initial, tx, rx, move |rx, state| {
            runner.run(rx, state, bookmark_events, enrichments)
        });

        Self { handle }
    }

    pub fn send(&self, event: DetailEvent) {
        self.handle.dispatch(event);
    }

    pub fn state(&self) -> RepoDetailState {
        self.handle.state()
    }

    pub fn watch(&self) -> watch::Receiver<RepoDetailState> {
        self.handle.watch()
    }

    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&RepoDetailState) -> bool,
    ) -> RepoDetailState {
        self.handle.wait_until(predicate).await
    }
}

struct DetailRunner {
    id: RepoId,
    details: Arc<DetailCache>,
    bookmarks: Arc<BookmarkStore>,
    enrichment: EnrichmentBroadcaster,
    events: mpsc::UnboundedSender<DetailEvent>,
    fetch_task: Option<TaskGuard>,
}

impl DetailRunner {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<DetailEvent>,
        state: watch::Sender<RepoDetailState>,
        mut bookmark_events: broadcast::Receiver<BookmarkEvent>,
        mut enrichments: EnrichmentSubscription,
    ) {
        loop {
            let event = tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                notification = bookmark_events.recv() => match notification {
                    Ok(notification) => match self.mirror_bookmark(notification) {
                        Some(event) => event,
                        None => continue,
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        DetailEvent::BookmarkSynced(self.bookmarks.is_bookmarked(self.id))
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(enriched) = enrichments.next() => {
                    match enriched.into_repositories().into_iter().find(|r| r.id == self.id) {
                        Some(repo) => DetailEvent::Enriched(repo),
                        None => continue,
                    }
                }
            };

            self.handle(event, &state);
        }
        debug!("Detail store for {} stopped", self.id);
    }

    fn handle(&mut self, event: DetailEvent, state: &watch::Sender<RepoDetailState>) {
        let before = state.borrow().clone();
        let after = reduce(&before, &event);

        match &event {
            DetailEvent::LoadDetail | DetailEvent::Retry if after.request != before.request => {
                self.start_fetch(&after);
            }
            DetailEvent::DetailLoaded { request, .. } if *request == before.request => {
                self.fetch_task = None;
                self.enrichment.publish(after.repository.clone());
            }
            DetailEvent::FetchFailed { request, message } if *request == before.request => {
                self.fetch_task = None;
                warn!("Detail fetch for {} failed: {}", after.repository.full_name, message);
            }
            DetailEvent::ToggleBookmark => {
                if after.is_bookmarked {
                    self.bookmarks.add(after.repository.clone());
                } else {
                    self.bookmarks.remove(&after.repository);
                }
            }
            DetailEvent::Enriched(_) if after.request != before.request => {
                self.fetch_task = None;
            }
            _ => {}
        }

        state.send_if_modified(|current| {
            if *current == after {
                return false;
            }
            *current = after;
            true
        });
    }

    fn start_fetch(&mut self, state: &RepoDetailState) {
        let details = self.details.clone();
        let events = self.events.clone();
        let request = state.request;
        let repository = state.repository.clone();

        self.fetch_task = Some(TaskGuard::new(tokio::spawn(async move {
            let event = match details.fetch_one(&repository).await {
                Ok(detail) => DetailEvent::DetailLoaded { request, detail },
                Err(e) => DetailEvent::FetchFailed {
                    request,
                    message: e.to_string(),
                },
            };
            let _ = events.send(event);
        })));
    }

    fn mirror_bookmark(&self, notification: BookmarkEvent) -> Option<DetailEvent> {
        match notification {
            BookmarkEvent::Added(repo) if repo.id == self.id => {
                Some(DetailEvent::BookmarkSynced(true))
            }
            BookmarkEvent::Removed(repo) if repo.id == self.id => {
                Some(DetailEvent::BookmarkSynced(false))
            }
            BookmarkEvent::Updated(repo) if repo.id == self.id => {
                Some(DetailEvent::Enriched(repo))
            }
            BookmarkEvent::Loaded(repos) => Some(DetailEvent::BookmarkSynced(
                repos.iter().any(|r| r.id == self.id),
            )),
            BookmarkEvent::Cleared => Some(DetailEvent::BookmarkSynced(false)),
            _ => None,
        }
    }
}
