use super::handle::StoreHandle;
use super::list::{reduce, ListEvent, RepoListState};
use crate::{
    bookmarks::{BookmarkEvent, BookmarkStore},
    detail_cache::DetailCache,
    enrichment::{EnrichmentBroadcaster, EnrichmentSubscription},
    models::Repository,
    provider::RepoProvider,
    registry::AppServices,
    task::TaskGuard,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

/// The browsing list: paginated fetches, grouping, enrichment passes
///
/// Owns the session's repository collection. Events are handled one at a
/// time on the store's own task; network work runs on separate tasks that
/// report back with events. A newer page fetch aborts the one it
/// supersedes; enrichment passes only top up what isn't already in flight
/// and are aborted when the collection resets. Anything that still slips
/// through is dropped by the reducer.
pub struct RepoListStore {
    handle: StoreHandle<RepoListState, ListEvent>,
}

impl RepoListStore {
    /// Start the store. Needs a Tokio runtime.
    pub fn new(services: &AppServices) -> Self {
        // Subscribe before reading the snapshot so nothing falls in between
        let bookmark_events = services.bookmarks.subscribe();
        let enrichments = services.enrichment.subscribe();
        let initial = RepoListState::with_bookmarks(services.bookmarks.bookmarked_ids());

        let (tx, rx) = mpsc::unbounded_channel();
        let runner = ListRunner {
            provider: services.provider.clone(),
            details: services.details.clone(),
            bookmarks: services.bookmarks.clone(),
            enrichment: services.enrichment.clone(),
            events: tx.clone(),
            page_task: None,
            detail_tasks: Vec::new(),
        };

        let handle = StoreHandle::spawn(initial, tx, rx, move |rx, state| {
            runner.run(rx, state, bookmark_events, enrichments)
        });

        Self { handle }
    }

    pub fn send(&self, event: ListEvent) {
        self.handle.dispatch(event);
    }

    pub fn state(&self) -> RepoListState {
        self.handle.state()
    }

    pub fn watch(&self) -> watch::Receiver<RepoListState> {
        self.handle.watch()
    }

    pub async fn wait_until(&self, predicate: impl FnMut(&RepoListState) -> bool) -> RepoListState {
        self.handle.wait_until(predicate).await
    }
}

struct ListRunner {
    provider: Arc<dyn RepoProvider>,
    details: Arc<DetailCache>,
    bookmarks: Arc<BookmarkStore>,
    enrichment: EnrichmentBroadcaster,
    events: mpsc::UnboundedSender<ListEvent>,
    page_task: Option<TaskGuard>,
    detail_tasks: Vec<TaskGuard>,
}

impl ListRunner {
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<ListEvent>,
        state: watch::Sender<RepoListState>,
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
                    Ok(notification) => match mirror_bookmark(notification) {
                        Some(event) => event,
                        None => continue,
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        ListEvent::BookmarksReplaced(self.bookmarks.bookmarked_ids())
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(enriched) = enrichments.next() => {
                    ListEvent::Enriched(enriched.into_repositories())
                }
            };

            self.handle(event, &state);
        }
        debug!("List store stopped");
    }

    fn handle(&mut self, event: ListEvent, state: &watch::Sender<RepoListState>) {
        let before = state.borrow().clone();
        let after = reduce(&before, &event);

        match &event {
            ListEvent::LoadInitial | ListEvent::LoadMore | ListEvent::Retry => {
                if after.page_request != before.page_request {
                    self.start_page_fetch(&after);
                }
            }
            ListEvent::PageLoaded { request, .. } if *request == before.page_request => {
                self.page_task = None;
            }
            ListEvent::PageFailed { request, message } if *request == before.page_request => {
                self.page_task = None;
                warn!("Page fetch failed: {}", message);
            }
            ListEvent::DetailsLoaded {
                generation,
                details,
                ..
            } if *generation == before.detail_generation => {
                let enriched: Vec<_> = after
                    .repositories
                    .iter()
                    .filter(|r| details.contains_key(&r.full_name))
                    .cloned()
                    .collect();
                self.enrichment.publish_batch(enriched);
            }
            ListEvent::ToggleBookmark { repo, bookmarked } => {
                if *bookmarked {
                    self.bookmarks.add(repo.clone());
                } else {
                    self.bookmarks.remove(repo);
                }
            }
            _ => {}
        }

        if after.detail_generation != before.detail_generation {
            // A reset makes every running enrichment pass pointless
            self.detail_tasks.clear();
        }
        let requested: Vec<String> = after
            .pending_details
            .difference(&before.pending_details)
            .cloned()
            .collect();
        if !requested.is_empty() {
            self.start_detail_fetch(&after, requested);
        }

        state.send_if_modified(|current| {
            if *current == after {
                return false;
            }
            *current = after;
            true
        });
    }

    fn start_page_fetch(&mut self, state: &RepoListState) {
        let provider = self.provider.clone();
        let events = self.events.clone();
        let request = state.page_request;
        let cursor = state.cursor().cloned();

        debug!("Fetching page (request {}, cursor: {:?})", request, cursor);

        // Replacing the guard aborts whatever was in flight
        self.page_task = Some(TaskGuard::new(tokio::spawn(async move {
            let event = match provider.fetch_page(cursor).await {
                Ok(page) => ListEvent::PageLoaded {
                    request,
                    repositories: page.repositories,
                    next: page.next,
                },
                Err(e) => ListEvent::PageFailed {
                    request,
                    message: e.to_string(),
                },
            };
            let _ = events.send(event);
        })));
    }

    /// Fetch details for the newly pending keys only; earlier passes keep running
    fn start_detail_fetch(&mut self, state: &RepoListState, requested: Vec<String>) {
        let details = self.details.clone();
        let events = self.events.clone();
        let generation = state.detail_generation;
        let pending: Vec<Repository> = state
            .repositories
            .iter()
            .filter(|r| requested.contains(&r.full_name))
            .cloned()
            .collect();

        debug!(
            "Enriching {} repositories ({} passes running)",
            pending.len(),
            self.detail_tasks.len()
        );

        self.detail_tasks.retain(|task| !task.is_finished());
        self.detail_tasks.push(TaskGuard::new(tokio::spawn(async move {
            let details = details.fetch_batch(&pending).await;
            let _ = events.send(ListEvent::DetailsLoaded {
                generation,
                requested,
                details,
            });
        })));
    }
}

fn mirror_bookmark(notification: BookmarkEvent) -> Option<ListEvent> {
    match notification {
        BookmarkEvent::Added(repo) => Some(ListEvent::BookmarkAdded(repo.id)),
        BookmarkEvent::Removed(repo) => Some(ListEvent::BookmarkRemoved(repo.id)),
        BookmarkEvent::Loaded(repos) => Some(ListEvent::BookmarksReplaced(
            repos.iter().map(|r| r.id).collect(),
        )),
        BookmarkEvent::Cleared => Some(ListEvent::BookmarksReplaced(HashSet::new())),
        // Enrichment already reaches the list on its own channel
        BookmarkEvent::Updated(_) => None,
    }
}
