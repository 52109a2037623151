// Bookmark store - the one place that decides what's bookmarked
use crate::{
    enrichment::EnrichmentBroadcaster,
    models::{RepoId, Repository},
    persistence::BookmarkPersistence,
    task::TaskGuard,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const NOTIFICATION_CAPACITY: usize = 256;

/// Ordered bookmarks plus an identity index, always changed together
///
/// Most recently bookmarked first. The two halves are private so nobody can
/// update one without the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkSet {
    items: Vec<Repository>,
    ids: HashSet<RepoId>,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a stored collection, dropping duplicate identities
    pub fn from_items(items: Vec<Repository>) -> Self {
        let mut set = Self::new();
        for repo in items {
            if set.ids.insert(repo.id) {
                set.items.push(repo);
            }
        }
        set
    }

    pub fn items(&self) -> &[Repository] {
        &self.items
    }

    pub fn ids(&self) -> &HashSet<RepoId> {
        &self.ids
    }

    pub fn contains(&self, id: RepoId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert at the head. False if already present.
    pub fn insert_front(&mut self, repo: Repository) -> bool {
        if !self.ids.insert(repo.id) {
            return false;
        }
        self.items.insert(0, repo);
        true
    }

    /// Remove by identity. Returns the stored value if there was one.
    pub fn remove(&mut self, id: RepoId) -> Option<Repository> {
        if !self.ids.remove(&id) {
            return None;
        }
        let index = self.items.iter().position(|r| r.id == id)?;
        Some(self.items.remove(index))
    }

    /// Replace the stored value in place, keeping its position
    ///
    /// Refuses to swap an enriched value for an unenriched one and skips
    /// identical values. True when something changed.
    pub fn replace(&mut self, repo: Repository) -> bool {
        let Some(slot) = self.items.iter_mut().find(|r| r.id == repo.id) else {
            return false;
        };
        if *slot == repo || (slot.is_enriched() && !repo.is_enriched()) {
            return false;
        }
        *slot = repo;
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }
}

/// Change notifications from the bookmark store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkEvent {
    Added(Repository),
    Removed(Repository),
    Updated(Repository),
    Loaded(Vec<Repository>),
    Cleared,
}

/// Single source of truth for bookmarks
///
/// Mutations happen in memory first, then get written through the
/// persistence contract. Write failures are logged and otherwise ignored, so
/// a mutation can outlive a failed write until the next restart. Every
/// change is broadcast before the call returns.
pub struct BookmarkStore {
    persistence: Arc<dyn BookmarkPersistence>,
    set: Mutex<BookmarkSet>,
    events: broadcast::Sender<BookmarkEvent>,
}

impl BookmarkStore {
    /// Create the store and load whatever was persisted
    pub fn new(persistence: Arc<dyn BookmarkPersistence>) -> Self {
        let (events, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let store = Self {
            persistence,
            set: Mutex::new(BookmarkSet::new()),
            events,
        };
        store.load_all();
        store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> BookmarkSet {
        self.set.lock().clone()
    }

    pub fn bookmarks(&self) -> Vec<Repository> {
        self.set.lock().items().to_vec()
    }

    pub fn bookmarked_ids(&self) -> HashSet<RepoId> {
        self.set.lock().ids().clone()
    }

    pub fn is_bookmarked(&self, id: RepoId) -> bool {
        self.set.lock().contains(id)
    }

    /// Bookmark a repository. No-op if it's already there.
    pub fn add(&self, repo: Repository) -> bool {
        let mut set = self.set.lock();
        if !set.insert_front(repo.clone()) {
            return false;
        }

        self.persist(set.items());
        debug!("Bookmarked {}", repo.full_name);
        self.notify(BookmarkEvent::Added(repo));
        true
    }

    /// Drop a bookmark. No-op if it isn't there.
    pub fn remove(&self, repo: &Repository) -> bool {
        let mut set = self.set.lock();
        let Some(removed) = set.remove(repo.id) else {
            return false;
        };

        self.persist(set.items());
        debug!("Removed bookmark {}", removed.full_name);
        self.notify(BookmarkEvent::Removed(removed));
        true
    }

    /// Push a fresher copy of an already-bookmarked repository
    ///
    /// No-op for repositories that aren't bookmarked.
    pub fn update(&self, repo: Repository) -> bool {
        let mut set = self.set.lock();
        if !set.contains(repo.id) || !set.replace(repo.clone()) {
            return false;
        }

        self.persist(set.items());
        debug!("Updated bookmark {}", repo.full_name);
        self.notify(BookmarkEvent::Updated(repo));
        true
    }

    /// Replace in-memory state with whatever persistence has
    pub fn load_all(&self) {
        let loaded = match self.persistence.load() {
            Ok(repos) => repos,
            Err(e) => {
                warn!("Failed to load bookmarks, starting empty: {}", e);
                Vec::new()
            }
        };

        let mut set = self.set.lock();
        *set = BookmarkSet::from_items(loaded);
        info!("Loaded {} bookmarks", set.len());
        self.notify(BookmarkEvent::Loaded(set.items().to_vec()));
    }

    /// Forget every bookmark, in memory and on disk
    pub fn delete_all(&self) {
        let mut set = self.set.lock();
        set.clear();

        if let Err(e) = self.persistence.delete() {
            warn!("Failed to delete persisted bookmarks: {}", e);
        }
        self.notify(BookmarkEvent::Cleared);
    }

    /// Keep bookmarked copies fresh as other views enrich repositories
    ///
    /// Every enriched repository goes through `update`, which ignores the
    /// ones that aren't bookmarked. Drop the guard to stop listening.
    pub fn follow_enrichments(self: &Arc<Self>, broadcaster: &EnrichmentBroadcaster) -> TaskGuard {
        let store: Weak<Self> = Arc::downgrade(self);
        let mut subscription = broadcaster.subscribe();

        TaskGuard::new(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(store) = store.upgrade() else {
                    break;
                };
                for repo in event.into_repositories() {
                    store.update(repo);
                }
            }
            debug!("Bookmark enrichment listener stopped");
        }))
    }

    fn persist(&self, items: &[Repository]) {
        if let Err(e) = self.persistence.save(items) {
            warn!("Failed to persist bookmarks: {}", e);
        }
    }

    fn notify(&self, event: BookmarkEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}
