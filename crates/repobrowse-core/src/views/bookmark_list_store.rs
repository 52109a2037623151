use super::bookmark_list::{reduce, BookmarkListEvent, BookmarkListState};
use super::handle::StoreHandle;
use crate::{
    bookmarks::{BookmarkEvent, BookmarkStore},
    registry::AppServices,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;

/// Bookmarks screen, mirroring the bookmark store
pub struct BookmarkListStore {
    handle: StoreHandle<BookmarkListState, BookmarkListEvent>,
}

impl BookmarkListStore {
    pub fn new(services: &AppServices) -> Self {
        let notifications = services.bookmarks.subscribe();
        let initial = BookmarkListState::new(services.bookmarks.snapshot());
        let bookmarks = services.bookmarks.clone();

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = StoreHandle::spawn(initial, tx, rx, move |rx, state| {
            run(bookmarks, rx, state, notifications)
        });

        Self { handle }
    }

    pub fn send(&self, event: BookmarkListEvent) {
        self.handle.dispatch(event);
    }

    pub fn state(&self) -> BookmarkListState {
        self.handle.state()
    }

    pub fn watch(&self) -> watch::Receiver<BookmarkListState> {
        self.handle.watch()
    }

    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&BookmarkListState) -> bool,
    ) -> BookmarkListState {
        self.handle.wait_until(predicate).await
    }
}

async fn run(
    bookmarks: Arc<BookmarkStore>,
    mut rx: mpsc::UnboundedReceiver<BookmarkListEvent>,
    state: watch::Sender<BookmarkListState>,
    mut notifications: broadcast::Receiver<BookmarkEvent>,
) {
    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
            notification = notifications.recv() => match notification {
                Ok(notification) => BookmarkListEvent::from(notification),
                // Fell behind; start over from the real thing
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    BookmarkListEvent::Loaded(bookmarks.bookmarks())
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        let after = reduce(&state.borrow(), &event);

        match &event {
            BookmarkListEvent::Load => bookmarks.load_all(),
            BookmarkListEvent::Add(repo) => {
                bookmarks.add(repo.clone());
            }
            BookmarkListEvent::Remove(repo) => {
                bookmarks.remove(repo);
            }
            BookmarkListEvent::UpdateEnriched(repos) => {
                for repo in repos {
                    bookmarks.update(repo.clone());
                }
            }
            BookmarkListEvent::DeleteAll => bookmarks.delete_all(),
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
    debug!("Bookmark list store stopped");
}
