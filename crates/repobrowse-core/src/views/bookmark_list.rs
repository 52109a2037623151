use crate::bookmarks::{BookmarkEvent, BookmarkSet};
use crate::models::Repository;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkListState {
    pub bookmarks: BookmarkSet,
    pub search_text: String,
}

impl BookmarkListState {
    pub fn new(bookmarks: BookmarkSet) -> Self {
        Self {
            bookmarks,
            search_text: String::new(),
        }
    }

    /// Bookmarks matching the search text, most recent first
    pub fn visible(&self) -> Vec<Repository> {
        self.bookmarks
            .items()
            .iter()
            .filter(|r| r.matches(&self.search_text))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkListEvent {
    Load,
    Add(Repository),
    Remove(Repository),
    UpdateEnriched(Vec<Repository>),
    DeleteAll,
    UpdateSearch(String),

    // Mirrored bookmark store notifications
    Loaded(Vec<Repository>),
    Added(Repository),
    Removed(Repository),
    Updated(Repository),
    Cleared,
}

impl From<BookmarkEvent> for BookmarkListEvent {
    fn from(event: BookmarkEvent) -> Self {
        match event {
            BookmarkEvent::Added(repo) => BookmarkListEvent::Added(repo),
            BookmarkEvent::Removed(repo) => BookmarkListEvent::Removed(repo),
            BookmarkEvent::Updated(repo) => BookmarkListEvent::Updated(repo),
            BookmarkEvent::Loaded(repos) => BookmarkListEvent::Loaded(repos),
            BookmarkEvent::Cleared => BookmarkListEvent::Cleared,
        }
    }
}

/// User actions apply optimistically; the mirrored notifications that follow
/// are no-ops when they agree.
pub fn reduce(state: &BookmarkListState, event: &BookmarkListEvent) -> BookmarkListState {
    let mut next = state.clone();

    match event {
        // Side effect only; the Loaded notification carries the data
        BookmarkListEvent::Load => {}

        BookmarkListEvent::Add(repo) | BookmarkListEvent::Added(repo) => {
            next.bookmarks.insert_front(repo.clone());
        }

        BookmarkListEvent::Remove(repo) | BookmarkListEvent::Removed(repo) => {
            next.bookmarks.remove(repo.id);
        }

        BookmarkListEvent::UpdateEnriched(repos) => {
            for repo in repos {
                next.bookmarks.replace(repo.clone());
            }
        }

        BookmarkListEvent::Updated(repo) => {
            next.bookmarks.replace(repo.clone());
        }

        BookmarkListEvent::DeleteAll | BookmarkListEvent::Cleared => next.bookmarks.clear(),

        BookmarkListEvent::UpdateSearch(text) => next.search_text = text.clone(),

        BookmarkListEvent::Loaded(repos) => {
            next.bookmarks = BookmarkSet::from_items(repos.clone());
        }
    }

    next
}
