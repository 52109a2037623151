// Repository list: state, events and the pure reducer
use crate::{
    grouping::{group_repositories, Grouping, RepoGroup},
    models::{PageCursor, RepoDetail, RepoId, Repository},
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Where the list is in its fetch lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ListPhase {
    #[default]
    Idle,
    LoadingInitial,
    LoadingMore,
    FetchingDetails,
    Loaded,
    Error(String),
}

/// Pagination progress for the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Pagination {
    /// Nothing fetched yet; the next fetch is page one
    #[default]
    NotStarted,
    /// More pages behind this cursor
    Next(PageCursor),
    /// The last page came back without a cursor. Terminal until the next
    /// initial load.
    Exhausted,
}

/// How a fetch error should be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisplay {
    /// Nothing to show yet, so the error takes over the view
    Blocking(String),
    /// The list stays visible with the error shown alongside
    Inline(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoListState {
    pub repositories: Vec<Repository>,
    pub pagination: Pagination,
    pub grouping: Grouping,
    pub search_text: String,
    pub collapsed_groups: BTreeSet<String>,
    pub bookmarked_ids: HashSet<RepoId>,
    pub phase: ListPhase,
    /// Generation of the current page fetch; completions from older ones are dropped
    pub page_request: u64,
    /// Bumped whenever the collection resets; enrichment started before that is dropped
    pub detail_generation: u64,
    /// Qualified names with a detail fetch in flight
    pub pending_details: BTreeSet<String>,
}

impl RepoListState {
    pub fn with_bookmarks(bookmarked_ids: HashSet<RepoId>) -> Self {
        Self {
            bookmarked_ids,
            ..Self::default()
        }
    }

    pub fn cursor(&self) -> Option<&PageCursor> {
        match &self.pagination {
            Pagination::Next(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        matches!(self.pagination, Pagination::Next(_))
    }

    pub fn is_fetching_page(&self) -> bool {
        matches!(self.phase, ListPhase::LoadingInitial | ListPhase::LoadingMore)
    }

    /// The one state where a load-more is allowed to start
    pub fn can_load_more(&self) -> bool {
        self.has_more_pages()
            && matches!(self.phase, ListPhase::Loaded | ListPhase::FetchingDetails)
    }

    pub fn is_bookmarked(&self, id: RepoId) -> bool {
        self.bookmarked_ids.contains(&id)
    }

    pub fn is_collapsed(&self, key: &str) -> bool {
        self.collapsed_groups.contains(key)
    }

    /// An enrichment pass is still running
    pub fn is_enriching(&self) -> bool {
        !self.pending_details.is_empty()
    }

    /// Repositories still waiting for their detail block
    pub fn unenriched(&self) -> Vec<Repository> {
        self.repositories
            .iter()
            .filter(|r| !r.is_enriched())
            .cloned()
            .collect()
    }

    /// Repositories matching the current search text
    pub fn visible_repositories(&self) -> Vec<Repository> {
        self.repositories
            .iter()
            .filter(|r| r.matches(&self.search_text))
            .cloned()
            .collect()
    }

    /// Visible repositories bucketed by the current grouping
    pub fn groups(&self) -> Vec<RepoGroup> {
        group_repositories(&self.visible_repositories(), self.grouping)
    }

    pub fn error_display(&self) -> Option<ErrorDisplay> {
        match &self.phase {
            ListPhase::Error(msg) if self.repositories.is_empty() => {
                Some(ErrorDisplay::Blocking(msg.clone()))
            }
            ListPhase::Error(msg) => Some(ErrorDisplay::Inline(msg.clone())),
            _ => None,
        }
    }
}

/// Everything that can happen to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    // User actions
    LoadInitial,
    LoadMore,
    Retry,
    ChangeGrouping(Grouping),
    UpdateSearch(String),
    ToggleGroup(String),
    ToggleBookmark { repo: Repository, bookmarked: bool },

    // Raised by the store once async work finishes
    PageLoaded {
        request: u64,
        repositories: Vec<Repository>,
        next: Option<PageCursor>,
    },
    PageFailed { request: u64, message: String },
    FetchDetails,
    DetailsLoaded {
        generation: u64,
        /// Everything the pass asked for, fetched or not
        requested: Vec<String>,
        details: HashMap<String, RepoDetail>,
    },

    // Mirrored from the shared services
    Enriched(Vec<Repository>),
    BookmarkAdded(RepoId),
    BookmarkRemoved(RepoId),
    BookmarksReplaced(HashSet<RepoId>),
}

/// Pure state transition for the list
pub fn reduce(state: &RepoListState, event: &ListEvent) -> RepoListState {
    let mut next = state.clone();

    match event {
        ListEvent::LoadInitial => start_initial_load(&mut next),

        ListEvent::LoadMore => {
            if !state.can_load_more() {
                return next;
            }
            start_load_more(&mut next);
        }

        ListEvent::Retry => {
            if !matches!(state.phase, ListPhase::Error(_)) {
                return next;
            }
            if state.repositories.is_empty() {
                start_initial_load(&mut next);
            } else if state.has_more_pages() {
                start_load_more(&mut next);
            }
        }

        ListEvent::ChangeGrouping(grouping) => {
            next.grouping = *grouping;
            if grouping.requires_detail() {
                start_enrichment(&mut next);
            }
        }

        ListEvent::UpdateSearch(text) => next.search_text = text.clone(),

        ListEvent::ToggleGroup(key) => {
            if !next.collapsed_groups.remove(key) {
                next.collapsed_groups.insert(key.clone());
            }
        }

        ListEvent::ToggleBookmark { repo, bookmarked } => {
            // Optimistic; the bookmark store's notification confirms it
            if *bookmarked {
                next.bookmarked_ids.insert(repo.id);
            } else {
                next.bookmarked_ids.remove(&repo.id);
            }
        }

        ListEvent::PageLoaded {
            request,
            repositories,
            next: cursor,
        } => {
            if *request != state.page_request {
                return next;
            }
            let known: HashSet<RepoId> = next.repositories.iter().map(|r| r.id).collect();
            next.repositories.extend(
                repositories
                    .iter()
                    .filter(|r| !known.contains(&r.id))
                    .cloned(),
            );
            next.pagination = match cursor {
                Some(cursor) => Pagination::Next(cursor.clone()),
                None => Pagination::Exhausted,
            };
            next.phase = ListPhase::Loaded;
            if next.grouping.requires_detail() {
                start_enrichment(&mut next);
            }
        }

        ListEvent::PageFailed { request, message } => {
            if *request != state.page_request {
                return next;
            }
            next.phase = ListPhase::Error(message.clone());
        }

        ListEvent::FetchDetails => start_enrichment(&mut next),

        ListEvent::DetailsLoaded {
            generation,
            requested,
            details,
        } => {
            if *generation != state.detail_generation {
                return next;
            }
            for repo in next.repositories.iter_mut() {
                if let Some(detail) = details.get(&repo.full_name) {
                    *repo = repo.merging(detail.clone());
                }
            }
            for key in requested {
                next.pending_details.remove(key);
            }
            if !next.is_enriching() && next.phase == ListPhase::FetchingDetails {
                next.phase = ListPhase::Loaded;
            }
        }

        ListEvent::Enriched(enriched) => {
            let by_id: HashMap<RepoId, &Repository> = enriched
                .iter()
                .filter(|r| r.is_enriched())
                .map(|r| (r.id, r))
                .collect();
            for repo in next.repositories.iter_mut() {
                if let Some(fresh) = by_id.get(&repo.id) {
                    *repo = (*fresh).clone();
                }
            }
        }

        ListEvent::BookmarkAdded(id) => {
            next.bookmarked_ids.insert(*id);
        }

        ListEvent::BookmarkRemoved(id) => {
            next.bookmarked_ids.remove(id);
        }

        ListEvent::BookmarksReplaced(ids) => next.bookmarked_ids = ids.clone(),
    }

    next
}

fn start_initial_load(state: &mut RepoListState) {
    state.repositories.clear();
    state.pagination = Pagination::NotStarted;
    state.phase = ListPhase::LoadingInitial;
    state.page_request += 1;
    // Whatever enrichment was running belongs to the old collection
    state.detail_generation += 1;
    state.pending_details.clear();
}

/// Mark every unenriched repository that isn't already in flight as pending.
/// Passes already running are left alone.
fn start_enrichment(state: &mut RepoListState) {
    let fresh: Vec<String> = state
        .repositories
        .iter()
        .filter(|r| !r.is_enriched() && !state.pending_details.contains(&r.full_name))
        .map(|r| r.full_name.clone())
        .collect();
    if fresh.is_empty() {
        return;
    }
    state.pending_details.extend(fresh);
    if state.phase == ListPhase::Loaded {
        state.phase = ListPhase::FetchingDetails;
    }
}

fn start_load_more(state: &mut RepoListState) {
    state.phase = ListPhase::LoadingMore;
    state.page_request += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Owner;

    fn repo(id: u64) -> Repository {
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

    fn stars(n: u32) -> RepoDetail {
        RepoDetail {
            stars: Some(n),
            ..RepoDetail::default()
        }
    }

    fn page(state: &RepoListState, ids: &[u64], next: Option<&str>) -> ListEvent {
        ListEvent::PageLoaded {
            request: state.page_request,
            repositories: ids.iter().map(|id| repo(*id)).collect(),
            next: next.map(PageCursor::new),
        }
    }

    fn loaded(ids: &[u64], next: Option<&str>) -> RepoListState {
        let state = reduce(&RepoListState::default(), &ListEvent::LoadInitial);
        let event = page(&state, ids, next);
        reduce(&state, &event)
    }

    #[test]
    fn test_load_initial_resets_and_starts() {
        let state = loaded(&[1, 2], Some("c1"));
        let next = reduce(&state, &ListEvent::LoadInitial);

        assert!(next.repositories.is_empty());
        assert_eq!(next.pagination, Pagination::NotStarted);
        assert_eq!(next.phase, ListPhase::LoadingInitial);
        assert_eq!(next.page_request, state.page_request + 1);
    }

    #[test]
    fn test_page_loaded_appends_and_stores_cursor() {
        let state = loaded(&[1, 2], Some("c1"));
        assert_eq!(state.phase, ListPhase::Loaded);
        assert_eq!(state.cursor(), Some(&PageCursor::new("c1")));

        let state = reduce(&state, &ListEvent::LoadMore);
        assert_eq!(state.phase, ListPhase::LoadingMore);

        let event = page(&state, &[3], Some("c2"));
        let state = reduce(&state, &event);
        let ids: Vec<u64> = state.repositories.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(state.cursor(), Some(&PageCursor::new("c2")));
    }

    #[test]
    fn test_load_more_is_noop_while_fetching() {
        let state = reduce(&RepoListState::default(), &ListEvent::LoadInitial);
        assert_eq!(reduce(&state, &ListEvent::LoadMore), state);

        let state = loaded(&[1], Some("c1"));
        let fetching = reduce(&state, &ListEvent::LoadMore);
        assert_eq!(reduce(&fetching, &ListEvent::LoadMore), fetching);
    }

    #[test]
    fn test_load_more_is_noop_from_idle() {
        let state = RepoListState::default();
        assert_eq!(reduce(&state, &ListEvent::LoadMore), state);
    }

    #[test]
    fn test_absent_cursor_ends_pagination() {
        let state = loaded(&[1], None);
        assert_eq!(state.pagination, Pagination::Exhausted);
        assert!(!state.can_load_more());
        assert_eq!(reduce(&state, &ListEvent::LoadMore), state);
    }

    #[test]
    fn test_stale_page_is_discarded() {
        let first = reduce(&RepoListState::default(), &ListEvent::LoadInitial);
        let stale = page(&first, &[1], Some("old"));
        let second = reduce(&first, &ListEvent::LoadInitial);

        let after = reduce(&second, &stale);
        assert_eq!(after, second);

        let fresh = page(&second, &[2], None);
        let after = reduce(&second, &fresh);
        assert_eq!(after.repositories, vec![repo(2)]);
    }

    #[test]
    fn test_duplicate_ids_are_not_appended_twice() {
        let state = loaded(&[1, 2], Some("c1"));
        let state = reduce(&state, &ListEvent::LoadMore);
        let event = page(&state, &[2, 3], None);
        let state = reduce(&state, &event);
        assert_eq!(state.repositories.len(), 3);
    }

    #[test]
    fn test_failure_then_retry() {
        let state = reduce(&RepoListState::default(), &ListEvent::LoadInitial);
        let failed = reduce(
            &state,
            &ListEvent::PageFailed {
                request: state.page_request,
                message: "boom".to_string(),
            },
        );
        assert_eq!(failed.phase, ListPhase::Error("boom".to_string()));
        assert_eq!(
            failed.error_display(),
            Some(ErrorDisplay::Blocking("boom".to_string()))
        );

        let retried = reduce(&failed, &ListEvent::Retry);
        assert_eq!(retried.phase, ListPhase::LoadingInitial);
    }

    #[test]
    fn test_load_more_failure_is_inline_and_retry_loads_more() {
        let state = loaded(&[1], Some("c1"));
        let state = reduce(&state, &ListEvent::LoadMore);
        let failed = reduce(
            &state,
            &ListEvent::PageFailed {
                request: state.page_request,
                message: "rate limited".to_string(),
            },
        );

        assert_eq!(failed.repositories.len(), 1);
        assert_eq!(
            failed.error_display(),
            Some(ErrorDisplay::Inline("rate limited".to_string()))
        );

        let retried = reduce(&failed, &ListEvent::Retry);
        assert_eq!(retried.phase, ListPhase::LoadingMore);
        assert_eq!(retried.cursor(), Some(&PageCursor::new("c1")));
    }

    #[test]
    fn test_retry_outside_error_is_noop() {
        let state = loaded(&[1], Some("c1"));
        assert_eq!(reduce(&state, &ListEvent::Retry), state);
    }

    #[test]
    fn test_success_after_error_returns_to_loaded() {
        let state = loaded(&[1], Some("c1"));
        let state = reduce(&state, &ListEvent::LoadMore);
        let state = reduce(
            &state,
            &ListEvent::PageFailed {
                request: state.page_request,
                message: "x".to_string(),
            },
        );
        let state = reduce(&state, &ListEvent::Retry);
        let event = page(&state, &[2], None);
        let state = reduce(&state, &event);
        assert_eq!(state.phase, ListPhase::Loaded);
        assert_eq!(state.error_display(), None);
    }

    fn details_loaded(state: &RepoListState, details: &[(&str, u32)]) -> ListEvent {
        ListEvent::DetailsLoaded {
            generation: state.detail_generation,
            requested: state.pending_details.iter().cloned().collect(),
            details: details
                .iter()
                .map(|(name, n)| (name.to_string(), stars(*n)))
                .collect(),
        }
    }

    #[test]
    fn test_fetch_details_and_merge() {
        let state = loaded(&[1, 2], None);
        let state = reduce(&state, &ListEvent::FetchDetails);
        assert_eq!(state.phase, ListPhase::FetchingDetails);
        assert!(state.is_enriching());

        // r2 failed; it stays unenriched and is no longer pending
        let state = reduce(&state, &details_loaded(&state, &[("o/r1", 42)]));

        assert_eq!(state.phase, ListPhase::Loaded);
        assert!(!state.is_enriching());
        assert_eq!(state.repositories[0].stars(), Some(42));
        assert!(!state.repositories[1].is_enriched());
        // Order untouched by the merge
        assert_eq!(state.repositories[0].id, 1);
    }

    #[test]
    fn test_fetch_details_noop_when_everything_enriched() {
        let mut state = loaded(&[1], None);
        state.repositories[0] = state.repositories[0].merging(stars(1));
        assert_eq!(reduce(&state, &ListEvent::FetchDetails), state);
    }

    #[test]
    fn test_running_pass_is_not_restarted() {
        let state = loaded(&[1, 2], None);
        let state = reduce(&state, &ListEvent::ChangeGrouping(Grouping::Language));
        assert_eq!(state.pending_details.len(), 2);

        // Regrouping mid-pass asks for nothing new
        let again = reduce(&state, &ListEvent::ChangeGrouping(Grouping::Stargazers));
        assert_eq!(again.pending_details, state.pending_details);
        assert_eq!(again.detail_generation, state.detail_generation);
        assert_eq!(reduce(&again, &ListEvent::FetchDetails), again);
    }

    #[test]
    fn test_page_during_pass_tops_up_pending() {
        let state = loaded(&[1], Some("c1"));
        let state = reduce(&state, &ListEvent::ChangeGrouping(Grouping::Stargazers));
        let first = state.clone();

        let state = reduce(&state, &ListEvent::LoadMore);
        let event = page(&state, &[2], None);
        let state = reduce(&state, &event);
        let pending: Vec<&str> = state.pending_details.iter().map(String::as_str).collect();
        assert_eq!(pending, vec!["o/r1", "o/r2"]);

        // The first pass lands; the top-up is still running
        let state = reduce(&state, &details_loaded(&first, &[("o/r1", 7)]));
        assert!(state.is_enriching());
        assert_eq!(state.phase, ListPhase::FetchingDetails);
        assert_eq!(state.repositories[0].stars(), Some(7));
    }

    #[test]
    fn test_stale_details_are_discarded() {
        let state = loaded(&[1], None);
        let enriching = reduce(&state, &ListEvent::FetchDetails);
        let reset = reduce(&enriching, &ListEvent::LoadInitial);
        assert!(!reset.is_enriching());

        let after = reduce(&reset, &details_loaded(&enriching, &[("o/r1", 3)]));
        assert_eq!(after, reset);
    }

    #[test]
    fn test_details_during_page_fetch_keep_loading_phase() {
        let state = loaded(&[1], Some("c1"));
        let state = reduce(&state, &ListEvent::LoadMore);
        let state = reduce(&state, &ListEvent::FetchDetails);
        assert_eq!(state.phase, ListPhase::LoadingMore);

        let state = reduce(&state, &details_loaded(&state, &[("o/r1", 3)]));
        assert_eq!(state.phase, ListPhase::LoadingMore);
        assert_eq!(state.repositories[0].stars(), Some(3));
    }

    #[test]
    fn test_external_enrichment_replaces_matching_item() {
        let state = loaded(&[1, 2], None);
        let fresh = repo(2).merging(stars(9));

        let state = reduce(&state, &ListEvent::Enriched(vec![fresh.clone(), repo(1)]));
        assert_eq!(state.repositories[1], fresh);
        // Unenriched copies never overwrite anything
        assert!(!state.repositories[0].is_enriched());
    }

    #[test]
    fn test_grouping_search_and_collapse() {
        let state = loaded(&[1, 2], None);
        let state = reduce(&state, &ListEvent::ChangeGrouping(Grouping::ForkStatus));
        assert_eq!(state.grouping, Grouping::ForkStatus);
        assert_eq!(state.groups().len(), 1);

        let state = reduce(&state, &ListEvent::UpdateSearch("r2".to_string()));
        assert_eq!(state.visible_repositories(), vec![repo(2)]);

        let state = reduce(&state, &ListEvent::ToggleGroup("Original".to_string()));
        assert!(state.is_collapsed("Original"));
        let state = reduce(&state, &ListEvent::ToggleGroup("Original".to_string()));
        assert!(!state.is_collapsed("Original"));
    }

    #[test]
    fn test_bookmark_mirror() {
        let state = RepoListState::default();
        let state = reduce(
            &state,
            &ListEvent::ToggleBookmark {
                repo: repo(1),
                bookmarked: true,
            },
        );
        assert!(state.is_bookmarked(1));

        let state = reduce(&state, &ListEvent::BookmarkRemoved(1));
        assert!(!state.is_bookmarked(1));

        let state = reduce(&state, &ListEvent::BookmarkAdded(4));
        let state = reduce(&state, &ListEvent::BookmarksReplaced(HashSet::from([7])));
        assert!(!state.is_bookmarked(4));
        assert!(state.is_bookmarked(7));
    }
}
