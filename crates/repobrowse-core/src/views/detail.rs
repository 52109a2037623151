use crate::models::{RepoDetail, Repository};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DetailPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// One repository as the detail screen sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDetailState {
    pub repository: Repository,
    pub is_bookmarked: bool,
    pub phase: DetailPhase,
    /// Generation of the current detail fetch
    pub request: u64,
}

impl RepoDetailState {
    /// Already-enriched repositories start out loaded and never hit the network
    pub fn new(repository: Repository, is_bookmarked: bool) -> Self {
        let phase = if repository.is_enriched() {
            DetailPhase::Loaded
        } else {
            DetailPhase::Idle
        };

        Self {
            repository,
            is_bookmarked,
            phase,
            request: 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            DetailPhase::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailEvent {
    LoadDetail,
    Retry,
    ToggleBookmark,
    DetailLoaded { request: u64, detail: RepoDetail },
    FetchFailed { request: u64, message: String },
    BookmarkSynced(bool),
    Enriched(Repository),
}

pub fn reduce(state: &RepoDetailState, event: &DetailEvent) -> RepoDetailState {
    let mut next = state.clone();

    match event {
        DetailEvent::LoadDetail => match state.phase {
            DetailPhase::Idle | DetailPhase::Error(_) if !state.repository.is_enriched() => {
                start_loading(&mut next);
            }
            _ => {}
        },

        DetailEvent::Retry => {
            if matches!(state.phase, DetailPhase::Error(_)) {
                start_loading(&mut next);
            }
        }

        DetailEvent::ToggleBookmark => next.is_bookmarked = !state.is_bookmarked,

        DetailEvent::DetailLoaded { request, detail } => {
            if *request == state.request {
                next.repository = state.repository.merging(detail.clone());
                next.phase = DetailPhase::Loaded;
            }
        }

        DetailEvent::FetchFailed { request, message } => {
            if *request == state.request {
                next.phase = DetailPhase::Error(message.clone());
            }
        }

        DetailEvent::BookmarkSynced(bookmarked) => next.is_bookmarked = *bookmarked,

        DetailEvent::Enriched(repo) => {
            if repo.id != state.repository.id || !repo.is_enriched() {
                return next;
            }
            next.repository = repo.clone();
            if next.phase != DetailPhase::Loaded {
                // Whatever we had in flight is no longer needed
                next.phase = DetailPhase::Loaded;
                next.request += 1;
            }
        }
    }

    next
}

fn start_loading(state: &mut RepoDetailState) {
    state.phase = DetailPhase::Loading;
    state.request += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{repo, stars};

    #[test]
    fn test_enriched_repository_starts_loaded() {
        let state = RepoDetailState::new(repo(1).merging(stars(3)), false);
        assert_eq!(state.phase, DetailPhase::Loaded);
        assert_eq!(reduce(&state, &DetailEvent::LoadDetail), state);

        let state = RepoDetailState::new(repo(1), false);
        assert_eq!(state.phase, DetailPhase::Idle);
    }

    #[test]
    fn test_load_then_merge() {
        let state = RepoDetailState::new(repo(1), false);
        let state = reduce(&state, &DetailEvent::LoadDetail);
        assert_eq!(state.phase, DetailPhase::Loading);

        // Asking again while loading does nothing
        assert_eq!(reduce(&state, &DetailEvent::LoadDetail), state);

        let state = reduce(
            &state,
            &DetailEvent::DetailLoaded {
                request: state.request,
                detail: stars(42),
            },
        );
        assert_eq!(state.phase, DetailPhase::Loaded);
        assert_eq!(state.repository.stars(), Some(42));
    }

    #[test]
    fn test_failure_and_retry() {
        let state = reduce(&RepoDetailState::new(repo(1), false), &DetailEvent::LoadDetail);
        let state = reduce(
            &state,
            &DetailEvent::FetchFailed {
                request: state.request,
                message: "not found".to_string(),
            },
        );
        assert_eq!(state.error(), Some("not found"));

        let retried = reduce(&state, &DetailEvent::Retry);
        assert_eq!(retried.phase, DetailPhase::Loading);
        assert_eq!(retried.request, state.request + 1);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let state = reduce(&RepoDetailState::new(repo(1), false), &DetailEvent::LoadDetail);
        let stale = state.request - 1;

        let after = reduce(
            &state,
            &DetailEvent::DetailLoaded {
                request: stale,
                detail: stars(1),
            },
        );
        assert_eq!(after, state);
    }

    #[test]
    fn test_enrichment_for_other_repository_is_ignored() {
        let state = RepoDetailState::new(repo(1), false);
        let after = reduce(&state, &DetailEvent::Enriched(repo(2).merging(stars(1))));
        assert_eq!(after, state);
    }

    #[test]
    fn test_enrichment_while_loading_finishes_the_load() {
        let state = reduce(&RepoDetailState::new(repo(1), false), &DetailEvent::LoadDetail);
        let after = reduce(&state, &DetailEvent::Enriched(repo(1).merging(stars(8))));

        assert_eq!(after.phase, DetailPhase::Loaded);
        assert_eq!(after.repository.stars(), Some(8));

        // The original fetch landing afterwards changes nothing
        let late = reduce(
            &after,
            &DetailEvent::DetailLoaded {
                request: state.request,
                detail: stars(1),
            },
        );
        assert_eq!(late, after);
    }

    #[test]
    fn test_bookmark_flags() {
        let state = RepoDetailState::new(repo(1), false);
        let state = reduce(&state, &DetailEvent::ToggleBookmark);
        assert!(state.is_bookmarked);
        let state = reduce(&state, &DetailEvent::BookmarkSynced(false));
        assert!(!state.is_bookmarked);
    }
}
