// View-scoped state: pure reducers plus the stores that run them
mod handle;

pub mod bookmark_list;
pub mod bookmark_list_store;
pub mod detail;
pub mod detail_store;
pub mod list;
pub mod list_store;

pub use bookmark_list::{BookmarkListEvent, BookmarkListState};
pub use bookmark_list_store::BookmarkListStore;
pub use detail::{DetailEvent, DetailPhase, RepoDetailState};
pub use detail_store::RepoDetailStore;
pub use list::{ErrorDisplay, ListEvent, ListPhase, Pagination, RepoListState};
pub use list_store::RepoListStore;
