// Core data orchestration - fetching, enriching, bookmarking
pub mod bookmarks;
pub mod config;
pub mod detail_cache;
pub mod enrichment;
pub mod error;
pub mod grouping;
pub mod models;
pub mod persistence;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod task;
pub mod views;

#[cfg(test)]
mod testing;

pub use bookmarks::{BookmarkEvent, BookmarkSet, BookmarkStore};
pub use config::Config;
pub use detail_cache::DetailCache;
pub use enrichment::{EnrichmentBroadcaster, EnrichmentEvent, EnrichmentSubscription};
pub use error::Error;
pub use grouping::{group_repositories, Grouping, RepoGroup, StarBand};
pub use models::{Owner, OwnerKind, Page, PageCursor, RepoDetail, RepoId, Repository};
pub use persistence::{BookmarkPersistence, JsonFilePersistence, MemoryPersistence, SqlitePersistence};
pub use provider::RepoProvider;
pub use repobrowse_api::FetchError;
pub use registry::{AppServices, ServiceKind, ServiceRegistry};
pub use views::{BookmarkListStore, RepoDetailStore, RepoListStore};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
