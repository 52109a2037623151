// Startup wiring: logical service names to concrete implementations
use crate::{
    bookmarks::BookmarkStore,
    config::{Config, StorageBackend},
    detail_cache::DetailCache,
    enrichment::EnrichmentBroadcaster,
    persistence::{BookmarkPersistence, JsonFilePersistence, MemoryPersistence, SqlitePersistence},
    provider::RepoProvider,
    providers::GitHubProvider,
    task::TaskGuard,
    Error, Result,
};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The services every store needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Provider,
    Bookmarks,
    Enrichment,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::Provider => "repository provider",
            ServiceKind::Bookmarks => "bookmark persistence",
            ServiceKind::Enrichment => "enrichment broadcaster",
        };
        write!(f, "{}", name)
    }
}

/// Collects implementations before anything is built
///
/// Register what you want, then `resolve` once. Nothing here is global;
/// whoever resolves owns the result.
#[derive(Default)]
pub struct ServiceRegistry {
    provider: Option<Arc<dyn RepoProvider>>,
    persistence: Option<Arc<dyn BookmarkPersistence>>,
    enrichment: Option<EnrichmentBroadcaster>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(mut self, provider: Arc<dyn RepoProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn register_persistence(mut self, persistence: Arc<dyn BookmarkPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn register_enrichment(mut self, broadcaster: EnrichmentBroadcaster) -> Self {
        self.enrichment = Some(broadcaster);
        self
    }

    /// Registry with the GitHub provider and whatever storage the config asks for
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = GitHubProvider::new(config.github.client_config())?;

        let persistence: Arc<dyn BookmarkPersistence> = match config.storage.backend {
            StorageBackend::Sqlite => {
                Arc::new(SqlitePersistence::open(config.storage.resolve_path()?)?)
            }
            StorageBackend::Json => {
                Arc::new(JsonFilePersistence::new(config.storage.resolve_path()?)?)
            }
            StorageBackend::Memory => Arc::new(MemoryPersistence::new()),
        };

        Ok(Self::new()
            .register_provider(Arc::new(provider))
            .register_persistence(persistence)
            .register_enrichment(EnrichmentBroadcaster::new(
                config.enrichment.channel_capacity,
            )))
    }

    /// Which services are still unregistered
    pub fn missing(&self) -> Vec<ServiceKind> {
        let mut missing = Vec::new();
        if self.provider.is_none() {
            missing.push(ServiceKind::Provider);
        }
        if self.persistence.is_none() {
            missing.push(ServiceKind::Bookmarks);
        }
        if self.enrichment.is_none() {
            missing.push(ServiceKind::Enrichment);
        }
        missing
    }

    /// Build the shared services
    ///
    /// Loads bookmarks and starts the bookmark/enrichment sync, so this has
    /// to run inside a Tokio runtime.
    pub fn resolve(self) -> Result<AppServices> {
        let missing = self.missing();
        let (Some(provider), Some(persistence), Some(enrichment)) =
            (self.provider, self.persistence, self.enrichment)
        else {
            return Err(missing_services(&missing));
        };

        let details = Arc::new(DetailCache::new(provider.clone()));
        let bookmarks = Arc::new(BookmarkStore::new(persistence));
        let bookmark_sync = bookmarks.follow_enrichments(&enrichment);

        info!("Services resolved");

        Ok(AppServices {
            provider,
            details,
            bookmarks,
            enrichment,
            _bookmark_sync: Arc::new(bookmark_sync),
        })
    }
}

fn missing_services(kinds: &[ServiceKind]) -> Error {
    let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
    Error::ConfigError(format!(
        "No implementation registered for: {}",
        names.join(", ")
    ))
}

/// Resolved services, handed to each store at construction
///
/// Cheap to clone. The bookmark/enrichment sync lives as long as any clone.
#[derive(Clone)]
pub struct AppServices {
    pub provider: Arc<dyn RepoProvider>,
    pub details: Arc<DetailCache>,
    pub bookmarks: Arc<BookmarkStore>,
    pub enrichment: EnrichmentBroadcaster,
    _bookmark_sync: Arc<TaskGuard>,
}
