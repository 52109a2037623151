// Bookmark persistence contract plus the engines that satisfy it
use crate::{models::Repository, Result};
use parking_lot::Mutex;
use repobrowse_cache::{CacheManager, FileStore};
use std::path::Path;

/// Key the bookmark collection lives under, whatever the engine
pub const BOOKMARKS_KEY: &str = "bookmarked_repositories";

/// Save/load/delete for the ordered bookmark collection
///
/// The bookmark store doesn't care what's underneath - a file, SQLite,
/// or plain memory all work. Loading when nothing was ever saved gives back
/// an empty collection rather than an error.
#[cfg_attr(test, mockall::automock)]
pub trait BookmarkPersistence: Send + Sync {
    fn save(&self, bookmarks: &[Repository]) -> Result<()>;
    fn load(&self) -> Result<Vec<Repository>>;
    fn delete(&self) -> Result<()>;
}

/// SQLite-backed persistence via the shared cache database
pub struct SqlitePersistence {
    cache: Mutex<CacheManager>,
}

impl SqlitePersistence {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(CacheManager::new(path)?))
    }

    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache: Mutex::new(cache),
        }
    }
}

impl BookmarkPersistence for SqlitePersistence {
    fn save(&self, bookmarks: &[Repository]) -> Result<()> {
        self.cache.lock().set(BOOKMARKS_KEY, bookmarks)?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<Repository>> {
        Ok(self
            .cache
            .lock()
            .get::<Vec<Repository>>(BOOKMARKS_KEY)?
            .unwrap_or_default())
    }

    fn delete(&self) -> Result<()> {
        self.cache.lock().delete(BOOKMARKS_KEY)?;
        Ok(())
    }
}

/// Human-readable JSON file persistence
pub struct JsonFilePersistence {
    store: FileStore,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Result<Self> {
        Ok(Self {
            store: FileStore::new(dir)?,
        })
    }
}

impl BookmarkPersistence for JsonFilePersistence {
    fn save(&self, bookmarks: &[Repository]) -> Result<()> {
        self.store.set(BOOKMARKS_KEY, bookmarks)?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<Repository>> {
        Ok(self
            .store
            .get::<Vec<Repository>>(BOOKMARKS_KEY)?
            .unwrap_or_default())
    }

    fn delete(&self) -> Result<()> {
        self.store.delete(BOOKMARKS_KEY)?;
        Ok(())
    }
}

/// Keeps bookmarks in memory only; gone when the process exits
#[derive(Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<Vec<Repository>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookmarks(bookmarks: Vec<Repository>) -> Self {
        Self {
            saved: Mutex::new(Some(bookmarks)),
        }
    }
}

impl BookmarkPersistence for MemoryPersistence {
    fn save(&self, bookmarks: &[Repository]) -> Result<()> {
        *self.saved.lock() = Some(bookmarks.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<Vec<Repository>> {
        Ok(self.saved.lock().clone().unwrap_or_default())
    }

    fn delete(&self) -> Result<()> {
        *self.saved.lock() = None;
        Ok(())
    }
}
