// Physical storage engines
// Both speak "JSON blob under a key" - what goes in the blob is the caller's business

pub mod cache;
pub mod error;
pub mod file;

pub use cache::CacheManager;
pub use error::{Result, StoreError};
pub use file::FileStore;
