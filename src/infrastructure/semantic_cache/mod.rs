//! Semantic cache infrastructure: repositories and the caching service

mod in_memory;
mod service;
mod sqlite;

#[cfg(test)]
pub(crate) use service::fixtures;
pub use in_memory::InMemoryCacheRepository;
pub use service::{CacheAdmission, SemanticCacheService};
pub use sqlite::SqliteCacheRepository;
