pub mod sqlite;

use async_trait::async_trait;

use crate::app::Result;

pub use sqlite::SqliteKeyStore;

/// Durable key/value blob store used to mirror hot cache entries across
/// process restarts. Every operation is independently fallible; callers on
/// the cache-persistence path catch and ignore failures.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn list_keys(&self) -> Result<Vec<String>>;
}
