//! Flat key/value store with hash values, as used by the metadata layer.
//!
//! Keys are UTF-8 strings. A key holds either a plain value or a hash
//! (field -> value); using an operation of the other shape on a key fails
//! with `Kv::WrongType`.

use std::sync::Arc;

use async_trait::async_trait;
use bfs_types::Result;

/// One field/value pair of a hash.
pub type HashEntry = (String, Vec<u8>);

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    /// Remove a plain or hash key. Returns whether it existed.
    async fn del(&self, key: &str) -> Result<bool>;
    async fn exists(&self, key: &str) -> Result<bool>;

    /// All fields of a hash, ordered by field name. Empty when absent.
    async fn hget_all(&self, key: &str) -> Result<Vec<HashEntry>>;
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()>;
    /// Remove one field. Returns whether it existed. An emptied hash
    /// disappears.
    async fn hdel(&self, key: &str, field: &str) -> Result<bool>;
    async fn hexists(&self, key: &str, field: &str) -> Result<bool>;
}

#[async_trait]
impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).set(key, value).await
    }
    async fn del(&self, key: &str) -> Result<bool> {
        (**self).del(key).await
    }
    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }
    async fn hget_all(&self, key: &str) -> Result<Vec<HashEntry>> {
        (**self).hget_all(key).await
    }
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()> {
        (**self).hset(key, field, value).await
    }
    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        (**self).hdel(key, field).await
    }
    async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        (**self).hexists(key, field).await
    }
}
