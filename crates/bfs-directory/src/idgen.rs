//! Needle key allocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use bfs_types::{NeedleKey, Result};

#[async_trait]
pub trait KeyGenerator: Send + Sync {
    /// Allocate a cluster-unique needle key.
    async fn allocate_key(&self) -> Result<NeedleKey>;
}

#[async_trait]
impl<T: KeyGenerator + ?Sized> KeyGenerator for Arc<T> {
    async fn allocate_key(&self) -> Result<NeedleKey> {
        (**self).allocate_key().await
    }
}

/// Process-local generator: a counter seeded from the wall clock so keys
/// from successive runs do not collide. Unique only within one directory
/// process.
pub struct LocalKeyGenerator {
    next: AtomicU64,
}

impl LocalKeyGenerator {
    pub fn new() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self::starting_at(millis << 20)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for LocalKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyGenerator for LocalKeyGenerator {
    async fn allocate_key(&self) -> Result<NeedleKey> {
        Ok(NeedleKey(self.next.fetch_add(1, Ordering::Relaxed)))
    }
}

type Handler = Box<dyn Fn() -> Result<NeedleKey> + Send + Sync>;

/// Configurable generator for tests. Counts up from 1 unless a handler is
/// installed.
pub struct MockKeyGenerator {
    next: AtomicU64,
    handler: Mutex<Option<Handler>>,
}

impl MockKeyGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            handler: Mutex::new(None),
        }
    }

    pub fn on_allocate(&self, f: impl Fn() -> Result<NeedleKey> + Send + Sync + 'static) {
        *self.handler.lock() = Some(Box::new(f));
    }
}

impl Default for MockKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyGenerator for MockKeyGenerator {
    async fn allocate_key(&self) -> Result<NeedleKey> {
        if let Some(f) = self.handler.lock().as_ref() {
            return f();
        }
        Ok(NeedleKey(self.next.fetch_add(1, Ordering::Relaxed)))
    }
}
