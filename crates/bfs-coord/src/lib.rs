//! Coordination-service contract consumed by the directory tier.
//!
//! The directory only reads and watches; it never writes coordination state.
//! Node names are returned as listed by the service; descriptors are opaque
//! bytes that the caller parses.

pub mod layout;
pub mod mem;

use std::sync::Arc;

use async_trait::async_trait;
use bfs_types::Result;
use tokio::sync::watch;

pub use layout::ClusterLayout;
pub use mem::{CoordOp, MemCoord};

/// Fires when anything under the stores subtree changes after the watch was
/// armed. The carried value is a change counter.
pub type ChangeWatch = watch::Receiver<u64>;

#[async_trait]
pub trait CoordClient: Send + Sync {
    /// List all racks and arm a change watch on the stores subtree.
    async fn watch_racks(&self) -> Result<(Vec<String>, ChangeWatch)>;
    async fn rack_stores(&self, rack: &str) -> Result<Vec<String>>;
    /// Raw store descriptor.
    async fn store(&self, rack: &str, store: &str) -> Result<Vec<u8>>;
    /// Volume ids hosted by a store, as listed.
    async fn store_volumes(&self, rack: &str, store: &str) -> Result<Vec<String>>;

    async fn groups(&self) -> Result<Vec<String>>;
    async fn group_stores(&self, group: &str) -> Result<Vec<String>>;

    async fn volumes(&self) -> Result<Vec<String>>;
    /// Raw replicated volume state.
    async fn volume(&self, volume: &str) -> Result<Vec<u8>>;
    async fn volume_stores(&self, volume: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: CoordClient + ?Sized> CoordClient for Arc<T> {
    async fn watch_racks(&self) -> Result<(Vec<String>, ChangeWatch)> {
        (**self).watch_racks().await
    }
    async fn rack_stores(&self, rack: &str) -> Result<Vec<String>> {
        (**self).rack_stores(rack).await
    }
    async fn store(&self, rack: &str, store: &str) -> Result<Vec<u8>> {
        (**self).store(rack, store).await
    }
    async fn store_volumes(&self, rack: &str, store: &str) -> Result<Vec<String>> {
        (**self).store_volumes(rack, store).await
    }
    async fn groups(&self) -> Result<Vec<String>> {
        (**self).groups().await
    }
    async fn group_stores(&self, group: &str) -> Result<Vec<String>> {
        (**self).group_stores(group).await
    }
    async fn volumes(&self) -> Result<Vec<String>> {
        (**self).volumes().await
    }
    async fn volume(&self, volume: &str) -> Result<Vec<u8>> {
        (**self).volume(volume).await
    }
    async fn volume_stores(&self, volume: &str) -> Result<Vec<String>> {
        (**self).volume_stores(volume).await
    }
}
