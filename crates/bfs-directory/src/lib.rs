//! Directory tier of the blob store.
//!
//! Maps user paths to needles and needles to the storage nodes that hold
//! them. The topology of racks, stores, groups and volumes is pulled from
//! the coordination service by [`TopologySync`] and published through the
//! [`Dispatcher`]; file and directory records live in a flat key/value
//! store behind [`meta::MetaStore`].

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod idgen;
pub mod meta;
pub mod service;
pub mod sync;
pub mod topology;

#[cfg(test)]
mod testutil;

pub use api::DirectoryApi;
pub use config::{ConfigError, DirectoryConfig};
pub use dispatcher::Dispatcher;
pub use idgen::{KeyGenerator, LocalKeyGenerator, MockKeyGenerator};
pub use service::Directory;
pub use sync::TopologySync;
pub use topology::{Store, Topology};
