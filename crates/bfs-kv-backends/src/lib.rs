//! Concrete [`bfs_kv::KvStore`] implementations.
//!
//! - **memdb** -- in-memory `BTreeMap` store with fault injection, used by
//!   tests and single-process deployments.

pub mod memdb;

pub use memdb::{KvOp, MemKvStore};
