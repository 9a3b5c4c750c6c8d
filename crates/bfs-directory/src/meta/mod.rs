//! File, needle and directory-tree records over a flat key/hash store.
//!
//! Persisted layout:
//! - `<normalized path>` -> JSON [`File`]
//! - `<decimal needle key>` -> JSON [`Needle`]
//! - hash `<parent dir path>`: field `<child name>` -> decimal size, with
//!   subdirectory names ending in `/` and size 0

pub mod dir;
pub mod file;
pub mod range;
pub mod store;

pub use dir::DirInfo;
pub use file::{ChunkInfo, File, Needle};
pub use range::ByteRange;
pub use store::{MetaStore, PutOutcome};
