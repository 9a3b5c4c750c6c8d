//! In-memory KV store backed by a `BTreeMap`.
//!
//! All data lives behind a `parking_lot::RwLock`. Clones share the same
//! data, so a test can keep a handle for inspection while the service owns
//! another.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use bfs_kv::{HashEntry, KvStore};
use bfs_types::status_code::{KvCode, StatusCode};
use bfs_types::{make_error_msg, Result};

#[derive(Debug, Clone)]
enum Entry {
    Value(Vec<u8>),
    Hash(BTreeMap<String, Vec<u8>>),
}

/// Operation kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvOp {
    Get,
    Set,
    Del,
    HGetAll,
    HSet,
    HDel,
}

#[derive(Default)]
struct Faults {
    /// (op, key) pairs that fail with `Common::FaultInjection`.
    rules: HashSet<(KvOp, String)>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemKvStore {
    data: Arc<RwLock<BTreeMap<String, Entry>>>,
    faults: Arc<Mutex<Faults>>,
    unavailable: Arc<AtomicBool>,
    writes: Arc<AtomicU64>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// All keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Count of successful mutating calls since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make `op` on `key` fail until [`MemKvStore::clear_faults`].
    pub fn fail_on(&self, op: KvOp, key: impl Into<String>) {
        self.faults.lock().rules.insert((op, key.into()));
    }

    pub fn clear_faults(&self) {
        self.faults.lock().rules.clear();
    }

    /// Fail every call with `Kv::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self, op: KvOp, key: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return make_error_msg(KvCode::UNAVAILABLE, "kv store unavailable");
        }
        let faults = self.faults.lock();
        if faults.rules.contains(&(op, key.to_string())) {
            tracing::debug!(?op, key, "injected kv fault");
            return make_error_msg(
                StatusCode::FAULT_INJECTION,
                format!("injected {:?} failure on {}", op, key),
            );
        }
        Ok(())
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn wrong_type<T>(key: &str) -> Result<T> {
    make_error_msg(KvCode::WRONG_TYPE, format!("key {} holds another value type", key))
}

#[async_trait]
impl KvStore for MemKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check(KvOp::Get, key)?;
        match self.data.read().get(key) {
            None => Ok(None),
            Some(Entry::Value(v)) => Ok(Some(v.clone())),
            Some(Entry::Hash(_)) => wrong_type(key),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.check(KvOp::Set, key)?;
        let mut data = self.data.write();
        if let Some(Entry::Hash(_)) = data.get(key) {
            return wrong_type(key);
        }
        data.insert(key.to_string(), Entry::Value(value));
        self.wrote();
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.check(KvOp::Del, key)?;
        let existed = self.data.write().remove(key).is_some();
        if existed {
            self.wrote();
        }
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check(KvOp::Get, key)?;
        Ok(self.data.read().contains_key(key))
    }

    async fn hget_all(&self, key: &str) -> Result<Vec<HashEntry>> {
        self.check(KvOp::HGetAll, key)?;
        match self.data.read().get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Hash(h)) => Ok(h.iter().map(|(f, v)| (f.clone(), v.clone())).collect()),
            Some(Entry::Value(_)) => wrong_type(key),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()> {
        self.check(KvOp::HSet, key)?;
        let mut data = self.data.write();
        let entry = data
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(BTreeMap::new()));
        match entry {
            Entry::Hash(h) => {
                h.insert(field.to_string(), value);
            }
            Entry::Value(_) => return wrong_type(key),
        }
        self.wrote();
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        self.check(KvOp::HDel, key)?;
        let mut data = self.data.write();
        let (existed, now_empty) = match data.get_mut(key) {
            None => return Ok(false),
            Some(Entry::Value(_)) => return wrong_type(key),
            Some(Entry::Hash(h)) => (h.remove(field).is_some(), h.is_empty()),
        };
        if now_empty {
            data.remove(key);
        }
        if existed {
            self.wrote();
        }
        Ok(existed)
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        self.check(KvOp::HGetAll, key)?;
        match self.data.read().get(key) {
            None => Ok(false),
            Some(Entry::Hash(h)) => Ok(h.contains_key(field)),
            Some(Entry::Value(_)) => wrong_type(key),
        }
    }
}
