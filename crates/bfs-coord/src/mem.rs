//! In-memory coordination tree.
//!
//! Layout mirrors the real service: racks/<rack>/<store> with a descriptor
//! and a list of hosted volumes, groups/<gid> with member stores, and
//! volumes/<vid> with a state blob and hosting stores. Any mutation under the
//! racks subtree bumps the change counter seen by [`ChangeWatch`] holders.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use bfs_types::status_code::{CoordCode, StatusCode};
use bfs_types::{make_error_msg, Result};

use crate::{ChangeWatch, CoordClient};

#[derive(Debug, Clone, Default)]
struct StoreNode {
    descriptor: Vec<u8>,
    volumes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct VolumeNode {
    state: Vec<u8>,
    stores: Vec<String>,
}

#[derive(Debug, Default)]
struct Tree {
    racks: BTreeMap<String, BTreeMap<String, StoreNode>>,
    groups: BTreeMap<String, Vec<String>>,
    volumes: BTreeMap<String, VolumeNode>,
}

/// Read calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordOp {
    WatchRacks,
    RackStores,
    Store,
    StoreVolumes,
    Groups,
    GroupStores,
    Volumes,
    Volume,
    VolumeStores,
}

pub struct MemCoord {
    tree: Mutex<Tree>,
    changes: watch::Sender<u64>,
    /// Remaining injected failures per operation.
    faults: Mutex<HashMap<CoordOp, u32>>,
    unavailable: AtomicBool,
}

impl MemCoord {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            tree: Mutex::new(Tree::default()),
            changes,
            faults: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn notify(&self) {
        self.changes.send_modify(|v| *v += 1);
    }

    // -- mutation (tests and layout loading) --------------------------------

    pub fn put_store(&self, rack: &str, store: &str, descriptor: Vec<u8>, volumes: &[&str]) {
        self.tree.lock().racks.entry(rack.to_string()).or_default().insert(
            store.to_string(),
            StoreNode {
                descriptor,
                volumes: volumes.iter().map(|v| v.to_string()).collect(),
            },
        );
        self.notify();
    }

    /// Replace a store's descriptor, e.g. to flip its status bits.
    pub fn set_store_descriptor(&self, rack: &str, store: &str, descriptor: Vec<u8>) -> bool {
        let updated = match self.tree.lock().racks.get_mut(rack).and_then(|r| r.get_mut(store)) {
            Some(node) => {
                node.descriptor = descriptor;
                true
            }
            None => false,
        };
        if updated {
            self.notify();
        }
        updated
    }

    pub fn remove_store(&self, rack: &str, store: &str) -> bool {
        let removed = {
            let mut tree = self.tree.lock();
            let removed = tree
                .racks
                .get_mut(rack)
                .map(|r| r.remove(store).is_some())
                .unwrap_or(false);
            if tree.racks.get(rack).is_some_and(|r| r.is_empty()) {
                tree.racks.remove(rack);
            }
            removed
        };
        if removed {
            self.notify();
        }
        removed
    }

    pub fn put_group(&self, group: &str, stores: &[&str]) {
        self.tree.lock().groups.insert(
            group.to_string(),
            stores.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn put_volume(&self, volume: &str, state: Vec<u8>, stores: &[&str]) {
        self.tree.lock().volumes.insert(
            volume.to_string(),
            VolumeNode {
                state,
                stores: stores.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn remove_volume(&self, volume: &str) -> bool {
        self.tree.lock().volumes.remove(volume).is_some()
    }

    // -- fault injection -----------------------------------------------------

    /// Fail the next `times` calls of `op` with `Coord::Unavailable`.
    pub fn fail_next(&self, op: CoordOp, times: u32) {
        *self.faults.lock().entry(op).or_insert(0) += times;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self, op: CoordOp) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return make_error_msg(CoordCode::UNAVAILABLE, "coordination service unavailable");
        }
        let mut faults = self.faults.lock();
        if let Some(left) = faults.get_mut(&op) {
            if *left > 0 {
                *left -= 1;
                return make_error_msg(
                    StatusCode::FAULT_INJECTION,
                    format!("injected {:?} failure", op),
                );
            }
        }
        Ok(())
    }
}

impl Default for MemCoord {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found<T>(what: &str, name: &str) -> Result<T> {
    make_error_msg(CoordCode::NODE_NOT_FOUND, format!("{} {} not found", what, name))
}

#[async_trait]
impl CoordClient for MemCoord {
    async fn watch_racks(&self) -> Result<(Vec<String>, ChangeWatch)> {
        self.check(CoordOp::WatchRacks)?;
        // Subscribe before listing so a change racing the listing still fires.
        let rx = self.changes.subscribe();
        let racks = self.tree.lock().racks.keys().cloned().collect();
        Ok((racks, rx))
    }

    async fn rack_stores(&self, rack: &str) -> Result<Vec<String>> {
        self.check(CoordOp::RackStores)?;
        match self.tree.lock().racks.get(rack) {
            Some(r) => Ok(r.keys().cloned().collect()),
            None => not_found("rack", rack),
        }
    }

    async fn store(&self, rack: &str, store: &str) -> Result<Vec<u8>> {
        self.check(CoordOp::Store)?;
        match self.tree.lock().racks.get(rack).and_then(|r| r.get(store)) {
            Some(node) => Ok(node.descriptor.clone()),
            None => not_found("store", store),
        }
    }

    async fn store_volumes(&self, rack: &str, store: &str) -> Result<Vec<String>> {
        self.check(CoordOp::StoreVolumes)?;
        match self.tree.lock().racks.get(rack).and_then(|r| r.get(store)) {
            Some(node) => Ok(node.volumes.clone()),
            None => not_found("store", store),
        }
    }

    async fn groups(&self) -> Result<Vec<String>> {
        self.check(CoordOp::Groups)?;
        Ok(self.tree.lock().groups.keys().cloned().collect())
    }

    async fn group_stores(&self, group: &str) -> Result<Vec<String>> {
        self.check(CoordOp::GroupStores)?;
        match self.tree.lock().groups.get(group) {
            Some(stores) => Ok(stores.clone()),
            None => not_found("group", group),
        }
    }

    async fn volumes(&self) -> Result<Vec<String>> {
        self.check(CoordOp::Volumes)?;
        Ok(self.tree.lock().volumes.keys().cloned().collect())
    }

    async fn volume(&self, volume: &str) -> Result<Vec<u8>> {
        self.check(CoordOp::Volume)?;
        match self.tree.lock().volumes.get(volume) {
            Some(node) => Ok(node.state.clone()),
            None => not_found("volume", volume),
        }
    }

    async fn volume_stores(&self, volume: &str) -> Result<Vec<String>> {
        self.check(CoordOp::VolumeStores)?;
        match self.tree.lock().volumes.get(volume) {
            Some(node) => Ok(node.stores.clone()),
            None => not_found("volume", volume),
        }
    }
}
