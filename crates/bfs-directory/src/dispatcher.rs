//! Write-target selection over the current topology snapshot.
//!
//! The dispatcher owns the only published [`Topology`]. `update` swaps in a
//! new snapshot together with its precomputed write candidates behind one
//! pointer, so a reader sees either the old pair or the new pair.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use bfs_types::status_code::DirectoryCode;
use bfs_types::{make_error_msg, Result, VolumeId};

use crate::topology::Topology;

struct View {
    topology: Arc<Topology>,
    /// Write-eligible volumes, sorted by id.
    writable: Vec<VolumeId>,
    published: bool,
}

pub struct Dispatcher {
    view: ArcSwap<View>,
    cursor: AtomicUsize,
    min_free_space: u64,
}

impl Dispatcher {
    pub fn new(min_free_space: u64) -> Self {
        Self {
            view: ArcSwap::from_pointee(View {
                topology: Arc::new(Topology::empty()),
                writable: Vec::new(),
                published: false,
            }),
            cursor: AtomicUsize::new(0),
            min_free_space,
        }
    }

    /// Volumes that may take a write: placed within one group whose members
    /// are all write-capable, with free space above the floor.
    fn eligible(topology: &Topology, min_free_space: u64) -> Vec<VolumeId> {
        let mut out: Vec<VolumeId> = topology
            .volume_stores
            .iter()
            .filter(|(vid, hosts)| {
                let Some(gid) = hosts.first().and_then(|s| topology.group_of(s)) else {
                    return false;
                };
                topology.group_writable(gid)
                    && hosts.iter().all(|s| topology.group_of(s) == Some(gid))
                    && topology
                        .volumes
                        .get(*vid)
                        .is_some_and(|state| state.free_space > min_free_space)
            })
            .map(|(vid, _)| *vid)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn update(&self, topology: Topology) {
        let writable = Self::eligible(&topology, self.min_free_space);
        tracing::info!(
            stores = topology.stores.len(),
            groups = topology.groups.len(),
            volumes = topology.volumes.len(),
            writable = writable.len(),
            "publishing topology snapshot"
        );
        self.view.store(Arc::new(View {
            topology: Arc::new(topology),
            writable,
            published: true,
        }));
    }

    pub fn snapshot(&self) -> Arc<Topology> {
        Arc::clone(&self.view.load().topology)
    }

    /// Whether any snapshot has been published yet.
    pub fn is_ready(&self) -> bool {
        self.view.load().published
    }

    /// Pick a write-eligible volume, rotating across candidates. Returns the
    /// snapshot the choice was made against, so follow-up lookups agree
    /// with it.
    pub fn select_write_volume(&self) -> Result<(VolumeId, Arc<Topology>)> {
        let view = self.view.load_full();
        if view.writable.is_empty() {
            return make_error_msg(DirectoryCode::STORE_NOT_AVAILABLE, "no writable volume");
        }
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        let vid = view.writable[n % view.writable.len()];
        Ok((vid, Arc::clone(&view.topology)))
    }
}
