//! Immutable view of cluster placement: stores, groups, volumes and their
//! cross-references. A new [`Topology`] is assembled on every
//! synchronization cycle and swapped in whole; nothing mutates one after
//! assembly.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use bfs_types::status_code::DirectoryCode;
use bfs_types::{make_error_msg, GroupId, Result, StoreId, VolumeId};

/// Store status bits as published in the store descriptor.
pub mod store_status {
    pub const ENABLE_BIT: u32 = 31;
    pub const READ_BIT: u32 = 0;
    pub const WRITE_BIT: u32 = 1;

    pub const INIT: u32 = 0;
    pub const ENABLE: u32 = 1 << ENABLE_BIT;
    pub const READ: u32 = ENABLE | (1 << READ_BIT);
    pub const WRITE: u32 = ENABLE | (1 << WRITE_BIT);
    pub const HEALTH: u32 = READ | WRITE;
    pub const FAIL: u32 = ENABLE;
}

/// Storage node descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    #[serde(default)]
    pub rack: String,
    /// Stat endpoint.
    #[serde(default)]
    pub stat: String,
    #[serde(default)]
    pub admin: String,
    /// Data endpoint handed to clients.
    #[serde(default)]
    pub api: String,
    #[serde(default)]
    pub status: u32,
}

impl Store {
    pub fn can_read(&self) -> bool {
        self.status == store_status::READ || self.status == store_status::HEALTH
    }

    pub fn can_write(&self) -> bool {
        self.status == store_status::WRITE || self.status == store_status::HEALTH
    }
}

/// Replicated per-volume state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeState {
    pub free_space: u64,
    pub total_write_processed: u64,
    pub total_write_delay: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub stores: HashMap<StoreId, Store>,
    pub store_volumes: HashMap<StoreId, Vec<VolumeId>>,
    pub groups: BTreeMap<GroupId, Vec<StoreId>>,
    pub store_group: HashMap<StoreId, GroupId>,
    pub volumes: HashMap<VolumeId, VolumeState>,
    pub volume_stores: HashMap<VolumeId, Vec<StoreId>>,
}

/// Raw maps read in one synchronization cycle, before cross-checking.
#[derive(Debug, Clone, Default)]
pub struct TopologyParts {
    pub stores: HashMap<StoreId, Store>,
    pub store_volumes: HashMap<StoreId, Vec<VolumeId>>,
    pub groups: BTreeMap<GroupId, Vec<StoreId>>,
    pub volumes: HashMap<VolumeId, VolumeState>,
    pub volume_stores: HashMap<VolumeId, Vec<StoreId>>,
}

impl Topology {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cross-check raw maps and build a snapshot.
    ///
    /// A store listed by several groups stays in the lowest-numbered one.
    /// A volume whose hosts span groups, or include a store outside every
    /// group, loses its hosting entry. Empty cross-reference lists are
    /// omitted.
    pub fn assemble(parts: TopologyParts) -> Self {
        let TopologyParts {
            stores,
            store_volumes,
            groups: raw_groups,
            volumes,
            volume_stores: raw_volume_stores,
        } = parts;

        let mut groups = BTreeMap::new();
        let mut store_group = HashMap::new();
        for (gid, members) in raw_groups {
            let mut kept = Vec::with_capacity(members.len());
            for store in members {
                match store_group.get(&store) {
                    Some(owner) => {
                        tracing::warn!(%store, group = %gid, owner = %owner, "store listed by two groups, keeping first");
                    }
                    None => {
                        store_group.insert(store.clone(), gid);
                        kept.push(store);
                    }
                }
            }
            if !kept.is_empty() {
                groups.insert(gid, kept);
            }
        }

        let mut volume_stores = HashMap::new();
        for (vid, hosts) in raw_volume_stores {
            if hosts.is_empty() {
                continue;
            }
            let owners: HashSet<Option<&GroupId>> =
                hosts.iter().map(|s| store_group.get(s)).collect();
            match owners.into_iter().collect::<Vec<_>>().as_slice() {
                [Some(_)] => {
                    volume_stores.insert(vid, hosts);
                }
                _ => {
                    tracing::warn!(%vid, ?hosts, "volume hosts are not within one group, dropping placement");
                }
            }
        }

        let store_volumes = store_volumes
            .into_iter()
            .filter(|(_, vids)| !vids.is_empty())
            .collect();

        Self {
            stores,
            store_volumes,
            groups,
            store_group,
            volumes,
            volume_stores,
        }
    }

    pub fn store(&self, id: &str) -> Option<&Store> {
        self.stores.get(id)
    }

    pub fn group_of(&self, store: &str) -> Option<GroupId> {
        self.store_group.get(store).copied()
    }

    /// Whether every member of `gid` is known and write-capable.
    pub fn group_writable(&self, gid: GroupId) -> bool {
        match self.groups.get(&gid) {
            Some(members) => members
                .iter()
                .all(|s| self.stores.get(s).is_some_and(Store::can_write)),
            None => false,
        }
    }

    fn hosts(&self, vid: VolumeId) -> Result<&[StoreId]> {
        match self.volume_stores.get(&vid) {
            Some(hosts) => Ok(hosts),
            None => {
                tracing::error!(%vid, "topology inconsistent: volume has no placement");
                make_error_msg(
                    DirectoryCode::TOPOLOGY_INCONSISTENT,
                    format!("volume {} absent from topology", vid),
                )
            }
        }
    }

    /// Data endpoints of read-capable hosts of `vid`, in placement order.
    /// Hosts missing from the store map are skipped.
    pub fn readable_endpoints(&self, vid: VolumeId) -> Result<Vec<String>> {
        let mut endpoints = Vec::new();
        for id in self.hosts(vid)? {
            match self.stores.get(id) {
                Some(store) if store.can_read() => endpoints.push(store.api.clone()),
                Some(_) => {}
                None => tracing::warn!(%vid, store = %id, "volume host missing from store map"),
            }
        }
        if endpoints.is_empty() {
            return make_error_msg(
                DirectoryCode::STORE_NOT_AVAILABLE,
                format!("no readable store for volume {}", vid),
            );
        }
        Ok(endpoints)
    }

    /// Data endpoints of every host of `vid`; all must be write-capable.
    pub fn writable_endpoints(&self, vid: VolumeId) -> Result<Vec<String>> {
        let hosts = self.hosts(vid)?;
        let mut endpoints = Vec::with_capacity(hosts.len());
        for id in hosts {
            let Some(store) = self.stores.get(id) else {
                tracing::error!(%vid, store = %id, "topology inconsistent: volume host unknown");
                return make_error_msg(
                    DirectoryCode::TOPOLOGY_INCONSISTENT,
                    format!("store {} of volume {} absent from topology", id, vid),
                );
            };
            if !store.can_write() {
                return make_error_msg(
                    DirectoryCode::STORE_NOT_AVAILABLE,
                    format!("store {} of volume {} is not writable", id, vid),
                );
            }
            endpoints.push(store.api.clone());
        }
        Ok(endpoints)
    }
}
