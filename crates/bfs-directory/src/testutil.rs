//! Fixtures shared by unit tests.

use std::sync::Arc;

use bfs_kv_backends::MemKvStore;
use bfs_types::{GroupId, VolumeId};

use crate::config::DirectoryConfig;
use crate::dispatcher::Dispatcher;
use crate::idgen::MockKeyGenerator;
use crate::meta::File;
use crate::service::Directory;
use crate::topology::store_status::HEALTH;
use crate::topology::{Store, Topology, TopologyParts, VolumeState};

pub fn store(id: &str, status: u32) -> Store {
    Store {
        id: id.to_string(),
        rack: "r1".to_string(),
        stat: format!("{}:stat", id),
        admin: format!("{}:admin", id),
        api: format!("{}:api", id),
        status,
    }
}

/// Builder for hand-made topologies.
#[derive(Default)]
pub struct TopologyFixture {
    parts: TopologyParts,
}

impl TopologyFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, gid: u32, members: &[(&str, u32)]) -> Self {
        for (id, status) in members {
            self.parts.stores.insert(id.to_string(), store(id, *status));
        }
        self.parts.groups.insert(
            GroupId(gid),
            members.iter().map(|(id, _)| id.to_string()).collect(),
        );
        self
    }

    pub fn volume(mut self, vid: u32, hosts: &[&str], free_space: u64) -> Self {
        let vid = VolumeId(vid);
        self.parts.volumes.insert(
            vid,
            VolumeState {
                free_space,
                ..Default::default()
            },
        );
        self.parts
            .volume_stores
            .insert(vid, hosts.iter().map(|s| s.to_string()).collect());
        for host in hosts {
            self.parts
                .store_volumes
                .entry(host.to_string())
                .or_default()
                .push(vid);
        }
        self
    }

    pub fn build(self) -> Topology {
        Topology::assemble(self.parts)
    }
}

// ---------------------------------------------------------------------------
// Directory harness
// ---------------------------------------------------------------------------

/// Needle ceiling used by harness-built directories.
pub const CHUNK: u64 = 100;

/// One group {s1, s2} hosting volumes 1 and 2, over in-memory backends.
pub struct Harness {
    pub dir: Directory<MemKvStore, Arc<MockKeyGenerator>>,
    pub kv: MemKvStore,
    pub keygen: Arc<MockKeyGenerator>,
    pub dispatcher: Arc<Dispatcher>,
}

impl Harness {
    pub fn config() -> DirectoryConfig {
        DirectoryConfig {
            needle_max_size: CHUNK,
            max_range_size: CHUNK,
            ..Default::default()
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HEALTH)
    }

    pub fn with_status(status: u32) -> Self {
        let kv = MemKvStore::new();
        let keygen = Arc::new(MockKeyGenerator::new());
        let dispatcher = Arc::new(Dispatcher::new(0));
        let dir = Directory::new(&Self::config(), Arc::clone(&dispatcher), kv.clone(), Arc::clone(&keygen));
        let h = Self {
            dir,
            kv,
            keygen,
            dispatcher,
        };
        h.publish_status(&[("s1", status), ("s2", status)]);
        h
    }

    fn layout(statuses: &[(&str, u32)], without: Option<VolumeId>) -> Topology {
        let mut f = TopologyFixture::new().group(1, statuses);
        for vid in [1, 2] {
            if without != Some(VolumeId(vid)) {
                f = f.volume(vid, &["s1", "s2"], 1000);
            }
        }
        f.build()
    }

    pub fn publish_status(&self, statuses: &[(&str, u32)]) {
        self.dispatcher.update(Self::layout(statuses, None));
    }

    pub fn publish_without_volume(&self, vid: VolumeId) {
        self.dispatcher
            .update(Self::layout(&[("s1", HEALTH), ("s2", HEALTH)], Some(vid)));
    }

    pub fn file(path: &str, size: u64) -> File {
        File {
            filename: path.to_string(),
            sha1: "0123abcd".into(),
            mine: "application/octet-stream".into(),
            filesize: size,
            ..Default::default()
        }
    }
}
