//! Background loop that mirrors coordination-service state into the
//! dispatcher.
//!
//! One cycle reads stores, then groups, then volumes, assembles a
//! [`Topology`] and publishes it. Cycles never overlap. A failed cycle
//! publishes nothing, so the last good snapshot stays in place.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use bfs_coord::{ChangeWatch, CoordClient};
use bfs_types::status_code::CoordCode;
use bfs_types::{make_error_msg, GroupId, Result, Status, VolumeId};
use bfs_utils::with_deadline;

use crate::config::DirectoryConfig;
use crate::dispatcher::Dispatcher;
use crate::topology::{Store, Topology, TopologyParts, VolumeState};

pub struct TopologySync<C> {
    coord: C,
    dispatcher: Arc<Dispatcher>,
    pull_interval: Duration,
    retry_interval: Duration,
    op_timeout: Duration,
}

/// Parse listed node names as ids, skipping the ones that do not parse.
fn parse_ids<T>(names: &[String], what: &str, owner: &str) -> Vec<T>
where
    T: FromStr,
    T::Err: Display,
{
    names
        .iter()
        .filter_map(|name| match name.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(owner, name = %name, error = %e, "skipping malformed {} id", what);
                None
            }
        })
        .collect()
}

fn bad_data(what: String, e: serde_json::Error) -> Status {
    Status::with_message(CoordCode::BAD_DATA, format!("{}: {}", what, e))
}

impl<C: CoordClient> TopologySync<C> {
    pub fn new(coord: C, dispatcher: Arc<Dispatcher>, config: &DirectoryConfig) -> Self {
        Self {
            coord,
            dispatcher,
            pull_interval: config.pull_interval,
            retry_interval: config.retry_interval,
            op_timeout: config.op_timeout,
        }
    }

    async fn sync_stores(&self, parts: &mut TopologyParts) -> Result<ChangeWatch> {
        let t = self.op_timeout;
        let (racks, changes) = with_deadline(t, "watch_racks", self.coord.watch_racks()).await?;
        for rack in &racks {
            let nodes = with_deadline(t, "rack_stores", self.coord.rack_stores(rack)).await?;
            for node in &nodes {
                let raw = with_deadline(t, "store", self.coord.store(rack, node)).await?;
                let store: Store = serde_json::from_slice(&raw)
                    .map_err(|e| bad_data(format!("store descriptor {}/{}", rack, node), e))?;
                if store.id.is_empty() {
                    return make_error_msg(
                        CoordCode::BAD_DATA,
                        format!("store descriptor {}/{} has no id", rack, node),
                    );
                }
                let listed =
                    with_deadline(t, "store_volumes", self.coord.store_volumes(rack, node)).await?;
                let vids: Vec<VolumeId> = parse_ids(&listed, "volume", &store.id);
                parts.store_volumes.insert(store.id.clone(), vids);
                parts.stores.insert(store.id.clone(), store);
            }
        }
        Ok(changes)
    }

    async fn sync_groups(&self, parts: &mut TopologyParts) -> Result<()> {
        let t = self.op_timeout;
        let names = with_deadline(t, "groups", self.coord.groups()).await?;
        for name in &names {
            let gid: GroupId = match name.parse() {
                Ok(gid) => gid,
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "skipping malformed group id");
                    continue;
                }
            };
            let members = with_deadline(t, "group_stores", self.coord.group_stores(name)).await?;
            parts.groups.insert(gid, members);
        }
        Ok(())
    }

    async fn sync_volumes(&self, parts: &mut TopologyParts) -> Result<()> {
        let t = self.op_timeout;
        let names = with_deadline(t, "volumes", self.coord.volumes()).await?;
        for name in &names {
            let vid: VolumeId = match name.parse() {
                Ok(vid) => vid,
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "skipping malformed volume id");
                    continue;
                }
            };
            let raw = with_deadline(t, "volume", self.coord.volume(name)).await?;
            let state: VolumeState = serde_json::from_slice(&raw)
                .map_err(|e| bad_data(format!("volume state {}", vid), e))?;
            let hosts = with_deadline(t, "volume_stores", self.coord.volume_stores(name)).await?;
            parts.volumes.insert(vid, state);
            parts.volume_stores.insert(vid, hosts);
        }
        Ok(())
    }

    /// Read one full topology without publishing it.
    pub async fn sync_once(&self) -> Result<(Topology, ChangeWatch)> {
        let mut parts = TopologyParts::default();
        let changes = self.sync_stores(&mut parts).await?;
        self.sync_groups(&mut parts).await?;
        self.sync_volumes(&mut parts).await?;
        Ok((Topology::assemble(parts), changes))
    }

    /// Run one cycle and publish its result.
    pub async fn run_once(&self) -> Result<ChangeWatch> {
        let (topology, changes) = self.sync_once().await?;
        self.dispatcher.update(topology);
        Ok(changes)
    }

    async fn wait_for_change(&self, changes: &mut ChangeWatch) {
        tokio::select! {
            r = changes.changed() => match r {
                Ok(()) => tracing::info!("store status change or new store"),
                // watch source gone, fall back to polling
                Err(_) => tokio::time::sleep(self.pull_interval).await,
            },
            _ = tokio::time::sleep(self.pull_interval) => {
                tracing::debug!("pull interval elapsed");
            }
        }
    }

    /// Loop until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(pull_interval = ?self.pull_interval, "topology synchronizer started");
        while !*shutdown.borrow() {
            let cycle = async {
                match self.run_once().await {
                    Ok(mut changes) => self.wait_for_change(&mut changes).await,
                    Err(e) => {
                        tracing::error!(error = %e, "topology sync failed");
                        tokio::time::sleep(self.retry_interval).await;
                    }
                }
            };
            tokio::select! {
                _ = cycle => {}
                r = shutdown.changed() => {
                    if r.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("topology synchronizer stopped");
    }
}
