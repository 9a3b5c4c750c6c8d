//! Static cluster layout loaded from JSON into a [`MemCoord`].
//!
//! ```json
//! {
//!   "racks": {
//!     "rack-a": {
//!       "s1": { "descriptor": { "id": "s1", "api": "10.0.0.1:6062", "status": 2147483651 },
//!               "volumes": ["1"] }
//!     }
//!   },
//!   "groups": { "1": ["s1"] },
//!   "volumes": { "1": { "state": { "free_space": 1024 }, "stores": ["s1"] } }
//! }
//! ```
//!
//! Descriptors and volume states stay opaque here; they are stored as their
//! JSON encoding exactly like the coordination service would hold them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use bfs_types::status_code::{CoordCode, StatusCode};
use bfs_types::{make_error_msg, Result, Status};

use crate::MemCoord;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreLayout {
    pub descriptor: serde_json::Value,
    #[serde(default)]
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeLayout {
    pub state: serde_json::Value,
    #[serde(default)]
    pub stores: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterLayout {
    pub racks: BTreeMap<String, BTreeMap<String, StoreLayout>>,
    pub groups: BTreeMap<String, Vec<String>>,
    pub volumes: BTreeMap<String, VolumeLayout>,
}

impl ClusterLayout {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| Status::with_message(CoordCode::BAD_DATA, format!("bad layout: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                return make_error_msg(
                    StatusCode::IO_ERROR,
                    format!("read {}: {}", path.display(), e),
                )
            }
        };
        Self::from_json_str(&text)
    }

    /// Write every node of the layout into `coord`.
    pub fn apply(&self, coord: &MemCoord) {
        for (rack, stores) in &self.racks {
            for (id, store) in stores {
                let volumes: Vec<&str> = store.volumes.iter().map(String::as_str).collect();
                coord.put_store(rack, id, store.descriptor.to_string().into_bytes(), &volumes);
            }
        }
        for (gid, stores) in &self.groups {
            let stores: Vec<&str> = stores.iter().map(String::as_str).collect();
            coord.put_group(gid, &stores);
        }
        for (vid, volume) in &self.volumes {
            let stores: Vec<&str> = volume.stores.iter().map(String::as_str).collect();
            coord.put_volume(vid, volume.state.to_string().into_bytes(), &stores);
        }
        tracing::info!(
            racks = self.racks.len(),
            groups = self.groups.len(),
            volumes = self.volumes.len(),
            "applied static cluster layout"
        );
    }

    pub fn into_coord(self) -> MemCoord {
        let coord = MemCoord::new();
        self.apply(&coord);
        coord
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoordClient;

    const LAYOUT: &str = r#"{
        "racks": {
            "rack-a": {
                "s1": { "descriptor": { "id": "s1", "status": 3 }, "volumes": ["1", "2"] }
            }
        },
        "groups": { "1": ["s1"] },
        "volumes": { "1": { "state": { "free_space": 10 }, "stores": ["s1"] } }
    }"#;

    #[tokio::test]
    async fn test_apply_layout() {
        let coord = ClusterLayout::from_json_str(LAYOUT).unwrap().into_coord();
        assert_eq!(coord.rack_stores("rack-a").await.unwrap(), vec!["s1"]);
        assert_eq!(coord.store_volumes("rack-a", "s1").await.unwrap(), vec!["1", "2"]);

        let desc: serde_json::Value =
            serde_json::from_slice(&coord.store("rack-a", "s1").await.unwrap()).unwrap();
        assert_eq!(desc["id"], "s1");

        let state: serde_json::Value =
            serde_json::from_slice(&coord.volume("1").await.unwrap()).unwrap();
        assert_eq!(state["free_space"], 10);
    }

    #[test]
    fn test_empty_and_bad_layout() {
        let layout = ClusterLayout::from_json_str("{}").unwrap();
        assert!(layout.racks.is_empty());

        let err = ClusterLayout::from_json_str("{\"racks\": 1}").unwrap_err();
        assert_eq!(err.code(), CoordCode::BAD_DATA);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClusterLayout::load("/nonexistent/layout.json").unwrap_err();
        assert_eq!(err.code(), StatusCode::IO_ERROR);
    }
}
