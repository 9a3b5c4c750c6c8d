use serde::{Deserialize, Serialize};

use bfs_utils::path_utils;

/// Immediate children of one directory, rebuilt from its hash entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirInfo {
    pub dir: String,
    pub files: Vec<String>,
    /// Subdirectory names, each ending in `/`.
    pub sub_dirs: Vec<String>,
}

impl DirInfo {
    /// Partition hash field names into files and subdirectories.
    pub fn from_entries<I>(dir: &str, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let (sub_dirs, files) = names
            .into_iter()
            .partition(|name| path_utils::is_dir_path(name));
        Self {
            dir: dir.to_string(),
            files,
            sub_dirs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.sub_dirs.is_empty()
    }
}

/// Hash value recorded for a child: its size for a leaf, 0 for a directory.
pub(crate) fn entry_value(name: &str, leaf_size: u64) -> Vec<u8> {
    let size = if path_utils::is_dir_path(name) { 0 } else { leaf_size };
    size.to_string().into_bytes()
}
