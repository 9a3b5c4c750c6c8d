//! Domain layer over the flat key/hash store.
//!
//! The backend has no multi-key transactions. A put is a saga: write the
//! file record, then the needle, then register the path in its parent
//! directories; a failing step undoes the earlier ones in reverse order.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use bfs_kv::KvStore;
use bfs_types::status_code::{KvCode, MetaCode, StatusCode};
use bfs_types::{make_error_msg, NeedleKey, Result, Status};
use bfs_utils::path_utils;
use bfs_utils::with_deadline;

use super::dir::{entry_value, DirInfo};
use super::file::{File, Needle};

/// Result of a metadata write that may find the record already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

fn file_key(path: &str) -> Result<String> {
    match path_utils::normalize(path) {
        Some(p) if !path_utils::is_dir_path(&p) => Ok(p),
        _ => make_error_msg(StatusCode::INVALID_ARG, format!("bad file path {:?}", path)),
    }
}

fn dir_key(path: &str) -> Result<String> {
    match path_utils::normalize(path) {
        Some(mut p) => {
            if !path_utils::is_dir_path(&p) {
                p.push(path_utils::SEPARATOR);
            }
            Ok(p)
        }
        None => make_error_msg(StatusCode::INVALID_ARG, format!("bad directory path {:?}", path)),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Status::with_message(KvCode::BAD_VALUE, e.to_string()))
}

fn decode<T: DeserializeOwned>(key: &str, raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw)
        .map_err(|e| Status::with_message(KvCode::BAD_VALUE, format!("{}: {}", key, e)))
}

pub struct MetaStore<K> {
    kv: K,
    op_timeout: Duration,
}

impl<K: KvStore> MetaStore<K> {
    pub fn new(kv: K, op_timeout: Duration) -> Self {
        Self { kv, op_timeout }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    async fn call<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_deadline(self.op_timeout, op, fut).await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.call("kv.get", self.kv.get(key)).await? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = encode(value)?;
        self.call("kv.set", self.kv.set(key, raw)).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.call("kv.del", self.kv.del(key)).await
    }

    /// Best-effort undo step of a failed put.
    async fn undo_key(&self, key: &str) {
        if let Err(e) = self.remove(key).await {
            tracing::error!(key, error = %e, "compensating delete failed, record orphaned");
        }
    }

    async fn undo_entry(&self, dir: &str, name: &str) {
        if let Err(e) = self.call("kv.hdel", self.kv.hdel(dir, name)).await {
            tracing::error!(dir, name, error = %e, "compensating entry removal failed");
        }
    }

    /// Undo directory entries, last written first.
    async fn undo_entries(&self, entries: Vec<(String, String)>) {
        for (dir, name) in entries.iter().rev() {
            self.undo_entry(dir, name).await;
        }
    }

    // ---- needles ----

    /// Write a needle unless its key is taken. Returns whether it was written.
    async fn put_needle(&self, needle: &Needle) -> Result<bool> {
        let key = needle.key.to_string();
        if self.call("kv.exists", self.kv.exists(&key)).await? {
            tracing::warn!(key = %needle.key, "needle already exists");
            return Ok(false);
        }
        self.store(&key, needle).await?;
        Ok(true)
    }

    pub async fn get_needle(&self, key: NeedleKey) -> Result<Option<Needle>> {
        self.load(&key.to_string()).await
    }

    // ---- files ----

    /// Persist a file and its needle and register the path.
    #[tracing::instrument(level = "debug", skip(self, file, needle), fields(path = %file.filename, key = %needle.key))]
    pub async fn put(&self, bucket: &str, file: &File, needle: &Needle) -> Result<PutOutcome> {
        let path = file_key(&file.filename)?;
        if self.call("kv.exists", self.kv.exists(&path)).await? {
            tracing::warn!(path = %path, "file already exists");
            return Ok(PutOutcome::AlreadyExists);
        }

        let record = File {
            filename: path.clone(),
            key: needle.key,
            chunks: Vec::new(),
            ..file.clone()
        };
        self.store(&path, &record).await?;

        let needle_written = match self.put_needle(needle).await {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "needle write failed, removing file record");
                self.undo_key(&path).await;
                return Err(e);
            }
        };

        let mut entries = Vec::new();
        if let Err(e) = self.register(bucket, &path, record.filesize, &mut entries).await {
            tracing::warn!(path = %path, error = %e, "directory registration failed, rolling back");
            self.undo_entries(entries).await;
            if needle_written {
                self.undo_key(&needle.key.to_string()).await;
            }
            self.undo_key(&path).await;
            return Err(e);
        }

        Ok(if needle_written {
            PutOutcome::Created
        } else {
            PutOutcome::AlreadyExists
        })
    }

    /// Persist a chunked file record. Its chunks are regular files written
    /// separately; the record itself owns no needle.
    #[tracing::instrument(level = "debug", skip(self, file), fields(path = %file.filename))]
    pub async fn put_info(&self, bucket: &str, file: &File) -> Result<PutOutcome> {
        file.validate_chunks()?;
        let path = file_key(&file.filename)?;
        if self.call("kv.exists", self.kv.exists(&path)).await? {
            tracing::warn!(path = %path, "file already exists");
            return Ok(PutOutcome::AlreadyExists);
        }
        let record = File {
            filename: path.clone(),
            key: NeedleKey(0),
            ..file.clone()
        };
        self.store(&path, &record).await?;
        let mut entries = Vec::new();
        if let Err(e) = self.register(bucket, &path, record.filesize, &mut entries).await {
            tracing::warn!(path = %path, error = %e, "directory registration failed, rolling back");
            self.undo_entries(entries).await;
            self.undo_key(&path).await;
            return Err(e);
        }
        Ok(PutOutcome::Created)
    }

    pub async fn get_file(&self, _bucket: &str, path: &str) -> Result<File> {
        let path = file_key(path)?;
        match self.load::<File>(&path).await? {
            Some(file) => Ok(file),
            None => make_error_msg(MetaCode::NOT_FOUND, format!("file {} not found", path)),
        }
    }

    /// Load a file and, unless it is chunked, its needle. A file whose
    /// needle is gone is removed and reported as not found.
    pub async fn get(&self, bucket: &str, path: &str) -> Result<(File, Option<Needle>)> {
        let file = self.get_file(bucket, path).await?;
        if file.is_chunked() {
            return Ok((file, None));
        }
        match self.get_needle(file.key).await? {
            Some(needle) => Ok((file, Some(needle))),
            None => {
                tracing::warn!(bucket, path = %file.filename, key = %file.key, "file without needle, removing file record");
                self.undo_key(&file.filename).await;
                if let Some((parent, name)) = path_utils::split_entry(&file.filename) {
                    self.undo_entry(parent, name).await;
                }
                make_error_msg(MetaCode::NOT_FOUND, format!("needle {} not found", file.key))
            }
        }
    }

    /// Remove a file record, its parent entry and, for unchunked files, its
    /// needle. Chunk files are left to the caller. A dangling parent entry
    /// is cleared even when the record is already gone.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete(&self, bucket: &str, path: &str) -> Result<File> {
        let path = file_key(path)?;
        let (parent, name) = match path_utils::split_entry(&path) {
            Some(split) => split,
            None => return make_error_msg(StatusCode::INVALID_ARG, "cannot delete root"),
        };
        let Some(file) = self.load::<File>(&path).await? else {
            self.call("kv.hdel", self.kv.hdel(parent, name)).await?;
            return make_error_msg(MetaCode::NOT_FOUND, format!("file {} not found", path));
        };

        self.remove(&path).await?;
        self.call("kv.hdel", self.kv.hdel(parent, name)).await?;
        if !file.is_chunked() {
            self.remove(&file.key.to_string()).await?;
        }
        Ok(file)
    }

    // ---- directories ----

    /// Register `path` in its ancestors' hashes, leaf first. Stops at the
    /// first level whose entry already exists. Returns the number of entries
    /// written.
    pub async fn put_dir(&self, bucket: &str, path: &str, size: u64) -> Result<usize> {
        let mut entries = Vec::new();
        self.register(bucket, path, size, &mut entries).await?;
        Ok(entries.len())
    }

    /// Body of [`MetaStore::put_dir`]. Every `(dir, name)` entry written is
    /// pushed to `written` before the next level is tried, so a caller can
    /// undo a partial chain.
    async fn register(
        &self,
        bucket: &str,
        path: &str,
        size: u64,
        written: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let path = match path_utils::normalize(path) {
            Some(p) => p,
            None => return make_error_msg(StatusCode::INVALID_ARG, format!("bad path {:?}", path)),
        };
        let mut current = path.as_str();
        while let Some((parent, name)) = path_utils::split_entry(current) {
            if self.call("kv.hexists", self.kv.hexists(parent, name)).await? {
                break;
            }
            self.call("kv.hset", self.kv.hset(parent, name, entry_value(name, size)))
                .await?;
            written.push((parent.to_string(), name.to_string()));
            current = parent;
        }
        tracing::trace!(bucket, path = %path, written = written.len(), "registered directory chain");
        Ok(())
    }

    pub async fn get_dir_info(&self, _bucket: &str, dir: &str) -> Result<DirInfo> {
        let dir = dir_key(dir)?;
        let entries = self.call("kv.hgetall", self.kv.hget_all(&dir)).await?;
        if entries.is_empty() {
            return make_error_msg(MetaCode::DIR_NOT_FOUND, format!("directory {} not found", dir));
        }
        Ok(DirInfo::from_entries(&dir, entries.into_iter().map(|(name, _)| name)))
    }

    /// Drop a directory's entry from its parent if the directory has no
    /// children left. Returns whether the entry was removed.
    pub async fn remove_dir_if_empty(&self, _bucket: &str, dir: &str) -> Result<bool> {
        let dir = dir_key(dir)?;
        let Some((parent, name)) = path_utils::split_entry(&dir) else {
            return Ok(false);
        };
        if !self.call("kv.hgetall", self.kv.hget_all(&dir)).await?.is_empty() {
            return Ok(false);
        }
        self.call("kv.hdel", self.kv.hdel(parent, name)).await
    }
}
