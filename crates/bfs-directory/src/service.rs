//! Directory orchestration: resolves client operations into needle
//! coordinates and store endpoints, combining the dispatcher's topology
//! with the metadata store.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bfs_kv::KvStore;
use bfs_types::status_code::{DirectoryCode, ErrorKind, MetaCode, StatusCode};
use bfs_types::{make_error_msg, Cookie, Result, Status};
use bfs_utils::{path_utils, with_deadline};

use crate::config::DirectoryConfig;
use crate::dispatcher::Dispatcher;
use crate::idgen::KeyGenerator;
use crate::meta::{ByteRange, DirInfo, File, MetaStore, Needle, PutOutcome};

/// Where to read a file from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadTarget {
    pub needle: Needle,
    /// The file actually holding the bytes; a chunk for chunked files.
    pub file: File,
    /// Requested bytes relative to `file`.
    pub range: ByteRange,
    pub stores: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteTarget {
    pub needle: Needle,
    pub stores: Vec<String>,
    pub outcome: PutOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteTarget {
    pub needle: Needle,
    pub file: File,
    pub stores: Vec<String>,
}

/// Per-file result of a batch delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteItem {
    pub path: String,
    pub outcome: Result<DeleteTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeadInfo {
    File { filename: String, filesize: u64 },
    Dir(DirInfo),
}

pub struct Directory<K, G> {
    needle_max_size: u64,
    max_range_size: u64,
    op_timeout: Duration,
    dispatcher: Arc<Dispatcher>,
    meta: MetaStore<K>,
    keygen: G,
}

fn normalize(path: &str) -> Result<String> {
    path_utils::normalize(path)
        .ok_or_else(|| Status::with_message(StatusCode::INVALID_ARG, format!("bad path {:?}", path)))
}

/// Anti-enumeration token: the clock's low 16 bits, plus one so it is
/// never zero.
fn new_cookie() -> Cookie {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    Cookie(u32::from(nanos as u16) + 1)
}

impl<K: KvStore, G: KeyGenerator> Directory<K, G> {
    pub fn new(config: &DirectoryConfig, dispatcher: Arc<Dispatcher>, kv: K, keygen: G) -> Self {
        Self {
            needle_max_size: config.needle_max_size,
            max_range_size: config.max_range_size,
            op_timeout: config.op_timeout,
            dispatcher,
            meta: MetaStore::new(kv, config.op_timeout),
            keygen,
        }
    }

    pub fn meta(&self) -> &MetaStore<K> {
        &self.meta
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn check_range_size(&self, range: &ByteRange) -> Result<()> {
        range.validate()?;
        match range.requested_len() {
            Some(len) if len > self.max_range_size => make_error_msg(
                MetaCode::FILE_TOO_LARGE,
                format!("range of {} bytes exceeds {}", len, self.max_range_size),
            ),
            _ => Ok(()),
        }
    }

    /// Resolve a read. A chunked file resolves to the single chunk holding
    /// the whole range; ranges crossing a chunk boundary are refused.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_stores(&self, bucket: &str, path: &str, range: ByteRange) -> Result<ReadTarget> {
        self.check_range_size(&range)?;
        let path = normalize(path)?;
        let (file, needle) = self.meta.get(bucket, &path).await?;
        let range = range.clamp(file.filesize)?;

        let (file, needle, range) = if file.is_chunked() {
            let end = range.end.unwrap_or(range.start);
            let start_block = range.start / self.needle_max_size;
            let end_block = end / self.needle_max_size;
            if start_block != end_block {
                return make_error_msg(
                    MetaCode::FILE_TOO_LARGE,
                    format!("range {}-{} spans two chunks", range.start, end),
                );
            }
            let chunk = match file.chunks.get(start_block as usize) {
                Some(c) if c.offset <= range.start && end < c.offset + c.size => c,
                _ => {
                    return make_error_msg(
                        MetaCode::INVALID_FILE_LAYOUT,
                        format!("{} has no chunk covering {}-{}", path, range.start, end),
                    )
                }
            };
            let (chunk_file, chunk_needle) = self.meta.get(bucket, &chunk.filename).await?;
            let Some(chunk_needle) = chunk_needle else {
                return make_error_msg(
                    MetaCode::INVALID_FILE_LAYOUT,
                    format!("chunk {} is itself chunked", chunk.filename),
                );
            };
            let local = range.relative_to(chunk.offset).clamp(chunk_file.filesize)?;
            (chunk_file, chunk_needle, local)
        } else {
            match needle {
                Some(n) => (file, n, range),
                None => return make_error_msg(StatusCode::FOUND_BUG, "unchunked file without needle"),
            }
        };
        self.check_range_size(&range)?;

        let topology = self.dispatcher.snapshot();
        let stores = topology.readable_endpoints(needle.vid)?;
        Ok(ReadTarget {
            needle,
            file,
            range,
            stores,
        })
    }

    /// Allocate a volume and a key for a new file and record it.
    #[tracing::instrument(level = "debug", skip(self, file), fields(path = %file.filename))]
    pub async fn upload_stores(&self, bucket: &str, mut file: File) -> Result<WriteTarget> {
        file.filename = normalize(&file.filename)?;
        if path_utils::is_dir_path(&file.filename) {
            return make_error_msg(StatusCode::INVALID_ARG, "cannot upload to a directory path");
        }
        if file.is_chunked() {
            return make_error_msg(StatusCode::INVALID_ARG, "chunked files are recorded with put_info");
        }
        if file.filesize > self.needle_max_size {
            return make_error_msg(
                MetaCode::FILE_TOO_LARGE,
                format!("{} bytes exceeds needle size {}", file.filesize, self.needle_max_size),
            );
        }

        let (vid, topology) = self.dispatcher.select_write_volume()?;
        let stores = topology.writable_endpoints(vid)?;

        let key = match with_deadline(self.op_timeout, "allocate_key", self.keygen.allocate_key()).await {
            Ok(key) => key,
            Err(e) if e.kind() == ErrorKind::Timeout => return Err(e),
            Err(e) => {
                tracing::error!(error = %e, "key generator failed");
                return make_error_msg(DirectoryCode::ID_NOT_AVAILABLE, e.describe());
            }
        };

        let now = chrono::Utc::now().timestamp_millis();
        if file.mtime == 0 {
            file.mtime = now;
        }
        file.key = key;
        let needle = Needle {
            key,
            cookie: new_cookie(),
            vid,
            mtime: now,
        };
        let outcome = self.meta.put(bucket, &file, &needle).await?;
        if outcome == PutOutcome::Created {
            return Ok(WriteTarget {
                needle,
                stores,
                outcome,
            });
        }

        // The minted key was not recorded; reply with what was.
        tracing::warn!(bucket, path = %file.filename, unused_key = %key, "upload target already recorded");
        let (_, recorded) = self.meta.get(bucket, &file.filename).await?;
        let Some(recorded) = recorded else {
            return make_error_msg(
                MetaCode::EXISTS,
                format!("{} is already recorded as a chunked file", file.filename),
            );
        };
        let stores = self.dispatcher.snapshot().writable_endpoints(recorded.vid)?;
        Ok(WriteTarget {
            needle: recorded,
            stores,
            outcome,
        })
    }

    /// Record a chunked file whose chunks were uploaded as regular files.
    /// Every chunk but the last must be exactly one needle long.
    pub async fn put_info(&self, bucket: &str, mut file: File) -> Result<PutOutcome> {
        file.filename = normalize(&file.filename)?;
        file.validate_chunks()?;
        let last = file.chunks.len() - 1;
        for (i, chunk) in file.chunks.iter_mut().enumerate() {
            let full = chunk.size == self.needle_max_size;
            if chunk.size > self.needle_max_size || (i < last && !full) {
                return make_error_msg(
                    MetaCode::INVALID_FILE_LAYOUT,
                    format!("chunk {} has size {}, chunk size is {}", i, chunk.size, self.needle_max_size),
                );
            }
            chunk.filename = normalize(&chunk.filename)?;
        }
        self.meta.put_info(bucket, &file).await
    }

    /// Resolve a delete and drop the metadata. Every host of the needle's
    /// volume must be writable.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn del_stores(&self, bucket: &str, path: &str) -> Result<DeleteTarget> {
        let path = normalize(path)?;
        let (file, needle) = self.meta.get(bucket, &path).await?;
        let Some(needle) = needle else {
            return make_error_msg(StatusCode::INVALID_ARG, format!("{} is chunked", path));
        };
        let topology = self.dispatcher.snapshot();
        let stores = topology.writable_endpoints(needle.vid)?;
        self.meta.delete(bucket, &path).await?;
        Ok(DeleteTarget {
            needle,
            file,
            stores,
        })
    }

    /// Delete one file. A chunked file yields one item per chunk; its own
    /// record goes only once every chunk is deleted or already gone.
    pub async fn del_file(&self, bucket: &str, path: &str) -> Result<Vec<DeleteItem>> {
        let path = normalize(path)?;
        let file = match self.meta.get_file(bucket, &path).await {
            Ok(file) => file,
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    // clears a dangling parent entry
                    match self.meta.delete(bucket, &path).await {
                        Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                            tracing::warn!(bucket, path = %path, error = %cleanup, "could not clear dangling entry");
                        }
                        _ => {}
                    }
                }
                return Err(e);
            }
        };

        if !file.is_chunked() {
            let outcome = self.del_stores(bucket, &path).await;
            return Ok(vec![DeleteItem { path, outcome }]);
        }

        let mut items = Vec::with_capacity(file.chunks.len());
        for chunk in &file.chunks {
            let outcome = self.del_stores(bucket, &chunk.filename).await;
            items.push(DeleteItem {
                path: chunk.filename.clone(),
                outcome,
            });
        }
        let settled = items.iter().all(|item| match &item.outcome {
            Ok(_) => true,
            Err(e) => e.kind() == ErrorKind::NotFound,
        });
        if settled {
            self.meta.delete(bucket, &path).await?;
        } else {
            tracing::warn!(bucket, path = %path, "keeping chunked file record, some chunks were not deleted");
        }
        Ok(items)
    }

    /// Delete every file below `dir`, then drop the directories that ended
    /// up empty, deepest first. Failures are reported per file; an
    /// unreadable subdirectory is logged and skipped.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn del_directory(&self, bucket: &str, dir: &str) -> Result<Vec<DeleteItem>> {
        let mut root = normalize(dir)?;
        if !path_utils::is_dir_path(&root) {
            root.push(path_utils::SEPARATOR);
        }

        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut walked = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            let info = match self.meta.get_dir_info(bucket, &dir).await {
                Ok(info) => info,
                Err(e) if dir == root => return Err(e),
                Err(e) => {
                    tracing::warn!(bucket, dir = %dir, error = %e, "skipping subdirectory");
                    continue;
                }
            };
            for sub in &info.sub_dirs {
                stack.push(path_utils::join_entry(&dir, sub));
            }
            for name in &info.files {
                let path = path_utils::join_entry(&dir, name);
                match self.del_file(bucket, &path).await {
                    Ok(mut deleted) => items.append(&mut deleted),
                    Err(e) => {
                        tracing::warn!(bucket, path = %path, error = %e, "file delete failed");
                        items.push(DeleteItem {
                            path,
                            outcome: Err(e),
                        });
                    }
                }
            }
            walked.push(dir);
        }

        walked.sort_by_key(|d| Reverse(d.matches(path_utils::SEPARATOR).count()));
        for dir in &walked {
            if let Err(e) = self.meta.remove_dir_if_empty(bucket, dir).await {
                tracing::warn!(bucket, dir = %dir, error = %e, "could not prune directory");
            }
        }
        Ok(items)
    }

    /// Size of a file, or the listing of a path ending in `/`.
    pub async fn head(&self, bucket: &str, path: &str) -> Result<HeadInfo> {
        let path = normalize(path)?;
        if path_utils::is_dir_path(&path) {
            return self.meta.get_dir_info(bucket, &path).await.map(HeadInfo::Dir);
        }
        let file = self.meta.get_file(bucket, &path).await?;
        Ok(HeadInfo::File {
            filename: file.filename,
            filesize: file.filesize,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.dispatcher.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ChunkInfo;
    use crate::testutil::{Harness, CHUNK};
    use crate::topology::store_status::{HEALTH, READ};
    use bfs_kv_backends::KvOp;
    use bfs_types::{make_error, NeedleKey, VolumeId};

    #[tokio::test]
    async fn test_upload_then_get() {
        let h = Harness::healthy();
        let w = h.dir.upload_stores("b", Harness::file("/pics/cat.jpg", 50)).await.unwrap();
        assert_eq!(w.outcome, PutOutcome::Created);
        assert_eq!(w.stores, vec!["s1:api", "s2:api"]);
        assert!(w.needle.cookie.0 >= 1 && w.needle.cookie.0 <= 65536);

        let r = h.dir.get_stores("b", "pics/cat.jpg", ByteRange::WHOLE).await.unwrap();
        assert_eq!(r.needle, w.needle);
        assert_eq!(r.file.filesize, 50);
        assert_eq!(r.range, ByteRange::new(0, 49));
        assert_eq!(r.stores, vec!["s1:api", "s2:api"]);
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let h = Harness::healthy();
        let err = h.dir.upload_stores("b", Harness::file("/big", CHUNK + 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);
    }

    #[tokio::test]
    async fn test_upload_without_writable_volume() {
        let h = Harness::with_status(READ);
        let err = h.dir.upload_stores("b", Harness::file("/f", 1)).await.unwrap_err();
        assert_eq!(err.code(), DirectoryCode::STORE_NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_id_unavailable() {
        let h = Harness::healthy();
        h.keygen.on_allocate(|| make_error(StatusCode::IO_ERROR));
        let err = h.dir.upload_stores("b", Harness::file("/f", 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IdUnavailable);
        assert!(h.kv.is_empty());
    }

    #[tokio::test]
    async fn test_upload_existing_is_warning() {
        let h = Harness::healthy();
        let first = h.dir.upload_stores("b", Harness::file("/e/f", 1)).await.unwrap();
        let again = h.dir.upload_stores("b", Harness::file("/e/f", 1)).await.unwrap();
        assert_eq!(again.outcome, PutOutcome::AlreadyExists);
        assert_eq!(again.needle, first.needle);
        // the second key was minted but never recorded
        assert_eq!(first.needle.key, NeedleKey(1));
        assert!(h.dir.meta().get_needle(NeedleKey(2)).await.unwrap().is_none());
        assert_eq!(again.stores, first.stores);

        let read = h.dir.get_stores("b", "/e/f", ByteRange::WHOLE).await.unwrap();
        assert_eq!(read.needle.key, again.needle.key);
    }

    #[tokio::test]
    async fn test_upload_over_chunked_record_is_exists() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/c/big.0", 1)).await.unwrap();
        let mut big = Harness::file("/c/big", 1);
        big.chunks = vec![ChunkInfo { filename: "/c/big.0".into(), offset: 0, size: 1 }];
        h.dir.put_info("b", big).await.unwrap();

        let err = h.dir.upload_stores("b", Harness::file("/c/big", 1)).await.unwrap_err();
        assert_eq!(err.code(), MetaCode::EXISTS);
    }

    #[tokio::test]
    async fn test_missing_file_cleanup_failure_keeps_not_found() {
        let h = Harness::healthy();
        h.kv.fail_on(KvOp::HDel, "/d/");
        let err = h.dir.del_file("b", "/d/missing").await.unwrap_err();
        assert_eq!(err.code(), MetaCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/f", 10)).await.unwrap();
        let err = h.dir.get_stores("b", "/f", ByteRange::new(10, 5)).await.unwrap_err();
        assert_eq!(err.code(), StatusCode::INVALID_ARG);
    }

    #[tokio::test]
    async fn test_get_range_checks() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/f", 10)).await.unwrap();

        let err = h
            .dir
            .get_stores("b", "/f", ByteRange::new(0, CHUNK))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);

        let r = h.dir.get_stores("b", "/f", ByteRange::new(3, 100)).await.unwrap();
        assert_eq!(r.range, ByteRange::new(3, 9));

        let err = h.dir.get_stores("b", "/f", ByteRange::new(20, 30)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);

        let err = h.dir.get_stores("b", "/nope", ByteRange::WHOLE).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    async fn chunked_file(h: &Harness, path: &str, sizes: &[u64]) -> Vec<NeedleKey> {
        let mut chunks = Vec::new();
        let mut keys = Vec::new();
        let mut offset = 0;
        for (i, size) in sizes.iter().enumerate() {
            let name = format!("{}.{}", path, i);
            let w = h.dir.upload_stores("b", Harness::file(&name, *size)).await.unwrap();
            keys.push(w.needle.key);
            chunks.push(ChunkInfo {
                filename: name,
                offset,
                size: *size,
            });
            offset += size;
        }
        let mut file = Harness::file(path, offset);
        file.chunks = chunks;
        assert_eq!(h.dir.put_info("b", file).await.unwrap(), PutOutcome::Created);
        keys
    }

    #[tokio::test]
    async fn test_chunked_range_resolution() {
        let h = Harness::healthy();
        let keys = chunked_file(&h, "/movie", &[CHUNK, CHUNK, 40]).await;

        let r = h
            .dir
            .get_stores("b", "/movie", ByteRange::new(CHUNK, CHUNK + 10))
            .await
            .unwrap();
        assert_eq!(r.needle.key, keys[1]);
        assert_eq!(r.file.filename, "/movie.1");
        assert_eq!(r.range, ByteRange::new(0, 10));

        let err = h
            .dir
            .get_stores("b", "/movie", ByteRange::new(CHUNK - 5, CHUNK + 5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);

        // open range in the last chunk clamps to its size
        let r = h
            .dir
            .get_stores("b", "/movie", ByteRange { start: 2 * CHUNK + 5, end: None })
            .await
            .unwrap();
        assert_eq!(r.needle.key, keys[2]);
        assert_eq!(r.range, ByteRange::new(5, 39));
    }

    #[tokio::test]
    async fn test_put_info_rejects_short_middle_chunk() {
        let h = Harness::healthy();
        let mut file = Harness::file("/odd", CHUNK + 10);
        file.chunks = vec![
            ChunkInfo { filename: "/odd.0".into(), offset: 0, size: 10 },
            ChunkInfo { filename: "/odd.1".into(), offset: 10, size: CHUNK },
        ];
        let err = h.dir.put_info("b", file).await.unwrap_err();
        assert_eq!(err.code(), MetaCode::INVALID_FILE_LAYOUT);
    }

    #[tokio::test]
    async fn test_read_filters_unreadable_stores() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/f", 1)).await.unwrap();
        h.publish_status(&[("s1", HEALTH), ("s2", 0)]);
        let r = h.dir.get_stores("b", "/f", ByteRange::WHOLE).await.unwrap();
        assert_eq!(r.stores, vec!["s1:api"]);

        h.publish_status(&[("s1", 0), ("s2", 0)]);
        let err = h.dir.get_stores("b", "/f", ByteRange::WHOLE).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    #[tokio::test]
    async fn test_missing_volume_is_inconsistent() {
        let h = Harness::healthy();
        let w = h.dir.upload_stores("b", Harness::file("/f", 1)).await.unwrap();
        h.publish_without_volume(w.needle.vid);

        let err = h.dir.get_stores("b", "/f", ByteRange::WHOLE).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TopologyInconsistent);
        let err = h.dir.del_stores("b", "/f").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TopologyInconsistent);
        // metadata untouched
        assert!(h.dir.meta().get_file("b", "/f").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_requires_writable_stores() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/f", 1)).await.unwrap();
        h.publish_status(&[("s1", HEALTH), ("s2", READ)]);
        let err = h.dir.del_stores("b", "/f").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(h.dir.meta().get_file("b", "/f").await.is_ok());

        h.publish_status(&[("s1", HEALTH), ("s2", HEALTH)]);
        let d = h.dir.del_stores("b", "/f").await.unwrap();
        assert_eq!(d.stores.len(), 2);
        let err = h.dir.del_stores("b", "/f").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_recursive_delete() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/top/sub/inner.txt", 3)).await.unwrap();
        h.dir.upload_stores("b", Harness::file("/top/direct.txt", 4)).await.unwrap();
        h.dir.upload_stores("b", Harness::file("/other.txt", 4)).await.unwrap();

        let items = h.dir.del_directory("b", "/top/").await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.outcome.is_ok()));
        let mut paths: Vec<_> = items.iter().map(|i| i.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["/top/direct.txt", "/top/sub/inner.txt"]);

        // emptied directories are pruned, siblings survive
        let root = h.dir.meta().get_dir_info("b", "/").await.unwrap();
        assert_eq!(root.files, vec!["other.txt"]);
        assert!(root.sub_dirs.is_empty());

        let err = h.dir.del_directory("b", "/top/").await.unwrap_err();
        assert_eq!(err.code(), MetaCode::DIR_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_recursive_delete_reports_per_item() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/d/ok.txt", 1)).await.unwrap();
        let w = h.dir.upload_stores("b", Harness::file("/d/broken.txt", 1)).await.unwrap();
        // needle gone behind the directory's back
        h.kv.del(&w.needle.key.to_string()).await.unwrap();

        let items = h.dir.del_directory("b", "/d").await.unwrap();
        assert_eq!(items.len(), 2);
        let broken = items.iter().find(|i| i.path == "/d/broken.txt").unwrap();
        assert_eq!(broken.outcome.as_ref().unwrap_err().kind(), ErrorKind::NotFound);
        let ok = items.iter().find(|i| i.path == "/d/ok.txt").unwrap();
        assert!(ok.outcome.is_ok());
        assert!(h.dir.meta().get_dir_info("b", "/d/").await.is_err());
    }

    #[tokio::test]
    async fn test_recursive_delete_keeps_dirs_with_survivors() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/k/keep.txt", 1)).await.unwrap();
        h.kv.fail_on(KvOp::Del, "/k/keep.txt");

        let items = h.dir.del_directory("b", "/k/").await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].outcome.is_err());
        let info = h.dir.meta().get_dir_info("b", "/k/").await.unwrap();
        assert_eq!(info.files, vec!["keep.txt"]);
    }

    #[tokio::test]
    async fn test_delete_chunked_file() {
        let h = Harness::healthy();
        chunked_file(&h, "/iso", &[CHUNK, 7]).await;
        let items = h.dir.del_file("b", "/iso").await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.outcome.is_ok()));
        assert!(h.kv.is_empty());
    }

    #[tokio::test]
    async fn test_head() {
        let h = Harness::healthy();
        h.dir.upload_stores("b", Harness::file("/h/x.bin", 12)).await.unwrap();
        assert_eq!(
            h.dir.head("b", "/h/x.bin").await.unwrap(),
            HeadInfo::File { filename: "/h/x.bin".into(), filesize: 12 }
        );
        match h.dir.head("b", "/h/").await.unwrap() {
            HeadInfo::Dir(info) => assert_eq!(info.files, vec!["x.bin"]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(h.dir.head("b", "/h/y").await.unwrap_err().code(), MetaCode::NOT_FOUND);
        assert_eq!(h.dir.head("b", "/z/").await.unwrap_err().code(), MetaCode::DIR_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_round_robin_uses_all_volumes() {
        let h = Harness::healthy();
        let mut vids = HashSet::new();
        for i in 0..4 {
            let w = h
                .dir
                .upload_stores("b", Harness::file(&format!("/rr/{}", i), 1))
                .await
                .unwrap();
            vids.insert(w.needle.vid);
        }
        assert_eq!(vids, [VolumeId(1), VolumeId(2)].into());
    }
}
