//! Request/response contracts for the HTTP front end.
//!
//! Every call returns exactly one response whose `ret` carries the status
//! code: 0 on success, `Meta::Exists` when an upload found its record
//! already present, the failing code otherwise. Nothing here returns an
//! error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bfs_kv::KvStore;
use bfs_types::status_code::{self, status_code_t, DirectoryCode, ErrorKind, MetaCode, StatusCode};
use bfs_types::{Cookie, NeedleKey, Status, VolumeId};

use crate::idgen::KeyGenerator;
use crate::meta::{ByteRange, DirInfo, File, PutOutcome};
use crate::service::{DeleteItem, Directory, HeadInfo};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub ret: status_code_t,
    pub key: NeedleKey,
    pub cookie: Cookie,
    pub vid: VolumeId,
    pub stores: Vec<String>,
    pub update_time: i64,
    pub sha1: String,
    pub mine: String,
    /// Inclusive byte range to fetch from the needle.
    pub range_start: u64,
    pub range_end: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ret: status_code_t,
    pub key: NeedleKey,
    pub cookie: Cookie,
    pub vid: VolumeId,
    pub stores: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetResponse {
    pub ret: status_code_t,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteItemResponse {
    pub ret: status_code_t,
    pub filename: String,
    pub key: NeedleKey,
    pub cookie: Cookie,
    pub vid: VolumeId,
    pub stores: Vec<String>,
    pub update_time: i64,
    pub sha1: String,
    pub mine: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ret: status_code_t,
    pub items: Vec<DeleteItemResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSizeInfo {
    pub filename: String,
    pub filesize: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadResponse {
    pub ret: status_code_t,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSizeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<DirInfo>,
}

/// Log a failed call at a level matching its kind and return its code.
fn ret_of(op: &str, bucket: &str, path: &str, status: &Status) -> status_code_t {
    match status.kind() {
        ErrorKind::NotFound
        | ErrorKind::AlreadyExists
        | ErrorKind::InvalidParam
        | ErrorKind::TooLarge => {
            tracing::debug!(op, bucket, path, error = %status, "request rejected");
        }
        ErrorKind::TopologyInconsistent | ErrorKind::Internal => {
            tracing::error!(op, bucket, path, error = %status, "request failed");
        }
        _ => tracing::warn!(op, bucket, path, error = %status, "request failed"),
    }
    status.code()
}

impl From<DeleteItem> for DeleteItemResponse {
    fn from(item: DeleteItem) -> Self {
        match item.outcome {
            Ok(target) => Self {
                ret: StatusCode::OK,
                filename: item.path,
                key: target.needle.key,
                cookie: target.needle.cookie,
                vid: target.needle.vid,
                stores: target.stores,
                update_time: target.file.mtime,
                sha1: target.file.sha1,
                mine: target.file.mine,
            },
            Err(status) => Self {
                ret: status.code(),
                filename: item.path,
                ..Default::default()
            },
        }
    }
}

pub struct DirectoryApi<K, G> {
    dir: Arc<Directory<K, G>>,
}

impl<K: KvStore, G: KeyGenerator> DirectoryApi<K, G> {
    pub fn new(dir: Arc<Directory<K, G>>) -> Self {
        Self { dir }
    }

    /// `range` is the raw `Range` header value, empty for the whole file.
    pub async fn get(&self, bucket: &str, filename: &str, range: &str) -> GetResponse {
        let range = match ByteRange::parse(range) {
            Ok(r) => r,
            Err(e) => {
                return GetResponse {
                    ret: ret_of("get", bucket, filename, &e),
                    ..Default::default()
                }
            }
        };
        match self.dir.get_stores(bucket, filename, range).await {
            Ok(t) => GetResponse {
                ret: StatusCode::OK,
                key: t.needle.key,
                cookie: t.needle.cookie,
                vid: t.needle.vid,
                stores: t.stores,
                update_time: t.file.mtime,
                sha1: t.file.sha1,
                mine: t.file.mine,
                range_start: t.range.start,
                range_end: t.range.end,
            },
            Err(e) => GetResponse {
                ret: ret_of("get", bucket, filename, &e),
                ..Default::default()
            },
        }
    }

    pub async fn upload(&self, bucket: &str, file: File) -> UploadResponse {
        let path = file.filename.clone();
        match self.dir.upload_stores(bucket, file).await {
            Ok(t) => UploadResponse {
                ret: match t.outcome {
                    PutOutcome::Created => StatusCode::OK,
                    PutOutcome::AlreadyExists => MetaCode::EXISTS,
                },
                key: t.needle.key,
                cookie: t.needle.cookie,
                vid: t.needle.vid,
                stores: t.stores,
            },
            Err(e) => UploadResponse {
                ret: ret_of("upload", bucket, &path, &e),
                ..Default::default()
            },
        }
    }

    pub async fn put_info(&self, bucket: &str, file: File) -> RetResponse {
        let path = file.filename.clone();
        let ret = match self.dir.put_info(bucket, file).await {
            Ok(PutOutcome::Created) => StatusCode::OK,
            Ok(PutOutcome::AlreadyExists) => MetaCode::EXISTS,
            Err(e) => ret_of("put_info", bucket, &path, &e),
        };
        RetResponse { ret }
    }

    /// Delete a file, or everything below a path ending in `/`. For a
    /// directory `ret` is OK and each item carries its own code; for a file
    /// `ret` is the first failing item's code.
    pub async fn delete(&self, bucket: &str, path: &str) -> DeleteResponse {
        let is_dir = path.ends_with('/');
        let result = if is_dir {
            self.dir.del_directory(bucket, path).await
        } else {
            self.dir.del_file(bucket, path).await
        };
        match result {
            Ok(items) => {
                let items: Vec<DeleteItemResponse> = items.into_iter().map(Into::into).collect();
                let ret = if is_dir {
                    StatusCode::OK
                } else {
                    items
                        .iter()
                        .map(|i| i.ret)
                        .find(|r| *r != StatusCode::OK)
                        .unwrap_or(StatusCode::OK)
                };
                DeleteResponse { ret, items }
            }
            Err(e) => DeleteResponse {
                ret: ret_of("delete", bucket, path, &e),
                items: Vec::new(),
            },
        }
    }

    pub async fn head(&self, bucket: &str, path: &str) -> HeadResponse {
        match self.dir.head(bucket, path).await {
            Ok(HeadInfo::File { filename, filesize }) => HeadResponse {
                ret: StatusCode::OK,
                file: Some(FileSizeInfo { filename, filesize }),
                dir: None,
            },
            Ok(HeadInfo::Dir(info)) => HeadResponse {
                ret: StatusCode::OK,
                file: None,
                dir: Some(info),
            },
            Err(e) => HeadResponse {
                ret: ret_of("head", bucket, path, &e),
                ..Default::default()
            },
        }
    }

    /// OK once a topology snapshot has been published.
    pub fn ping(&self) -> RetResponse {
        let ret = if self.dir.is_ready() {
            StatusCode::OK
        } else {
            DirectoryCode::STORE_NOT_AVAILABLE
        };
        RetResponse { ret }
    }
}

/// Name of a response code, for access logs.
pub fn ret_name(ret: status_code_t) -> &'static str {
    status_code::to_string(ret)
}
