use serde::{Deserialize, Serialize};

use bfs_types::status_code::MetaCode;
use bfs_types::{make_error_msg, Cookie, NeedleKey, Result, VolumeId};
use bfs_utils::path_utils;

/// One slice of a chunked file, itself stored as a regular file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub filename: String,
    /// Offset within the logical file.
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub filename: String,
    #[serde(default)]
    pub key: NeedleKey,
    #[serde(default)]
    pub sha1: String,
    /// Content type.
    #[serde(default)]
    pub mine: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default, rename = "update_time")]
    pub mtime: i64,
    #[serde(default, alias = "Chunks", skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<ChunkInfo>,
}

impl File {
    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }

    /// Check that the chunk list partitions `filesize` contiguously from 0
    /// and that every chunk names a file path.
    pub fn validate_chunks(&self) -> Result<()> {
        if self.chunks.is_empty() {
            return make_error_msg(MetaCode::INVALID_FILE_LAYOUT, "chunk list is empty");
        }
        let mut next = 0u64;
        for (i, chunk) in self.chunks.iter().enumerate() {
            if chunk.offset != next {
                return make_error_msg(
                    MetaCode::INVALID_FILE_LAYOUT,
                    format!("chunk {} starts at {}, expected {}", i, chunk.offset, next),
                );
            }
            if chunk.size == 0 {
                return make_error_msg(
                    MetaCode::INVALID_FILE_LAYOUT,
                    format!("chunk {} is empty", i),
                );
            }
            match path_utils::normalize(&chunk.filename) {
                Some(p) if !path_utils::is_dir_path(&p) => {}
                _ => {
                    return make_error_msg(
                        MetaCode::INVALID_FILE_LAYOUT,
                        format!("chunk {} has bad filename {:?}", i, chunk.filename),
                    )
                }
            }
            next = chunk.offset + chunk.size;
        }
        if next != self.filesize {
            return make_error_msg(
                MetaCode::INVALID_FILE_LAYOUT,
                format!("chunks cover {} bytes, file has {}", next, self.filesize),
            );
        }
        Ok(())
    }
}

/// Physical locator of one stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Needle {
    pub key: NeedleKey,
    pub cookie: Cookie,
    pub vid: VolumeId,
    #[serde(default)]
    pub mtime: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfs_types::status_code::ErrorKind;

    fn chunked(sizes: &[u64], filesize: u64) -> File {
        let mut offset = 0;
        let chunks = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| {
                let c = ChunkInfo {
                    filename: format!("/big/{:04}", i),
                    offset,
                    size: *size,
                };
                offset += size;
                c
            })
            .collect();
        File {
            filename: "/big".into(),
            filesize,
            chunks,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_chunks() {
        assert!(chunked(&[10, 10, 3], 23).validate_chunks().is_ok());

        let err = chunked(&[10, 10], 23).validate_chunks().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);

        let err = chunked(&[], 0).validate_chunks().unwrap_err();
        assert_eq!(err.code(), MetaCode::INVALID_FILE_LAYOUT);

        let mut gap = chunked(&[10, 10], 20);
        gap.chunks[1].offset = 11;
        assert!(gap.validate_chunks().is_err());

        let mut dir_name = chunked(&[5], 5);
        dir_name.chunks[0].filename = "/big/".into();
        assert!(dir_name.validate_chunks().is_err());
    }

    #[test]
    fn test_file_json_fields() {
        let f: File = serde_json::from_str(
            r#"{"filename":"/a/b.jpg","key":42,"sha1":"x","mine":"image/jpeg","filesize":9,"update_time":7}"#,
        )
        .unwrap();
        assert_eq!(f.key, NeedleKey(42));
        assert_eq!(f.mtime, 7);
        assert!(!f.is_chunked());

        let json = serde_json::to_value(&f).unwrap();
        assert!(json.get("chunks").is_none());
        assert_eq!(json["update_time"], 7);
    }

    #[test]
    fn test_legacy_chunks_field() {
        let f: File = serde_json::from_str(
            r#"{"filename":"/a","filesize":4,"Chunks":[{"filename":"/a/0","offset":0,"size":4}]}"#,
        )
        .unwrap();
        assert!(f.is_chunked());
        assert!(f.validate_chunks().is_ok());
    }
}
