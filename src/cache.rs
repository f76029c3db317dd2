//! On-disk index blobs keyed by snapshot version.
//!
//! A blob holds the records and the bucket orderings of one built index, so a
//! reload skips the sort. Blobs are written once with `create_new` and never
//! rewritten; a blob that fails to decode or verify is deleted and rebuilt.

use crate::error::CacheError;
use crate::record::Record;
use crate::search::{BucketKey, Index, SnapshotVersion};
use postcard::{from_io, to_io};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bumped whenever the blob layout changes.
const BLOB_FORMAT: u32 = 1;

#[derive(Serialize)]
struct BlobRef<'a> {
    format: u32,
    version: SnapshotVersion,
    records: &'a [Record],
    buckets: &'a BTreeMap<BucketKey, Vec<u32>>,
}

#[derive(Deserialize)]
struct Blob {
    format: u32,
    version: SnapshotVersion,
    records: Vec<Record>,
    buckets: BTreeMap<BucketKey, Vec<u32>>,
}

/// Directory of persisted indexes.
#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, version: SnapshotVersion) -> PathBuf {
        self.dir.join(format!("{version}.index"))
    }

    /// Loads the index for `version`, or `None` when there is no usable blob.
    ///
    /// Unreadable or inconsistent blobs are removed.
    pub async fn load(&self, version: SnapshotVersion) -> Option<Index> {
        let path = self.path_for(version);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }

        let read_path = path.clone();
        let result = tokio::task::spawn_blocking(move || read_blob(&read_path, version))
            .await
            .map_err(CacheError::from)
            .and_then(|r| r);

        match result {
            Ok(index) => {
                tracing::debug!("Using cached index {}", path.display());
                Some(index)
            }
            Err(e) => {
                tracing::warn!("Discarding cached index: {}", e);
                let _ = tokio::fs::remove_file(&path).await;
                None
            }
        }
    }

    /// Persists an index under its snapshot version.
    ///
    /// Returns `false` when a blob for that version already exists.
    pub async fn store(&self, index: Arc<Index>) -> Result<bool, CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(index.snapshot_version());
        tokio::task::spawn_blocking(move || write_blob(&path, &index)).await?
    }
}

fn read_blob(path: &Path, version: SnapshotVersion) -> Result<Index, CacheError> {
    let mut file = std::fs::File::open(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = [0u8; 8192];
    let (blob, _): (Blob, _) =
        from_io((&mut file, &mut buf)).map_err(|source| CacheError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let corrupt = |reason: String| CacheError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    if blob.format != BLOB_FORMAT {
        return Err(corrupt(format!(
            "blob format {} (expected {BLOB_FORMAT})",
            blob.format
        )));
    }
    if blob.version != version {
        return Err(corrupt(format!("blob holds snapshot {}", blob.version)));
    }
    Index::from_parts(blob.records, blob.buckets, blob.version).map_err(corrupt)
}

fn write_blob(path: &Path, index: &Index) -> Result<bool, CacheError> {
    let mut file = match std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            // another process may have created it
            tracing::debug!("Index blob already exists at {}", path.display());
            return Ok(false);
        }
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let blob = BlobRef {
        format: BLOB_FORMAT,
        version: index.snapshot_version(),
        records: index.records_slice(),
        buckets: index.buckets_map(),
    };
    if let Err(e) = to_io(&blob, &mut file) {
        let _ = std::fs::remove_file(path);
        return Err(CacheError::Encode(e));
    }

    tracing::debug!("Cached index to {}", path.display());
    Ok(true)
}
