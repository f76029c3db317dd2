//! Bucketed symbol index and its builder.

use super::bucket::BucketKey;
use crate::error::ValidationError;
use crate::record::{Record, RecordId};
use crate::store::RecordStore;
use ahash::AHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::Xxh3;

/// Fingerprint of the records an index was built from.
///
/// Equal record sets always produce the same version, so it doubles as the
/// key for persisted index blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotVersion(pub u64);

impl SnapshotVersion {
    /// Hashes records in id order.
    pub fn of<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut sorted: Vec<&Record> = records.into_iter().collect();
        sorted.sort_by_key(|r| r.id);

        let mut hasher = Xxh3::new();
        for record in sorted {
            hasher.update(&record.id.0.to_le_bytes());
            hasher.update(record.name.as_bytes());
            hasher.update(&[0]);
            for segment in &record.qualified_path {
                hasher.update(segment.as_bytes());
                hasher.update(&[0x1f]);
            }
            hasher.update(&[0]);
            hasher.update(record.url.as_bytes());
            hasher.update(&[0]);
            hasher.update(record.kind.as_str().as_bytes());
            hasher.update(&[0]);
            if let Some(note) = &record.overload_note {
                hasher.update(note.as_bytes());
            }
            hasher.update(&[0x1e]);
        }
        Self(hasher.digest())
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SnapshotVersion {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s.trim(), 16).map(Self)
    }
}

impl Serialize for SnapshotVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for SnapshotVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self)
    }
}

/// Lowercased copies of the matchable fields, computed once per build.
#[derive(Debug, Clone)]
pub(crate) struct FoldedRecord {
    pub(crate) name: String,
    pub(crate) path: Vec<String>,
}

impl FoldedRecord {
    fn of(record: &Record) -> Self {
        Self {
            name: record.name.to_lowercase(),
            path: record
                .qualified_path
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }
}

/// Summary counts for logging and tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub records: usize,
    pub buckets: usize,
    pub largest_bucket: usize,
}

/// Immutable prefix-partitioned index over one documentation snapshot.
///
/// Built once by [`IndexBuilder`] and never mutated; a new snapshot gets a new
/// index. Shared freely across sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Index {
    store: RecordStore,
    folded: Vec<FoldedRecord>,
    buckets: BTreeMap<BucketKey, Vec<u32>>,
    version: SnapshotVersion,
}

impl Index {
    pub fn builder() -> IndexBuilder {
        IndexBuilder::default()
    }

    /// Builds an index from records, excluding any that fail validation.
    pub fn build(records: impl IntoIterator<Item = Record>) -> IndexBuild {
        let mut builder = IndexBuilder::default();
        builder.extend(records);
        builder.build()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn get(&self, id: RecordId) -> Result<&Record, crate::error::StoreError> {
        self.store.get(id)
    }

    pub fn snapshot_version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Records of one bucket in ranked storage order.
    pub fn bucket(&self, key: BucketKey) -> Option<impl ExactSizeIterator<Item = &Record> + '_> {
        self.buckets
            .get(&key)
            .map(|positions| positions.iter().map(|&pos| self.store.at(pos)))
    }

    /// Bucket keys in deterministic order.
    pub fn bucket_keys(&self) -> impl Iterator<Item = BucketKey> + '_ {
        self.buckets.keys().copied()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            records: self.store.len(),
            buckets: self.buckets.len(),
            largest_bucket: self.buckets.values().map(Vec::len).max().unwrap_or(0),
        }
    }

    pub(crate) fn positions(&self, key: BucketKey) -> Option<&[u32]> {
        self.buckets.get(&key).map(Vec::as_slice)
    }

    pub(crate) fn bucket_positions(&self) -> impl Iterator<Item = (BucketKey, &[u32])> + '_ {
        self.buckets.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub(crate) fn record_at(&self, pos: u32) -> &Record {
        self.store.at(pos)
    }

    pub(crate) fn folded_at(&self, pos: u32) -> &FoldedRecord {
        &self.folded[pos as usize]
    }

    pub(crate) fn buckets_map(&self) -> &BTreeMap<BucketKey, Vec<u32>> {
        &self.buckets
    }

    pub(crate) fn records_slice(&self) -> &[Record] {
        self.store.as_slice()
    }

    /// Reassembles an index from persisted parts, checking that the bucket
    /// orderings still partition the records.
    pub(crate) fn from_parts(
        records: Vec<Record>,
        buckets: BTreeMap<BucketKey, Vec<u32>>,
        version: SnapshotVersion,
    ) -> Result<Self, String> {
        if SnapshotVersion::of(&records) != version {
            return Err("snapshot version does not match records".to_string());
        }

        let mut seen = vec![false; records.len()];
        for (key, positions) in &buckets {
            for &pos in positions {
                let Some(record) = records.get(pos as usize) else {
                    return Err(format!("bucket {key} refers to missing position {pos}"));
                };
                if BucketKey::for_text(&record.name) != *key {
                    return Err(format!("record {} is filed under bucket {key}", record.id));
                }
                if std::mem::replace(&mut seen[pos as usize], true) {
                    return Err(format!("record {} appears twice", record.id));
                }
            }
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(format!("record {} is not in any bucket", records[missing].id));
        }

        let folded = records.iter().map(FoldedRecord::of).collect();
        Ok(Self {
            store: RecordStore::from_unique(records),
            folded,
            buckets,
            version,
        })
    }
}

/// Result of an index build: the index plus every rejected record.
#[derive(Debug)]
pub struct IndexBuild {
    pub index: Index,
    pub rejected: Vec<ValidationError>,
}

/// Accumulates producer records and partitions them into buckets.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    records: Vec<Record>,
}

impl IndexBuilder {
    pub fn push(&mut self, record: Record) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) -> &mut Self {
        self.records.extend(records);
        self
    }

    /// Validates, buckets and sorts the accumulated records.
    ///
    /// Invalid records are excluded and reported; they never abort the build.
    /// Duplicate ids keep the first occurrence.
    pub fn build(self) -> IndexBuild {
        let start = std::time::Instant::now();
        let submitted = self.records.len();

        let mut rejected = Vec::new();
        let mut ids = AHashSet::with_capacity(submitted);
        let mut accepted = Vec::with_capacity(submitted);

        for record in self.records {
            let verdict = record.validate().and_then(|()| {
                if ids.insert(record.id) {
                    Ok(())
                } else {
                    Err(ValidationError::DuplicateId { id: record.id })
                }
            });
            match verdict {
                Ok(()) => accepted.push(record),
                Err(error) => {
                    tracing::warn!("Rejected record: {}", error);
                    rejected.push(error);
                }
            }
        }

        let folded: Vec<FoldedRecord> = accepted.iter().map(FoldedRecord::of).collect();

        let mut buckets: BTreeMap<BucketKey, Vec<u32>> = BTreeMap::new();
        for (pos, record) in accepted.iter().enumerate() {
            let pos = u32::try_from(pos).unwrap_or(u32::MAX);
            buckets
                .entry(BucketKey::for_text(&record.name))
                .or_default()
                .push(pos);
        }

        for positions in buckets.values_mut() {
            positions.sort_by(|&a, &b| {
                storage_order(
                    &accepted[a as usize],
                    &folded[a as usize],
                    &accepted[b as usize],
                    &folded[b as usize],
                )
            });
        }

        let version = SnapshotVersion::of(&accepted);
        let index = Index {
            store: RecordStore::from_unique(accepted),
            folded,
            buckets,
            version,
        };

        let stats = index.stats();
        tracing::info!(
            "Built symbol index {}: {} records in {} buckets ({} submitted, {} rejected) in {:?}",
            version,
            stats.records,
            stats.buckets,
            submitted,
            rejected.len(),
            start.elapsed()
        );

        IndexBuild { index, rejected }
    }
}

/// Case-insensitive name, then shallower path, then id.
fn storage_order(a: &Record, fa: &FoldedRecord, b: &Record, fb: &FoldedRecord) -> Ordering {
    fa.name
        .cmp(&fb.name)
        .then_with(|| a.qualified_path.len().cmp(&b.qualified_path.len()))
        .then_with(|| a.id.cmp(&b.id))
}
