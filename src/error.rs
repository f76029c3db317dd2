//! Error handling types and utilities.

use crate::record::RecordId;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized Result type for symdex application code.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods in the loading and serving layers.
pub type Result<T> = anyhow::Result<T>;

/// A record rejected while building an index.
///
/// Rejection only excludes the offending record; the rest of the snapshot is
/// still indexed and all rejections are reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The record has no display name.
    #[error("record {id}: empty name")]
    EmptyName { id: RecordId },
    /// The record has no qualified path segments.
    #[error("record {id}: empty qualified path")]
    EmptyPath { id: RecordId },
    /// The display name is not the innermost path segment.
    #[error("record {id}: name '{name}' does not match last path segment '{last}'")]
    NameMismatch {
        id: RecordId,
        name: String,
        last: String,
    },
    /// Another record with the same id was accepted first.
    #[error("record {id}: duplicate id")]
    DuplicateId { id: RecordId },
}

impl ValidationError {
    /// Id of the rejected record.
    pub const fn id(&self) -> RecordId {
        match self {
            Self::EmptyName { id }
            | Self::EmptyPath { id }
            | Self::NameMismatch { id, .. }
            | Self::DuplicateId { id } => *id,
        }
    }
}

/// Error returned by record store lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no record with id {id}")]
    NotFound { id: RecordId },
}

/// Error returned when a producer search table cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The `var searchData = [...]` wrapper was not found.
    #[error("missing searchData array")]
    MissingArray,
    /// Unexpected input at the given byte offset.
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    Unexpected {
        offset: usize,
        expected: &'static str,
        found: String,
    },
    /// An entry did not have the `[key, [name, [url, flag, scope]...]]` shape.
    #[error("malformed entry {index}: {reason}")]
    MalformedEntry { index: usize, reason: String },
}

/// Error returned by index persistence.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access index blob at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode index blob: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode index blob at {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: postcard::Error,
    },
    #[error("index blob at {} is inconsistent: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("index storing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
