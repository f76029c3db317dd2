//! Prefix-bucketed symbol search.
//!
//! Records are partitioned by the leading character of their name, sorted
//! within each bucket, and queried with tiered prefix/substring matching.

pub mod bucket;
pub mod engine;
pub mod index;
pub mod query;
pub mod scoring;

pub use bucket::BucketKey;
pub use engine::{DEFAULT_LIMIT, QueryEngine, SearchHit, Suggestion};
pub use index::{Index, IndexBuild, IndexBuilder, IndexStats, SnapshotVersion};
pub use query::NormalizedQuery;
pub use scoring::MatchTier;
