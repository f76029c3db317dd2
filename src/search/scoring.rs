//! Match classification and ranking tiers.

use super::index::FoldedRecord;
use super::query::NormalizedQuery;

/// How well a record matches a query. Variants are declared weakest first so
/// the derived ordering ranks stronger matches higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    /// Some token occurs inside the name.
    Substring,
    /// A qualified path segment starts with one of the tokens.
    PathSegment,
    /// The name starts with the whole query.
    NamePrefix,
    /// The name equals the whole query.
    Exact,
}

impl MatchTier {
    pub(crate) const COUNT: usize = 4;

    /// Slot in a best-first array of per-tier buffers.
    pub(crate) const fn rank(self) -> usize {
        match self {
            Self::Exact => 0,
            Self::NamePrefix => 1,
            Self::PathSegment => 2,
            Self::Substring => 3,
        }
    }

    /// Relevance percentage shown to users.
    pub const fn relevance(self) -> u32 {
        match self {
            Self::Exact => 100,
            Self::NamePrefix => 50,
            Self::PathSegment => 25,
            Self::Substring => 10,
        }
    }
}

/// Classifies a record against a query.
///
/// A record matches when every token is a prefix of some path segment or a
/// substring of the name. Returns `None` otherwise.
pub(crate) fn classify(record: &FoldedRecord, query: &NormalizedQuery) -> Option<MatchTier> {
    let every_token_matches = query.tokens().iter().all(|token| {
        record.name.contains(token.as_str())
            || record.path.iter().any(|seg| seg.starts_with(token.as_str()))
    });
    if !every_token_matches {
        return None;
    }

    let whole = query.as_str();
    let tier = if record.name == whole {
        MatchTier::Exact
    } else if record.name.starts_with(whole) {
        MatchTier::NamePrefix
    } else if query
        .tokens()
        .iter()
        .any(|token| record.path.iter().any(|seg| seg.starts_with(token.as_str())))
    {
        MatchTier::PathSegment
    } else {
        MatchTier::Substring
    };
    Some(tier)
}
