//! Ranked prefix search over an [`Index`].

use super::bucket::BucketKey;
use super::index::Index;
use super::query::NormalizedQuery;
use super::scoring::{MatchTier, classify};
use crate::record::{Record, SymbolKind};
use rapidfuzz::distance::jaro_winkler;
use std::sync::Arc;

/// Default number of results shown for a query.
pub const DEFAULT_LIMIT: usize = 50;

/// Minimum Jaro-Winkler similarity for a name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A ranked search result.
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub record: &'a Record,
    pub tier: MatchTier,
}

/// A fuzzy "did you mean" candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub score: f64,
}

/// Synchronous query engine. Cheap to clone; the index is shared read-only.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    index: Arc<Index>,
}

impl QueryEngine {
    pub fn new(index: Arc<Index>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    /// Returns at most `limit` records matching `query`, best first.
    ///
    /// Empty input yields no results. Never fails for any string input.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&Record> {
        self.search_hits(query, limit, None)
            .into_iter()
            .map(|hit| hit.record)
            .collect()
    }

    /// Like [`search`](Self::search), restricted to one symbol kind.
    pub fn search_kind(&self, query: &str, limit: usize, kind: Option<SymbolKind>) -> Vec<&Record> {
        self.search_hits(query, limit, kind)
            .into_iter()
            .map(|hit| hit.record)
            .collect()
    }

    /// Ranked search keeping the match tier of each hit.
    pub fn search_hits(
        &self,
        query: &str,
        limit: usize,
        kind: Option<SymbolKind>,
    ) -> Vec<SearchHit<'_>> {
        let Some(query) = NormalizedQuery::parse(query) else {
            return Vec::new();
        };
        if limit == 0 {
            return Vec::new();
        }

        let key = BucketKey::for_text(query.head());
        let Some(primary) = self.index.positions(key) else {
            tracing::trace!("No bucket {} for query '{}'", key, query.as_str());
            return Vec::new();
        };

        let mut collector = TierCollector::new(limit);
        collector.scan(&self.index, primary, &query, kind);

        // Multi-token queries may name an outer scope first ("basic_string
        // append"), so the rest of the store is consulted when the bucket of
        // the first token runs dry. Those hits share the collector, so they
        // rank by tier; within a tier the primary bucket stays first.
        if query.is_multi_token() && collector.len() < limit {
            for (other, positions) in self.index.bucket_positions() {
                if other == key {
                    continue;
                }
                if collector.scan(&self.index, positions, &query, kind) {
                    break;
                }
            }
        }

        collector.finish(&self.index)
    }

    /// Offers up to `count` distinct record names similar to `query`.
    pub fn suggest(&self, query: &str, count: usize) -> Vec<Suggestion> {
        let Some(query) = NormalizedQuery::parse(query) else {
            return Vec::new();
        };

        let mut suggestions: Vec<Suggestion> = Vec::new();
        for (pos, record) in self.index.records_slice().iter().enumerate() {
            let folded = &self.index.folded_at(u32::try_from(pos).unwrap_or(u32::MAX)).name;
            let score = jaro_winkler::similarity(query.as_str().chars(), folded.chars());
            if score < SUGGESTION_THRESHOLD {
                continue;
            }
            if let Some(existing) = suggestions.iter_mut().find(|s| s.name == record.name) {
                existing.score = existing.score.max(score);
            } else {
                suggestions.push(Suggestion {
                    name: record.name.clone(),
                    score,
                });
            }
        }

        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        suggestions.truncate(count);
        suggestions
    }
}

/// Per-tier buffers of bucket positions holding at most `limit` entries in
/// total.
///
/// Scanning follows storage order, so within a tier earlier entries are the
/// better ones. An entry is kept only while the tiers at or above its own have
/// room, and a stronger entry evicts the last entry of the weakest tier.
struct TierCollector {
    limit: usize,
    tiers: [Vec<(u32, MatchTier)>; MatchTier::COUNT],
}

impl TierCollector {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            tiers: Default::default(),
        }
    }

    /// Classifies positions in order. Returns `true` once the strongest tier
    /// alone fills the limit, after which nothing can change the outcome.
    fn scan(
        &mut self,
        index: &Index,
        positions: &[u32],
        query: &NormalizedQuery,
        kind: Option<SymbolKind>,
    ) -> bool {
        for &pos in positions {
            if self.saturated() {
                return true;
            }
            if kind.is_some_and(|k| index.record_at(pos).kind != k) {
                continue;
            }
            if let Some(tier) = classify(index.folded_at(pos), query) {
                self.offer(pos, tier);
            }
        }
        self.saturated()
    }

    fn offer(&mut self, pos: u32, tier: MatchTier) {
        let rank = tier.rank();
        let at_or_above: usize = self.tiers[..=rank].iter().map(Vec::len).sum();
        if at_or_above >= self.limit {
            return;
        }
        self.tiers[rank].push((pos, tier));

        let mut excess = self.len().saturating_sub(self.limit);
        for slot in self.tiers[rank + 1..].iter_mut().rev() {
            if excess == 0 {
                break;
            }
            let cut = excess.min(slot.len());
            slot.truncate(slot.len() - cut);
            excess -= cut;
        }
    }

    fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    fn saturated(&self) -> bool {
        self.tiers[MatchTier::Exact.rank()].len() >= self.limit
    }

    fn finish(self, index: &Index) -> Vec<SearchHit<'_>> {
        self.tiers
            .into_iter()
            .flatten()
            .map(|(pos, tier)| SearchHit {
                record: index.record_at(pos),
                tier,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    fn engine(records: Vec<Record>) -> QueryEngine {
        QueryEngine::new(Arc::new(Index::build(records).index))
    }

    fn rec(id: u64, name: &str, scope: &[&str]) -> Record {
        Record::new(id, name, scope, format!("#{id}"), SymbolKind::Function)
    }

    fn ids(records: &[&Record]) -> Vec<u64> {
        records.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn test_tiers_rank_before_storage_order() {
        let engine = engine(vec![
            rec(1, "mutex_base", &[]),
            rec(2, "mutex", &["pmem", "obj"]),
            rec(3, "mutexes_for", &["pmem"]),
            rec(4, "make_mutex", &[]),
        ]);
        check!(ids(&engine.search("mutex", 10)) == vec![2, 1, 3, 4]);
        check!(ids(&engine.search("utex", 10)) == Vec::<u64>::new());
    }

    #[test]
    fn test_truncates_to_limit() {
        let records = (0..20).map(|i| rec(i, &format!("alloc_{i:02}"), &[])).collect();
        let engine = engine(records);
        let results = engine.search("alloc", 5);
        check!(ids(&results) == vec![0, 1, 2, 3, 4]);
        check!(engine.search("alloc", 0).is_empty());
    }

    #[test]
    fn test_multi_token_falls_back_to_other_buckets() {
        let engine = engine(vec![
            rec(1, "append", &["basic_string"]),
            rec(2, "basic_string", &[]),
            rec(3, "at", &["array"]),
        ]);
        // Bucket 'b' has basic_string, which does not contain "append"; the
        // fallback finds append under basic_string in bucket 'a'.
        check!(ids(&engine.search("basic append", 10)) == vec![1]);
        check!(ids(&engine.search("basic", 10)) == vec![2]);
    }

    #[test]
    fn test_fallback_hits_rank_by_tier() {
        let engine = engine(vec![rec(1, "ttex_xba", &[]), rec(2, "bar", &["tex"])]);
        // primary bucket 't' only has a substring match; the scope match from
        // bucket 'b' is the stronger one
        let hits = engine.search_hits("tex ba", 10, None);
        let ranked: Vec<_> = hits.iter().map(|h| (h.record.id.0, h.tier)).collect();
        check!(ranked == vec![(2, MatchTier::PathSegment), (1, MatchTier::Substring)]);
    }

    #[test]
    fn test_collector_holds_at_most_limit() {
        let engine = engine(vec![
            rec(1, "aab1", &[]),
            rec(2, "aab2", &[]),
            rec(3, "aab3", &[]),
            rec(4, "ab", &[]),
            rec(5, "ab_x", &[]),
        ]);
        let index = engine.index();
        let_assert!(Some(positions) = index.positions(BucketKey::Letter('a')));
        let_assert!(Some(query) = NormalizedQuery::parse("ab"));

        let mut collector = TierCollector::new(2);
        for &pos in positions {
            collector.scan(index, &[pos], &query, None);
            check!(collector.len() <= 2);
        }
        let kept: Vec<_> = collector.finish(index).iter().map(|h| h.record.id.0).collect();
        check!(kept == vec![4, 5]);
        check!(ids(&engine.search("ab", 2)) == vec![4, 5]);
    }

    #[test]
    fn test_kind_filter() {
        let engine = engine(vec![
            rec(1, "pool", &[]),
            Record::new(2, "pool_base", &[], "#2", SymbolKind::Type),
        ]);
        let types = engine.search_kind("pool", 10, Some(SymbolKind::Type));
        check!(ids(&types) == vec![2]);
        check!(engine.search_kind("pool", 10, None).len() == 2);
    }

    #[test]
    fn test_hits_carry_tier() {
        let engine = engine(vec![rec(1, "at", &["array"]), rec(2, "atomic", &[])]);
        let hits = engine.search_hits("at", 10, None);
        check!(hits.len() == 2);
        check!(hits[0].tier == MatchTier::Exact);
        check!(hits[1].tier == MatchTier::NamePrefix);
    }

    #[test]
    fn test_suggest_similar_names() {
        let engine = engine(vec![
            rec(1, "persistent_ptr", &[]),
            rec(2, "persistent_ptr", &["pmem"]),
            rec(3, "pool", &[]),
        ]);
        let suggestions = engine.suggest("persistant_ptr", 3);
        check!(suggestions.len() == 1);
        check!(suggestions[0].name == "persistent_ptr");
        check!(engine.suggest("", 3).is_empty());
    }
}
