//! Immutable table of documentation records keyed by id.

use crate::error::StoreError;
use crate::record::{Record, RecordId};
use ahash::AHashMap;

/// Records of one documentation snapshot.
///
/// Populated once and never mutated afterwards. Positions are stable for the
/// lifetime of the store, so the index refers to records by position.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    by_id: AHashMap<RecordId, usize>,
}

impl RecordStore {
    /// Builds a store from records whose ids are already known to be unique.
    pub(crate) fn from_unique(records: Vec<Record>) -> Self {
        let by_id = records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id, pos))
            .collect();
        Self { records, by_id }
    }

    /// Looks up a record by id.
    pub fn get(&self, id: RecordId) -> Result<&Record, StoreError> {
        self.by_id
            .get(&id)
            .map(|&pos| &self.records[pos])
            .ok_or(StoreError::NotFound { id })
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Iterates all records in insertion order. Each call starts over.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &Record> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn at(&self, pos: u32) -> &Record {
        &self.records[pos as usize]
    }

    pub(crate) fn as_slice(&self) -> &[Record] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SymbolKind;
    use assert2::{check, let_assert};

    fn store() -> RecordStore {
        RecordStore::from_unique(vec![
            Record::new(10, "append", &["basic_string"], "a", SymbolKind::Function),
            Record::new(20, "at", &["array"], "b", SymbolKind::Function),
        ])
    }

    #[test]
    fn test_get_by_id() {
        let store = store();
        let_assert!(Ok(record) = store.get(RecordId(20)));
        check!(record.name == "at");
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let store = store();
        check!(store.get(RecordId(99)) == Err(StoreError::NotFound { id: RecordId(99) }));
        check!(!store.contains(RecordId(99)));
    }

    #[test]
    fn test_all_is_restartable() {
        let store = store();
        let first: Vec<_> = store.all().map(|r| r.id).collect();
        let second: Vec<_> = store.all().map(|r| r.id).collect();
        check!(first == second);
        check!(first == vec![RecordId(10), RecordId(20)]);
        check!(store.all().len() == 2);
    }
}
