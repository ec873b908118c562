//! Staged writes of an open local transaction.

use std::collections::BTreeMap;

/// A pending change to a single blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingWrite {
    /// Create or replace the blob.
    Put {
        /// New blob contents.
        payload: Vec<u8>,
    },
    /// Remove the blob.
    Delete,
}

/// Changes recorded since `begin`, keyed by blob name.
///
/// A later write to the same name replaces the earlier one, so only the
/// final state of each blob is applied on commit.
#[derive(Debug, Default)]
pub(crate) struct StagedTransaction {
    writes: BTreeMap<String, PendingWrite>,
}

impl StagedTransaction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&mut self, name: &str, payload: Vec<u8>) {
        self.writes
            .insert(name.to_owned(), PendingWrite::Put { payload });
    }

    pub(crate) fn delete(&mut self, name: &str) {
        self.writes.insert(name.to_owned(), PendingWrite::Delete);
    }

    /// Returns the staged change for `name`, if any.
    pub(crate) fn get(&self, name: &str) -> Option<&PendingWrite> {
        self.writes.get(name)
    }

    pub(crate) fn pending_writes(&self) -> impl Iterator<Item = (&String, &PendingWrite)> {
        self.writes.iter()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_empty() {
        let txn = StagedTransaction::new();
        assert_eq!(txn.write_count(), 0);
        assert!(txn.get("a").is_none());
    }

    #[test]
    fn put_records_write() {
        let mut txn = StagedTransaction::new();
        txn.put("a", vec![1, 2, 3]);

        assert_eq!(txn.write_count(), 1);
        assert_eq!(
            txn.get("a"),
            Some(&PendingWrite::Put {
                payload: vec![1, 2, 3]
            })
        );
    }

    #[test]
    fn delete_overrides_put() {
        let mut txn = StagedTransaction::new();
        txn.put("a", vec![1]);
        txn.delete("a");

        assert_eq!(txn.write_count(), 1);
        assert_eq!(txn.get("a"), Some(&PendingWrite::Delete));
    }

    #[test]
    fn pending_writes_are_sorted_by_name() {
        let mut txn = StagedTransaction::new();
        txn.put("b", vec![2]);
        txn.put("a", vec![1]);

        let names: Vec<_> = txn.pending_writes().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
