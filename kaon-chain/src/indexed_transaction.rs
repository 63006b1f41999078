use std::fmt;
use kaon_primitives::hash::H256;
use crate::transaction::Transaction;
use crate::validation::TransactionValidation;

/// A transaction together with its (cached) txid and the mutable
/// validation metadata the organizers/mempool attach to it (spec.md §3:
/// `validated`, `current`, `simulate` flags plus per-input
/// `PrevoutValidation`).
#[derive(Clone)]
pub struct IndexedTransaction {
    pub hash: H256,
    pub raw: Transaction,
    pub validation: TransactionValidation,
}

impl IndexedTransaction {
    pub fn new(hash: H256, raw: Transaction) -> Self {
        IndexedTransaction {
            hash,
            raw,
            validation: TransactionValidation::default(),
        }
    }

    pub fn from_raw(raw: Transaction) -> Self {
        let hash = raw.hash();
        IndexedTransaction::new(hash, raw)
    }
}

impl From<Transaction> for IndexedTransaction {
    fn from(raw: Transaction) -> Self {
        Self::from_raw(raw)
    }
}

impl PartialEq for IndexedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl fmt::Debug for IndexedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IndexedTransaction")
            .field("hash", &self.hash.to_reversed_str())
            .finish()
    }
}
