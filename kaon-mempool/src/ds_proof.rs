use kaon_chain::hash::H256;
use kaon_chain::OutPoint;
use kaon_primitives::bytes::Bytes;

/// A double-spend proof: evidence that two transactions spend the same
/// outpoint, carried orthogonally to the mempool's own conflict rejection
/// so a node can alert peers without holding both full transactions
/// (spec.md §4.6 "Double-spend proofs"; grounded on
/// `transaction_organizer.cpp`'s `organize(ds_proof)` path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleSpendProof {
    pub outpoint: OutPoint,
    pub descendant_score: u64,
    pub proof_data: Bytes,
}

impl DoubleSpendProof {
    /// Content hash used as the proof map's key and as the handle
    /// returned to fetch-by-hash callers.
    pub fn hash(&self) -> H256 {
        let mut buf = Vec::with_capacity(32 + 4 + 8 + self.proof_data.len());
        buf.extend_from_slice(self.outpoint.hash.as_bytes());
        buf.extend_from_slice(&self.outpoint.index.to_le_bytes());
        buf.extend_from_slice(&self.descendant_score.to_le_bytes());
        buf.extend_from_slice(&self.proof_data);
        kaon_crypto::dhash256(&buf)
    }
}
