use kaon_primitives::hash::H256;

/// Combine two child hashes into their parent, Bitcoin-style: raw
/// concatenation of the 32-byte digests, double-SHA256'd.
pub fn merkle_node_hash(left: &H256, right: &H256) -> H256 {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(left.as_bytes());
    data.extend_from_slice(right.as_bytes());
    kaon_crypto::dhash256(&data)
}

/// Classic Bitcoin merkle root: duplicate the last hash on an odd level.
///
/// This does not apply the CVE-2012-2459 ("duplicate last leaf") guard a
/// full node needs on ingestion; the block validator's context-free check
/// rejects transaction-list duplication separately (`BlockTransactionsUniqueness`
/// in the reference implementation), which is the defense this spec relies on.
pub fn merkle_root(hashes: &[H256]) -> H256 {
    if hashes.is_empty() {
        return H256::default();
    }
    if hashes.len() == 1 {
        return hashes[0].clone();
    }

    let mut level: Vec<H256> = hashes.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1].clone();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| merkle_node_hash(&pair[0], &pair[1]))
            .collect();
    }
    level.remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hash_is_its_own_root() {
        let h = H256::from([7u8; 32]);
        assert_eq!(merkle_root(&[h.clone()]), h);
    }

    #[test]
    fn odd_count_duplicates_last_leaf() {
        let a = H256::from([1u8; 32]);
        let b = H256::from([2u8; 32]);
        let c = H256::from([3u8; 32]);
        let direct = merkle_root(&[a.clone(), b.clone(), c.clone()]);
        let duplicated = merkle_root(&[a, b, c.clone(), c]);
        assert_eq!(direct, duplicated);
    }
}
