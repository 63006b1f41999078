//! Hashing primitives used to identify blocks, transactions and scripts.
//!
//! The reference implementation pulls these from an internal `bitcrypto`
//! crate (aliased as `crypto` at every call site). That crate isn't part of
//! this retrieval pack, so this module provides the same two functions
//! (`dhash256`, `dhash160`) over published `sha2`/`ripemd` implementations.

extern crate kaon_primitives as primitives;
extern crate ripemd;
extern crate sha2;

use primitives::hash::{H160, H256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// SHA256(SHA256(data)) — used for block/transaction/merkle hashing.
pub fn dhash256(data: &[u8]) -> H256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(&first);
    H256::from(second.as_slice())
}

/// RIPEMD160(SHA256(data)) — used for P2PKH/P2SH script hashes.
pub fn dhash160(data: &[u8]) -> H160 {
    let sha = Sha256::digest(data);
    let ripemd = Ripemd160::digest(&sha);
    H160::from(ripemd.as_slice())
}

/// Single SHA256 pass, used where the consensus rules call for it directly
/// (e.g. witness commitment construction in segwit-family chains).
pub fn sha256(data: &[u8]) -> H256 {
    H256::from(Sha256::digest(data).as_slice())
}

#[cfg(test)]
mod tests {
    use super::{dhash160, dhash256};

    #[test]
    fn dhash256_is_deterministic_and_not_single_sha256() {
        let single = super::sha256(b"abc");
        let double = dhash256(b"abc");
        assert_eq!(dhash256(b"abc"), double);
        assert_ne!(single, double);
    }

    #[test]
    fn dhash160_is_20_bytes() {
        assert_eq!(dhash160(b"abc").as_bytes().len(), 20);
    }
}
