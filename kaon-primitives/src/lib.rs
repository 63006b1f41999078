//! Fixed-width hash, compact-difficulty, and byte-buffer primitives.
//!
//! This crate has no dependency on consensus semantics; it exists so that
//! `kaon-chain`, `kaon-serialization`, `kaon-storage` and friends share one
//! definition of `H256`/`Compact`/`Bytes` instead of each rolling their own.

extern crate bigint;
extern crate rustc_hex;

pub mod bytes;
pub mod compact;
pub mod hash;

pub use bigint::uint;
