//! Fluent test-fixture builders for blocks and transactions (spec.md §1
//! "(ADDED) Test tooling"), used by `#[cfg(test)]` modules across the
//! workspace. Grounded on `test-data/src/chain_builder.rs`'s builder idiom.

mod block_builder;
mod transaction_builder;

pub use crate::block_builder::{block_builder, BlockBuilder};
pub use crate::transaction_builder::{ChainBuilder, TransactionBuilder};
