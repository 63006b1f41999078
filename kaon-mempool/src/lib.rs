//! The indexed-DAG mempool and block-template engine (spec.md §4.6, C6).
//!
//! This crate is a pure, single-threaded data structure: the priority
//! mutex / low-priority-vs-high-priority scheduling that spec.md §5
//! describes around it is `kaon-blockchain`'s concern (the chain facade,
//! C9, owns the lock this crate's callers serialize behind).

mod ds_proof;
mod error;
mod mempool;
mod node;

pub use crate::ds_proof::DoubleSpendProof;
pub use crate::error::Error;
pub use crate::mempool::{BlockTemplate, Mempool, TemplateEntry, TemplateOrder};
pub use crate::node::MempoolNode;
