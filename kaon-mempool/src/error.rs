use thiserror::Error;

/// Admission/removal failures raised by the mempool (spec.md §4.6/§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("duplicate transaction")]
    DuplicateTransaction,
    #[error("double spend against the mempool")]
    DoubleSpendMempool,
    #[error("transaction benefit too low to displace the current template")]
    LowBenefitTransaction,
    #[error("not found")]
    NotFound,
}
