use thiserror::Error;

use kaon_mempool::Error as MempoolError;
use kaon_storage::Error as StoreError;
use kaon_verification::Error as VerificationError;

/// One of spec.md §7's four error kinds, used by the block organizer's
/// "retain in pool vs discard" decision (§4.7 step 5) and by callers that
/// only care about the category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lifecycle,
    Structural,
    Context,
    Consensus,
}

/// The organizer-level error taxonomy (spec.md §7), a superset of
/// `kaon-verification::Error` and `kaon-mempool::Error` plus the
/// forest/work-comparison failures that only the organizers themselves
/// can raise.
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("service stopped")]
    ServiceStopped,
    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("invalid block: {0}")]
    InvalidBlock(String),
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("invalid script")]
    InvalidScript,
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,

    #[error("orphan block")]
    OrphanBlock,
    #[error("duplicate block")]
    DuplicateBlock,
    #[error("duplicate transaction")]
    DuplicateTransaction,
    #[error("not found")]
    NotFound,
    #[error("missing previous output")]
    MissingPreviousOutput,

    #[error("insufficient work")]
    InsufficientWork,
    #[error("double spend")]
    DoubleSpend,
    #[error("double spend against the mempool")]
    DoubleSpendMempool,
    #[error("double spend against the blockchain")]
    DoubleSpendBlockchain,
    #[error("stack false")]
    StackFalse,
    #[error("block embedded sigop limit exceeded")]
    BlockEmbeddedSigopLimit,
    #[error("block sigcheck limit exceeded")]
    BlockSigchecksLimit,
    #[error("insufficient fee")]
    InsufficientFee,
    #[error("dusty transaction")]
    DustyTransaction,
    #[error("transaction benefit too low to displace the current template")]
    LowBenefitTransaction,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ServiceStopped | Error::OperationFailed(_) => ErrorKind::Lifecycle,
            Error::InvalidBlock(_)
            | Error::InvalidTransaction(_)
            | Error::InvalidScript
            | Error::InvalidSignatureEncoding => ErrorKind::Structural,
            Error::OrphanBlock
            | Error::DuplicateBlock
            | Error::DuplicateTransaction
            | Error::NotFound
            | Error::MissingPreviousOutput => ErrorKind::Context,
            Error::InsufficientWork
            | Error::DoubleSpend
            | Error::DoubleSpendMempool
            | Error::DoubleSpendBlockchain
            | Error::StackFalse
            | Error::BlockEmbeddedSigopLimit
            | Error::BlockSigchecksLimit
            | Error::InsufficientFee
            | Error::DustyTransaction
            | Error::LowBenefitTransaction => ErrorKind::Consensus,
        }
    }

    /// Reorganize failures, and any other store-side mutation failure, are
    /// unrecoverable store corruption (spec.md §7) and are logged fatal by
    /// the caller rather than retried.
    pub fn is_store_corruption(&self) -> bool {
        matches!(self, Error::OperationFailed(_))
    }
}

impl From<VerificationError> for Error {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::ServiceStopped => Error::ServiceStopped,
            VerificationError::OperationFailed(m) => Error::OperationFailed(m.to_string()),
            VerificationError::InvalidBlock(m) => Error::InvalidBlock(m.to_string()),
            VerificationError::InvalidTransaction(m) => Error::InvalidTransaction(m.to_string()),
            VerificationError::InvalidScript => Error::InvalidScript,
            VerificationError::InvalidSignatureEncoding => Error::InvalidSignatureEncoding,
            VerificationError::NotFound => Error::NotFound,
            VerificationError::MissingPreviousOutput => Error::MissingPreviousOutput,
            VerificationError::LastHeightUnavailable => {
                Error::OperationFailed("last height unavailable".to_string())
            }
            VerificationError::HeaderUnavailable => {
                Error::OperationFailed("header unavailable".to_string())
            }
            VerificationError::DoubleSpend => Error::DoubleSpend,
            VerificationError::StackFalse => Error::StackFalse,
            VerificationError::BlockEmbeddedSigopLimit => Error::BlockEmbeddedSigopLimit,
            VerificationError::BlockSigchecksLimit => Error::BlockSigchecksLimit,
            VerificationError::InsufficientFee => Error::InsufficientFee,
            VerificationError::DustyTransaction => Error::DustyTransaction,
        }
    }
}

impl From<MempoolError> for Error {
    fn from(e: MempoolError) -> Self {
        match e {
            MempoolError::DuplicateTransaction => Error::DuplicateTransaction,
            MempoolError::DoubleSpendMempool => Error::DoubleSpendMempool,
            MempoolError::LowBenefitTransaction => Error::LowBenefitTransaction,
            MempoolError::NotFound => Error::NotFound,
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::OperationFailed(e.to_string())
    }
}
