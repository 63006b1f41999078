use thiserror::Error;

/// One of spec.md §7's four error kinds, used by callers that branch on
/// category rather than exact variant (e.g. the block organizer's "retain
/// in pool vs discard" decision in spec.md §4.7 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lifecycle,
    Structural,
    Context,
    Consensus,
}

/// Validation failures raised by the chain-state populator (C1), branch
/// model (C2), block validator (C4) and transaction validator (C5).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("service stopped")]
    ServiceStopped,
    #[error("operation failed: {0}")]
    OperationFailed(&'static str),

    #[error("invalid block: {0}")]
    InvalidBlock(&'static str),
    #[error("invalid transaction: {0}")]
    InvalidTransaction(&'static str),
    #[error("invalid script")]
    InvalidScript,
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,

    #[error("not found")]
    NotFound,
    #[error("missing previous output")]
    MissingPreviousOutput,
    #[error("last height unavailable")]
    LastHeightUnavailable,
    #[error("header unavailable")]
    HeaderUnavailable,

    #[error("double spend")]
    DoubleSpend,
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
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ServiceStopped | Error::OperationFailed(_) => ErrorKind::Lifecycle,
            Error::InvalidBlock(_)
            | Error::InvalidTransaction(_)
            | Error::InvalidScript
            | Error::InvalidSignatureEncoding => ErrorKind::Structural,
            Error::NotFound
            | Error::MissingPreviousOutput
            | Error::LastHeightUnavailable
            | Error::HeaderUnavailable => ErrorKind::Context,
            Error::DoubleSpend
            | Error::StackFalse
            | Error::BlockEmbeddedSigopLimit
            | Error::BlockSigchecksLimit
            | Error::InsufficientFee
            | Error::DustyTransaction => ErrorKind::Consensus,
        }
    }
}

impl From<kaon_script::ScriptError> for Error {
    fn from(e: kaon_script::ScriptError) -> Self {
        match e {
            kaon_script::ScriptError::StackFalse => Error::StackFalse,
            kaon_script::ScriptError::InvalidScript => Error::InvalidScript,
            kaon_script::ScriptError::InvalidSignatureEncoding => Error::InvalidSignatureEncoding,
            kaon_script::ScriptError::MissingPreviousOutput => Error::MissingPreviousOutput,
        }
    }
}
