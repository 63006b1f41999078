use thiserror::Error;

/// Script-verifier failure codes, mapped 1:1 onto the external verifier's
/// native error code by the implementation (spec.md §7: "Script-verify
/// results are mapped from the external verifier's native error code
/// into this taxonomy").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    #[error("stack false")]
    StackFalse,
    #[error("invalid script")]
    InvalidScript,
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,
    #[error("missing previous output")]
    MissingPreviousOutput,
}
