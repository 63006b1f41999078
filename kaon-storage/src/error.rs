use thiserror::Error;

/// Store-side failures. A `reorganize`/`push` failure is unrecoverable
/// store corruption per spec.md §7; callers log it fatal rather than
/// retry or roll back further.
#[derive(Debug, Error)]
pub enum Error {
    #[error("store operation failed: {0}")]
    OperationFailed(String),
    #[error("not found")]
    NotFound,
}
