use kaon_chain::hash::H256;

/// The highest block shared between two competing chains (glossary:
/// "Fork point"), as passed to `Store::reorganize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkPoint {
    pub height: u32,
    pub hash: H256,
}
