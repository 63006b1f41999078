use kaon_chain::TransactionOutput;

/// The resolved state of an unspent (or, via `Store::get_output`,
/// possibly historical) output, as returned by the store. Maps directly
/// onto the fields `Branch::populate_prevout`/`populate_spent` (spec.md
/// §4.2) need to fill a `PrevoutValidation` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoEntry {
    pub output: TransactionOutput,
    pub height: u32,
    pub median_time_past: u32,
    pub coinbase: bool,
}
