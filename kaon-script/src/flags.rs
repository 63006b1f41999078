bitflags::bitflags! {
    /// Fork/verification flags passed to the script verifier, mirroring
    /// the `fork_flags` bitmask spec.md §6 describes. Individual bit
    /// meanings (BIP16/BIP141/BCH-specific opcodes, etc.) are the
    /// verifier's concern; this crate only carries the bitmask across
    /// the boundary.
    #[derive(Default)]
    pub struct ScriptFlags: u32 {
        const VERIFY_P2SH        = 1 << 0;
        const VERIFY_STRICTENC   = 1 << 1;
        const VERIFY_DERSIG      = 1 << 2;
        const VERIFY_LOW_S       = 1 << 3;
        const VERIFY_NULLDUMMY   = 1 << 4;
        const VERIFY_CHECKLOCKTIMEVERIFY = 1 << 5;
        const VERIFY_CHECKSEQUENCEVERIFY = 1 << 6;
        const VERIFY_WITNESS     = 1 << 7;
        const UTXO_AFTER_GENESIS = 1 << 8;
    }
}
