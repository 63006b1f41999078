use kaon_chain::{IndexedTransaction, OutPoint, Transaction, TransactionInput, TransactionOutput};
use kaon_primitives::bytes::Bytes;
use kaon_primitives::hash::H256;

/// Flat transaction builder, grounded on `test-data/src/chain_builder.rs`'s
/// `TransactionBuilder`. Zcash-specific fields (overwintered/sapling/join
/// split) are dropped; this chain has no shielded pool.
#[derive(Debug, Default, Clone)]
pub struct TransactionBuilder {
    pub transaction: Transaction,
}

impl From<TransactionBuilder> for Transaction {
    fn from(b: TransactionBuilder) -> Self {
        b.transaction
    }
}

impl From<TransactionBuilder> for IndexedTransaction {
    fn from(b: TransactionBuilder) -> Self {
        IndexedTransaction::from_raw(b.transaction)
    }
}

impl TransactionBuilder {
    pub fn coinbase() -> Self {
        let mut b = TransactionBuilder::default();
        b.transaction.inputs.push(TransactionInput::coinbase(Bytes::new()));
        b
    }

    pub fn with_version(version: i32) -> Self {
        TransactionBuilder::default().set_version(version)
    }

    pub fn with_output(value: u64) -> Self {
        TransactionBuilder::default().add_output(value)
    }

    pub fn with_default_input(output_index: u32) -> Self {
        TransactionBuilder::default().add_input(&Transaction::default(), output_index)
    }

    pub fn with_input(transaction: &Transaction, output_index: u32) -> Self {
        TransactionBuilder::default().add_input(transaction, output_index)
    }

    pub fn into_input(self, output_index: u32) -> Self {
        TransactionBuilder::default().add_input(&self.transaction, output_index)
    }

    pub fn set_version(mut self, version: i32) -> Self {
        self.transaction.version = version;
        self
    }

    pub fn add_output(mut self, value: u64) -> Self {
        self.transaction.outputs.push(TransactionOutput {
            value,
            script_pubkey: Bytes::new(),
        });
        self
    }

    pub fn set_output(mut self, value: u64) -> Self {
        self.transaction.outputs = vec![TransactionOutput {
            value,
            script_pubkey: Bytes::new(),
        }];
        self
    }

    pub fn add_input(mut self, transaction: &Transaction, output_index: u32) -> Self {
        self.transaction.inputs.push(TransactionInput {
            previous_output: OutPoint {
                hash: transaction.hash(),
                index: output_index,
            },
            script_sig: Bytes::new(),
            sequence: u32::max_value(),
        });
        self
    }

    pub fn add_input_hash(mut self, hash: H256, index: u32) -> Self {
        self.transaction.inputs.push(TransactionInput {
            previous_output: OutPoint { hash, index },
            script_sig: Bytes::new(),
            sequence: u32::max_value(),
        });
        self
    }

    pub fn lock(mut self) -> Self {
        self.transaction.inputs[0].sequence = 0;
        self.transaction.lock_time = 500_000;
        self
    }

    pub fn set_lock_time(mut self, lock_time: u32) -> Self {
        self.transaction.lock_time = lock_time;
        self
    }

    pub fn hash(self) -> H256 {
        self.transaction.hash()
    }
}

/// An ordered list of transactions used to wire up chained (ancestor ->
/// descendant) inputs in mempool tests, grounded on `ChainBuilder`.
#[derive(Debug, Default, Clone)]
pub struct ChainBuilder {
    pub transactions: Vec<Transaction>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        ChainBuilder::default()
    }

    pub fn at(&self, index: usize) -> Transaction {
        self.transactions[index].clone()
    }

    pub fn hash(&self, index: usize) -> H256 {
        self.transactions[index].hash()
    }
}

impl TransactionBuilder {
    pub fn store(self, chain: &mut ChainBuilder) -> Self {
        chain.transactions.push(self.transaction.clone());
        self
    }
}
