use kaon_chain::{Block, BlockHeader, OutPoint, Transaction, TransactionInput, TransactionOutput};
use kaon_primitives::bytes::Bytes;
use kaon_primitives::compact::Compact;
use kaon_primitives::hash::H256;

pub fn block_builder() -> BlockBuilder {
    BlockBuilder::default()
}

#[derive(Default)]
pub struct BlockBuilder {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl BlockBuilder {
    pub fn header(self) -> BlockHeaderBuilder {
        BlockHeaderBuilder {
            parent: self,
            header: BlockHeader {
                bits: Compact::max_value(),
                ..BlockHeader::default()
            },
        }
    }

    pub fn transaction(self) -> BlockTransactionBuilder {
        BlockTransactionBuilder {
            parent: self,
            transaction: Transaction::default(),
        }
    }

    pub fn build(mut self) -> Block {
        if self.header.merkle_root_hash.is_zero() && !self.transactions.is_empty() {
            let hashes: Vec<_> = self.transactions.iter().map(|tx| tx.hash()).collect();
            self.header.merkle_root_hash = kaon_chain::merkle_root(&hashes);
        }
        Block {
            header: self.header,
            transactions: self.transactions,
        }
    }
}

pub struct BlockHeaderBuilder {
    parent: BlockBuilder,
    header: BlockHeader,
}

impl BlockHeaderBuilder {
    pub fn version(mut self, version: u32) -> Self {
        self.header.version = version;
        self
    }

    pub fn parent(mut self, hash: H256) -> Self {
        self.header.previous_header_hash = hash;
        self
    }

    pub fn time(mut self, time: u32) -> Self {
        self.header.time = time;
        self
    }

    pub fn bits(mut self, bits: Compact) -> Self {
        self.header.bits = bits;
        self
    }

    pub fn nonce(mut self, nonce: u32) -> Self {
        self.header.nonce = nonce;
        self
    }

    pub fn build(mut self) -> BlockBuilder {
        self.parent.header = self.header;
        self.parent
    }
}

pub struct BlockTransactionBuilder {
    parent: BlockBuilder,
    transaction: Transaction,
}

impl BlockTransactionBuilder {
    pub fn coinbase(mut self) -> Self {
        self.transaction
            .inputs
            .push(TransactionInput::coinbase(Bytes::new()));
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.transaction.lock_time = lock_time;
        self
    }

    pub fn input(self) -> BlockTransactionInputBuilder {
        BlockTransactionInputBuilder {
            parent: self,
            input: TransactionInput::default(),
        }
    }

    pub fn output(self) -> BlockTransactionOutputBuilder {
        BlockTransactionOutputBuilder {
            parent: self,
            output: TransactionOutput::default(),
        }
    }

    pub fn build(mut self) -> BlockBuilder {
        self.parent.transactions.push(self.transaction);
        self.parent
    }
}

pub struct BlockTransactionInputBuilder {
    parent: BlockTransactionBuilder,
    input: TransactionInput,
}

impl BlockTransactionInputBuilder {
    pub fn hash(mut self, hash: H256) -> Self {
        self.input.previous_output.hash = hash;
        self
    }

    pub fn index(mut self, index: u32) -> Self {
        self.input.previous_output.index = index;
        self
    }

    pub fn build(mut self) -> BlockTransactionBuilder {
        self.parent.transaction.inputs.push(self.input);
        self.parent
    }
}

pub struct BlockTransactionOutputBuilder {
    parent: BlockTransactionBuilder,
    output: TransactionOutput,
}

impl BlockTransactionOutputBuilder {
    pub fn value(mut self, value: u64) -> Self {
        self.output.value = value;
        self
    }

    pub fn build(mut self) -> BlockTransactionBuilder {
        self.parent.transaction.outputs.push(self.output);
        self.parent
    }
}

impl Default for BlockHeader {
    fn default() -> Self {
        BlockHeader {
            version: 1,
            previous_header_hash: H256::default(),
            merkle_root_hash: H256::default(),
            time: 0,
            bits: Compact::max_value(),
            nonce: 0,
        }
    }
}

#[allow(unused)]
fn _outpoint_field_reference(_o: OutPoint) {}
