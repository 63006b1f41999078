use kaon_serialization::{Deserializable, Error as ReaderError, Reader, Serializable, Stream};
use crate::block_header::BlockHeader;
use crate::merkle_root::merkle_root;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn merkle_root(&self) -> kaon_primitives::hash::H256 {
        let hashes: Vec<_> = self.transactions.iter().map(|tx| tx.hash()).collect();
        merkle_root(&hashes)
    }

    pub fn serialized_size(&self) -> usize {
        kaon_serialization::serialize(self).len()
    }

    /// Count of non-coinbase inputs, used to decide whether §4.4's connect
    /// phase has any script-verification work to do at all.
    pub fn total_inputs(&self, include_coinbase: bool) -> usize {
        self.transactions
            .iter()
            .skip(if include_coinbase { 0 } else { 1 })
            .map(|tx| tx.inputs.len())
            .sum()
    }
}

impl Serializable for Block {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.header);
        stream.append_list(&self.transactions);
    }
}

impl Deserializable for Block {
    fn deserialize(reader: &mut Reader) -> Result<Self, ReaderError> {
        let header = BlockHeader::deserialize(reader)?;
        let transactions = reader.read_list()?;
        Ok(Block {
            header,
            transactions,
        })
    }
}
