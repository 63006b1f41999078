use kaon_primitives::bytes::Bytes;
use kaon_primitives::hash::H256;
use kaon_serialization::{CompactInteger, Deserializable, Error as ReaderError, Reader, Serializable, Stream};

pub const CURRENT_TX_VERSION: i32 = 2;

/// Pointer to a single output of a prior transaction.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct OutPoint {
    pub hash: H256,
    pub index: u32,
}

impl OutPoint {
    pub fn null() -> Self {
        OutPoint {
            hash: H256::default(),
            index: u32::max_value(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash.is_zero() && self.index == u32::max_value()
    }
}

impl Serializable for OutPoint {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_bytes(self.hash.as_bytes());
        stream.append(&self.index);
    }
}

impl Deserializable for OutPoint {
    fn deserialize(reader: &mut Reader) -> Result<Self, ReaderError> {
        let hash = H256::from(reader.read_bytes(32)?);
        let index = reader.read_u32()?;
        Ok(OutPoint { hash, index })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct TransactionInput {
    pub previous_output: OutPoint,
    pub script_sig: Bytes,
    pub sequence: u32,
}

impl TransactionInput {
    /// A coinbase input spends the null outpoint; its `script_sig` carries
    /// the block height (BIP34) and arbitrary extra nonce data.
    pub fn coinbase(script_sig: Bytes) -> Self {
        TransactionInput {
            previous_output: OutPoint::null(),
            script_sig,
            sequence: u32::max_value(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.sequence == u32::max_value()
    }
}

impl Serializable for TransactionInput {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.previous_output);
        CompactInteger::from(self.script_sig.len())
            .write(stream)
            .expect("writing to a Stream never fails");
        stream.append_bytes(&self.script_sig);
        stream.append(&self.sequence);
    }
}

impl Deserializable for TransactionInput {
    fn deserialize(reader: &mut Reader) -> Result<Self, ReaderError> {
        let previous_output = OutPoint::deserialize(reader)?;
        let len = reader.read_compact_int()?.value() as usize;
        let script_sig = Bytes::from(reader.read_bytes(len)?);
        let sequence = reader.read_u32()?;
        Ok(TransactionInput {
            previous_output,
            script_sig,
            sequence,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_pubkey: Bytes,
}

impl TransactionOutput {
    pub fn is_dust(&self, minimum_output_satoshis: u64) -> bool {
        self.value < minimum_output_satoshis
    }
}

impl Serializable for TransactionOutput {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.value);
        CompactInteger::from(self.script_pubkey.len())
            .write(stream)
            .expect("writing to a Stream never fails");
        stream.append_bytes(&self.script_pubkey);
    }
}

impl Deserializable for TransactionOutput {
    fn deserialize(reader: &mut Reader) -> Result<Self, ReaderError> {
        let value = reader.read_u64()?;
        let len = reader.read_compact_int()?.value() as usize;
        let script_pubkey = Bytes::from(reader.read_bytes(len)?);
        Ok(TransactionOutput {
            value,
            script_pubkey,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn hash(&self) -> H256 {
        kaon_crypto::dhash256(&kaon_serialization::serialize(self))
    }

    pub fn serialized_size(&self) -> usize {
        kaon_serialization::serialize(self).len()
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    pub fn total_spends(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// `size * byte_fee + sigops * sigop_fee`, floored at one satoshi when
    /// any fee knob is non-zero. Grounded on
    /// `transaction_organizer.cpp::price`.
    pub fn minimum_fee(&self, byte_fee_satoshis: f64, sigop_fee_satoshis: f64, sigops: usize) -> u64 {
        if byte_fee_satoshis == 0.0 && sigop_fee_satoshis == 0.0 {
            return 0;
        }
        let byte = if byte_fee_satoshis > 0.0 {
            byte_fee_satoshis * self.serialized_size() as f64
        } else {
            0.0
        };
        let sigop = if sigop_fee_satoshis > 0.0 {
            sigop_fee_satoshis * sigops as f64
        } else {
            0.0
        };
        1u64.max((byte + sigop) as u64)
    }

    pub fn is_dusty(&self, minimum_output_satoshis: u64) -> bool {
        self.outputs
            .iter()
            .any(|o| o.is_dust(minimum_output_satoshis))
    }

    pub fn is_final_in_block(&self, block_height: u32, block_time: u32) -> bool {
        if self.lock_time == 0 {
            return true;
        }
        let threshold = if self.lock_time < 500_000_000 {
            block_height as u64
        } else {
            block_time as u64
        };
        if (self.lock_time as u64) < threshold {
            return true;
        }
        self.inputs.iter().all(|i| i.is_final())
    }
}

impl Serializable for Transaction {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.version);
        stream.append_list(&self.inputs);
        stream.append_list(&self.outputs);
        stream.append(&self.lock_time);
    }
}

impl Deserializable for Transaction {
    fn deserialize(reader: &mut Reader) -> Result<Self, ReaderError> {
        let version = reader.read_i32()?;
        let inputs = reader.read_list()?;
        let outputs = reader.read_list()?;
        let lock_time = reader.read_u32()?;
        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_input_spends_null_outpoint() {
        let input = TransactionInput::coinbase(Bytes::new());
        assert!(input.previous_output.is_null());
    }

    #[test]
    fn minimum_fee_is_zero_when_unconfigured() {
        let tx = Transaction::default();
        assert_eq!(tx.minimum_fee(0.0, 0.0, 0), 0);
    }

    #[test]
    fn minimum_fee_floors_at_one_satoshi() {
        let tx = Transaction::default();
        assert_eq!(tx.minimum_fee(0.0000001, 0.0, 0), 1);
    }

    #[test]
    fn hash_round_trips_through_serialization() {
        let mut tx = Transaction::default();
        tx.outputs.push(TransactionOutput {
            value: 5000,
            script_pubkey: Bytes::new(),
        });
        let bytes = kaon_serialization::serialize(&tx);
        let decoded: Transaction = kaon_serialization::deserialize(&bytes).unwrap();
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn non_empty_scripts_round_trip() {
        let input = TransactionInput {
            previous_output: OutPoint { hash: H256::from([1u8; 32]), index: 0 },
            script_sig: Bytes::from(vec![0xab; 10]),
            sequence: u32::max_value(),
        };
        let output = TransactionOutput {
            value: 1234,
            script_pubkey: Bytes::from(vec![0x76, 0xa9, 0x14]),
        };
        let tx = Transaction {
            version: CURRENT_TX_VERSION,
            inputs: vec![input.clone()],
            outputs: vec![output.clone()],
            lock_time: 0,
        };
        let bytes = kaon_serialization::serialize(&tx);
        let decoded: Transaction = kaon_serialization::deserialize(&bytes).unwrap();
        assert_eq!(decoded.inputs[0].script_sig, input.script_sig);
        assert_eq!(decoded.outputs[0].script_pubkey, output.script_pubkey);
    }
}
