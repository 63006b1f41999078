use kaon_primitives::compact::Compact;
use kaon_primitives::hash::H256;
use kaon_serialization::{Deserializable, Error as ReaderError, Reader, Serializable, Stream};

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct BlockHeader {
    pub version: u32,
    pub previous_header_hash: H256,
    pub merkle_root_hash: H256,
    pub time: u32,
    pub bits: Compact,
    pub nonce: u32,
}

impl Serializable for BlockHeader {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.version);
        stream.append_bytes(self.previous_header_hash.as_bytes());
        stream.append_bytes(self.merkle_root_hash.as_bytes());
        stream.append(&self.time);
        stream.append(&self.bits.to_compact());
        stream.append(&self.nonce);
    }
}

impl Deserializable for BlockHeader {
    fn deserialize(reader: &mut Reader) -> Result<Self, ReaderError> {
        let version = reader.read_u32()?;
        let previous_header_hash = H256::from(reader.read_bytes(32)?);
        let merkle_root_hash = H256::from(reader.read_bytes(32)?);
        let time = reader.read_u32()?;
        let bits = Compact::new(reader.read_u32()?);
        let nonce = reader.read_u32()?;
        Ok(BlockHeader {
            version,
            previous_header_hash,
            merkle_root_hash,
            time,
            bits,
            nonce,
        })
    }
}

pub fn block_header_hash(header: &BlockHeader) -> H256 {
    kaon_crypto::dhash256(&kaon_serialization::serialize(header))
}
