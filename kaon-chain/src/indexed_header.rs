use std::fmt;
use kaon_primitives::hash::H256;
use crate::block_header::{block_header_hash, BlockHeader};

#[derive(Clone)]
pub struct IndexedBlockHeader {
    pub hash: H256,
    pub raw: BlockHeader,
}

impl IndexedBlockHeader {
    pub fn new(hash: H256, header: BlockHeader) -> Self {
        IndexedBlockHeader { hash, raw: header }
    }

    pub fn from_raw(header: BlockHeader) -> Self {
        IndexedBlockHeader::new(block_header_hash(&header), header)
    }
}

impl From<BlockHeader> for IndexedBlockHeader {
    fn from(header: BlockHeader) -> Self {
        Self::from_raw(header)
    }
}

impl PartialEq for IndexedBlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl fmt::Debug for IndexedBlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IndexedBlockHeader")
            .field("hash", &self.hash.to_reversed_str())
            .finish()
    }
}
