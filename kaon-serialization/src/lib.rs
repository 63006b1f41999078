//! Bitcoin-style wire format: compact-size integers, a `Reader`/`Stream`
//! pair, and the `Serializable`/`Deserializable` traits implemented by
//! every on-wire chain object in `kaon-chain`.

extern crate byteorder;
extern crate kaon_primitives as primitives;

mod compact_integer;
mod reader;
mod stream;

pub use crate::compact_integer::CompactInteger;
pub use crate::reader::{deserialize, Deserializable, Error as ReaderError, Reader};
pub use crate::stream::{serialize, Serializable, Stream};
pub use primitives::{bytes, compact, hash};
