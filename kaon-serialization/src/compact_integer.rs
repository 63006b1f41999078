use std::io;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Bitcoin's "varint" / CompactSize encoding: values below 0xfd are encoded
/// as a single byte; larger values are length-prefixed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CompactInteger(u64);

impl From<u64> for CompactInteger {
    fn from(v: u64) -> Self {
        CompactInteger(v)
    }
}

impl From<usize> for CompactInteger {
    fn from(v: usize) -> Self {
        CompactInteger(v as u64)
    }
}

impl From<CompactInteger> for u64 {
    fn from(c: CompactInteger) -> Self {
        c.0
    }
}

impl CompactInteger {
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn serialized_size(self) -> usize {
        match self.0 {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    pub fn write<W: io::Write>(self, w: &mut W) -> io::Result<()> {
        match self.0 {
            v @ 0..=0xfc => w.write_u8(v as u8),
            v @ 0xfd..=0xffff => {
                w.write_u8(0xfd)?;
                w.write_u16::<LittleEndian>(v as u16)
            }
            v @ 0x1_0000..=0xffff_ffff => {
                w.write_u8(0xfe)?;
                w.write_u32::<LittleEndian>(v as u32)
            }
            v => {
                w.write_u8(0xff)?;
                w.write_u64::<LittleEndian>(v)
            }
        }
    }

    pub fn read<R: io::Read>(r: &mut R) -> io::Result<Self> {
        let first = r.read_u8()?;
        let value = match first {
            0xfd => r.read_u16::<LittleEndian>()? as u64,
            0xfe => r.read_u32::<LittleEndian>()? as u64,
            0xff => r.read_u64::<LittleEndian>()?,
            v => v as u64,
        };
        Ok(CompactInteger(value))
    }
}

#[cfg(test)]
mod tests {
    use super::CompactInteger;

    #[test]
    fn round_trips_small_and_large_values() {
        for v in [0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, u32::MAX as u64 + 1] {
            let mut buf = Vec::new();
            CompactInteger::from(v).write(&mut buf).unwrap();
            let mut cursor = &buf[..];
            let read = CompactInteger::read(&mut cursor).unwrap();
            assert_eq!(read.value(), v);
        }
    }

    #[test]
    fn serialized_size_matches_written_bytes() {
        let mut buf = Vec::new();
        let c = CompactInteger::from(70_000u64);
        c.write(&mut buf).unwrap();
        assert_eq!(buf.len(), c.serialized_size());
    }
}
