use std::io;
use byteorder::{LittleEndian, WriteBytesExt};
use crate::compact_integer::CompactInteger;

pub struct Stream {
    buffer: Vec<u8>,
}

impl Default for Stream {
    fn default() -> Self {
        Stream { buffer: Vec::new() }
    }
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append<T: Serializable>(&mut self, t: &T) -> &mut Self {
        t.serialize(self);
        self
    }

    pub fn append_list<T: Serializable>(&mut self, list: &[T]) -> &mut Self {
        CompactInteger::from(list.len())
            .write(&mut self.buffer)
            .expect("writing to a Vec<u8> never fails");
        for item in list {
            item.serialize(self);
        }
        self
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn out(self) -> Vec<u8> {
        self.buffer
    }
}

impl io::Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub trait Serializable {
    fn serialize(&self, stream: &mut Stream);

    fn serialized_size(&self) -> usize {
        let mut stream = Stream::new();
        self.serialize(&mut stream);
        stream.out().len()
    }
}

impl Serializable for u8 {
    fn serialize(&self, stream: &mut Stream) {
        stream.append_bytes(&[*self]);
    }
}

impl Serializable for u32 {
    fn serialize(&self, stream: &mut Stream) {
        let mut buf = [0u8; 4];
        (&mut buf[..]).write_u32::<LittleEndian>(*self).unwrap();
        stream.append_bytes(&buf);
    }
}

impl Serializable for u64 {
    fn serialize(&self, stream: &mut Stream) {
        let mut buf = [0u8; 8];
        (&mut buf[..]).write_u64::<LittleEndian>(*self).unwrap();
        stream.append_bytes(&buf);
    }
}

impl Serializable for i32 {
    fn serialize(&self, stream: &mut Stream) {
        let mut buf = [0u8; 4];
        (&mut buf[..]).write_i32::<LittleEndian>(*self).unwrap();
        stream.append_bytes(&buf);
    }
}

pub fn serialize<T: Serializable>(t: &T) -> Vec<u8> {
    let mut stream = Stream::new();
    stream.append(t);
    stream.out()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_u32_little_endian() {
        assert_eq!(serialize(&1u32), vec![1, 0, 0, 0]);
    }

    #[test]
    fn append_list_prefixes_compact_length() {
        let mut stream = Stream::new();
        stream.append_list(&[1u8, 2, 3]);
        assert_eq!(stream.out(), vec![3, 1, 2, 3]);
    }
}
