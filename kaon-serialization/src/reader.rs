use std::io;
use byteorder::{LittleEndian, ReadBytesExt};
use crate::compact_integer::CompactInteger;

#[derive(Debug)]
pub enum Error {
    MalformedData,
    UnexpectedEnd,
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEnd,
            _ => Error::Io(e),
        }
    }
}

pub struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Reader {
            buffer,
            position: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.buffer.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.position + len > self.buffer.len() {
            return Err(Error::UnexpectedEnd);
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok((&mut self.read_bytes(4)?).read_u32::<LittleEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        Ok((&mut self.read_bytes(8)?).read_u64::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok((&mut self.read_bytes(4)?).read_i32::<LittleEndian>()?)
    }

    pub fn read_compact_int(&mut self) -> Result<CompactInteger, Error> {
        let mut slice = self.peek_all();
        let before = slice.len();
        let value = CompactInteger::read(&mut slice)?;
        let consumed = before - slice.len();
        self.position += consumed;
        Ok(value)
    }

    pub fn read_list<T: Deserializable>(&mut self) -> Result<Vec<T>, Error> {
        let len = self.read_compact_int()?.value();
        let mut result = Vec::with_capacity(len as usize);
        for _ in 0..len {
            result.push(T::deserialize(self)?);
        }
        Ok(result)
    }

    fn peek_all(&self) -> &'a [u8] {
        &self.buffer[self.position..]
    }
}

pub trait Deserializable: Sized {
    fn deserialize(reader: &mut Reader) -> Result<Self, Error>;
}

pub fn deserialize<T: Deserializable>(data: &[u8]) -> Result<T, Error> {
    let mut reader = Reader::new(data);
    T::deserialize(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_u32_little_endian() {
        let mut r = Reader::new(&[1, 0, 0, 0]);
        assert_eq!(r.read_u32().unwrap(), 1);
        assert!(r.is_finished());
    }

    #[test]
    fn unexpected_end_on_short_buffer() {
        let mut r = Reader::new(&[1, 2]);
        assert!(matches!(r.read_u32(), Err(Error::UnexpectedEnd)));
    }
}
