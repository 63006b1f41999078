use std::fmt;
use std::ops::{Deref, DerefMut};
use rustc_hex::ToHex;

/// A thin owning wrapper over a byte buffer, used for scripts and
/// serialized transaction payloads. Kept distinct from `Vec<u8>` so that
/// `Debug`/hex-display behavior is consistent across the codebase.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Bytes(Vec::new())
    }

    pub fn new_with_len(len: usize) -> Self {
        Bytes(vec![0u8; len])
    }

    pub fn take(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Bytes(v.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(v: [u8; N]) -> Self {
        Bytes(v.to_vec())
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hex: String = self.0.to_hex();
        write!(f, "{}", hex)
    }
}

#[cfg(test)]
mod tests {
    use super::Bytes;

    #[test]
    fn new_with_len_is_zero_filled() {
        let b = Bytes::new_with_len(4);
        assert_eq!(&*b, &[0, 0, 0, 0]);
    }
}
