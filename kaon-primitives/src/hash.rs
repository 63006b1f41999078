use std::fmt;
use std::str::FromStr;
use rustc_hex::{FromHex, ToHex, FromHexError};

macro_rules! construct_hash {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
        pub struct $name(pub [u8; $size]);

        impl $name {
            pub const fn len() -> usize {
                $size
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Bitcoin displays hashes reversed (little-endian digest, big-endian display).
            pub fn reversed(&self) -> Self {
                let mut result = *self;
                result.0.reverse();
                result
            }

            pub fn to_reversed_str(&self) -> String {
                self.reversed().to_hex()
            }

            pub fn to_hex(&self) -> String {
                self.0.to_hex()
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                $name(bytes)
            }
        }

        impl<'a> From<&'a [u8]> for $name {
            fn from(slice: &'a [u8]) -> Self {
                let mut bytes = [0u8; $size];
                bytes.copy_from_slice(slice);
                $name(bytes)
            }
        }

        impl From<u8> for $name {
            fn from(v: u8) -> Self {
                let mut bytes = [0u8; $size];
                bytes[$size - 1] = v;
                $name(bytes)
            }
        }

        impl FromStr for $name {
            type Err = FromHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let vec: Vec<u8> = s.from_hex()?;
                if vec.len() != $size {
                    return Err(FromHexError::InvalidHexLength);
                }
                Ok($name::from(&vec[..]))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.to_reversed_str())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

construct_hash!(H160, 20);
construct_hash!(H256, 32);

/// A shortened transaction id used for compact-block reconstruction.
construct_hash!(H48, 6);

impl H256 {
    pub fn from_reversed_str(s: &str) -> Result<Self, FromHexError> {
        H256::from_str(s).map(|h| h.reversed())
    }
}

#[cfg(test)]
mod tests {
    use super::H256;
    use std::str::FromStr;

    #[test]
    fn zero_is_zero() {
        assert!(H256::default().is_zero());
    }

    #[test]
    fn reversed_round_trips() {
        let h = H256::from([1u8; 32]);
        assert_eq!(h.reversed().reversed(), h);
    }

    #[test]
    fn from_str_round_trips_hex() {
        let s = "00".repeat(31) + "01";
        let h = H256::from_str(&s).unwrap();
        assert_eq!(h.to_hex(), s);
    }
}
