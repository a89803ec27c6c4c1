use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdError;
use crate::id::{leading_array, ContentId, DigestState};

/// 128-bit MD5 content identifier.
///
/// The default identifier of the store. MD5 is not collision resistant
/// against adversaries; use [`Blake3Id`] when content is untrusted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Md5Id([u8; 16]);

impl Md5Id {
    /// Wrap a pre-computed digest.
    pub const fn from_array(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw 16-byte digest.
    pub fn as_array(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Incremental MD5 state.
#[derive(Default)]
pub struct Md5State(Md5);

impl DigestState for Md5State {
    type Id = Md5Id;

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self) -> Md5Id {
        let out = self.0.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&out);
        Md5Id(bytes)
    }
}

impl ContentId for Md5Id {
    const WIDTH: usize = 16;
    const ALGORITHM: &'static str = "md5";
    type State = Md5State;

    fn as_slice(&self) -> &[u8] {
        &self.0
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IdError> {
        leading_array(bytes).map(Self)
    }
}

/// 256-bit BLAKE3 content identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Blake3Id([u8; 32]);

impl Blake3Id {
    /// Wrap a pre-computed digest.
    pub const fn from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte digest.
    pub fn as_array(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Incremental BLAKE3 state.
#[derive(Default)]
pub struct Blake3State(blake3::Hasher);

impl DigestState for Blake3State {
    type Id = Blake3Id;

    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Blake3Id {
        Blake3Id(*self.0.finalize().as_bytes())
    }
}

impl ContentId for Blake3Id {
    const WIDTH: usize = 32;
    const ALGORITHM: &'static str = "blake3";
    type State = Blake3State;

    fn as_slice(&self) -> &[u8] {
        &self.0
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IdError> {
        leading_array(bytes).map(Self)
    }
}

// Display/Debug/FromStr/serde are identical for every identifier: hex text.

macro_rules! hex_encoded {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.short_hex())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $ty {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, IdError> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_encoded!(Md5Id);
hex_encoded!(Blake3Id);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_of_hello_matches_reference() {
        let id = Md5Id::digest(b"hello");
        assert_eq!(id.to_hex(), "5D41402ABC4B2A76B9719D911017C592");
    }

    #[test]
    fn md5_of_empty_matches_reference() {
        let id = Md5Id::digest(b"");
        assert_eq!(id.to_hex(), "D41D8CD98F00B204E9800998ECF8427E");
    }

    #[test]
    fn blake3_matches_library() {
        let id = Blake3Id::digest(b"hello");
        assert_eq!(id.as_array(), blake3::hash(b"hello").as_bytes());
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(Md5Id::digest(b"same"), Md5Id::digest(b"same"));
        assert_ne!(Md5Id::digest(b"hello"), Md5Id::digest(b"world"));
    }

    #[test]
    fn compute_streams_reader() {
        let data = vec![0xABu8; 100_000];
        let streamed = Md5Id::compute(&mut data.as_slice()).unwrap();
        assert_eq!(streamed, Md5Id::digest(&data));
    }

    #[test]
    fn hex_is_uppercase_fixed_length() {
        let id = Md5Id::from_array([0x0a; 16]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(hex, "0A".repeat(16));

        let id = Blake3Id::digest(b"x");
        assert_eq!(id.to_hex().len(), 64);
        assert!(!id.to_hex().chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn hex_roundtrip() {
        let id = Md5Id::digest(b"roundtrip");
        assert_eq!(Md5Id::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(id.to_string().parse::<Md5Id>().unwrap(), id);
    }

    #[test]
    fn lowercase_hex_is_accepted() {
        let id = Md5Id::from_hex("5d41402abc4b2a76b9719d911017c592").unwrap();
        assert_eq!(id, Md5Id::digest(b"hello"));
    }

    #[test]
    fn bytes_roundtrip() {
        let id = Blake3Id::digest(b"bytes");
        assert_eq!(Blake3Id::from_bytes(&id.to_bytes()).unwrap(), id);
    }

    #[test]
    fn wrong_hex_length_is_rejected() {
        assert_eq!(
            Md5Id::from_hex("ABC").unwrap_err(),
            IdError::HexLength { expected: 32, actual: 3 }
        );
        assert!(Md5Id::from_hex("").is_err());
        assert!(Md5Id::from_hex(&"A".repeat(33)).is_err());
        // A valid MD5 string is the wrong width for BLAKE3.
        assert!(Blake3Id::from_hex(&Md5Id::digest(b"x").to_hex()).is_err());
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        let err = Md5Id::from_hex(&"G".repeat(32)).unwrap_err();
        assert!(matches!(err, IdError::InvalidHex(_)));
        assert!(Md5Id::from_hex(&format!("{}-", "0".repeat(31))).is_err());
    }

    #[test]
    fn short_bytes_are_rejected() {
        assert_eq!(
            Md5Id::from_bytes(&[1, 2, 3]).unwrap_err(),
            IdError::TooShort { expected: 16, actual: 3 }
        );
        assert!(Blake3Id::from_bytes(&[0u8; 31]).is_err());
    }

    #[test]
    fn surplus_bytes_are_ignored() {
        let id = Md5Id::digest(b"prefix");
        let mut bytes = id.to_bytes();
        bytes.extend_from_slice(&[0xFF; 4]);
        assert_eq!(Md5Id::from_bytes(&bytes).unwrap(), id);
    }

    #[test]
    fn shard_and_leaf_split_hex() {
        let id = Md5Id::digest(b"hello");
        assert_eq!(id.shard(), "5D");
        assert_eq!(id.leaf(), "41402ABC4B2A76B9719D911017C592");
        assert_eq!(format!("{}{}", id.shard(), id.leaf()), id.to_hex());
    }

    #[test]
    fn debug_uses_short_form() {
        let id = Md5Id::digest(b"hello");
        assert_eq!(format!("{id:?}"), "Md5Id(5D41402A)");
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = Md5Id::digest(b"serde");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let parsed: Md5Id = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<Md5Id>("\"nothex\"").is_err());
    }

    #[test]
    fn ordering_is_bytewise() {
        assert!(Md5Id::from_array([0; 16]) < Md5Id::from_array([1; 16]));
    }
}
