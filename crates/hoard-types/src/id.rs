use std::fmt;
use std::hash::Hash;
use std::io::{self, Read};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::IdError;

/// Running digest state that finalizes into an identifier.
pub trait DigestState: Default + Send {
    /// The identifier produced by [`finalize`](DigestState::finalize).
    type Id;

    /// Feed more content into the digest.
    fn update(&mut self, data: &[u8]);

    /// Consume the state and produce the identifier.
    fn finalize(self) -> Self::Id;
}

/// Content-derived, fixed-width identifier.
///
/// Implementations wrap a digest algorithm. Two identifiers are equal iff
/// their bytes are equal. The canonical textual form is uppercase hex of
/// exactly `2 * WIDTH` characters; the binary form is the raw digest bytes.
/// Both encodings round-trip losslessly.
pub trait ContentId:
    Copy
    + Eq
    + Ord
    + Hash
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = IdError>
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Width of the digest in bytes.
    const WIDTH: usize;

    /// Short algorithm name, e.g. `"md5"`.
    const ALGORITHM: &'static str;

    /// Incremental digest state for this identifier.
    type State: DigestState<Id = Self>;

    /// Raw digest bytes.
    fn as_slice(&self) -> &[u8];

    /// Decode from raw bytes. Only the leading `WIDTH` bytes are used.
    fn from_bytes(bytes: &[u8]) -> Result<Self, IdError>;

    /// Identifier of an in-memory byte sequence.
    fn digest(data: &[u8]) -> Self {
        let mut state = Self::State::default();
        state.update(data);
        state.finalize()
    }

    /// Identifier of everything `reader` yields until EOF.
    fn compute<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut hasher = crate::IncrementalHasher::<Self>::new();
        io::copy(reader, &mut hasher)?;
        Ok(hasher.finalize())
    }

    /// Owned copy of the raw digest bytes.
    fn to_bytes(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Uppercase, fixed-length hex encoding.
    fn to_hex(&self) -> String {
        hex::encode_upper(self.as_slice())
    }

    /// Parse the hex encoding. Either letter case is accepted.
    fn from_hex(s: &str) -> Result<Self, IdError> {
        if s.len() != Self::WIDTH * 2 {
            return Err(IdError::HexLength {
                expected: Self::WIDTH * 2,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|e| IdError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// First 8 hex characters, for logs and debug output.
    fn short_hex(&self) -> String {
        hex::encode_upper(&self.as_slice()[..4])
    }

    /// Directory component of the on-disk layout (first two hex characters).
    fn shard(&self) -> String {
        hex::encode_upper(&self.as_slice()[..1])
    }

    /// File component of the on-disk layout (remaining hex characters).
    fn leaf(&self) -> String {
        hex::encode_upper(&self.as_slice()[1..])
    }
}

/// Copy the leading `N` bytes of `bytes` into an array.
pub(crate) fn leading_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], IdError> {
    if bytes.len() < N {
        return Err(IdError::TooShort {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes[..N]);
    Ok(arr)
}
