//! Content identifiers for the Hoard content-addressable store.
//!
//! An identifier is computed from content, never assigned. Identical bytes
//! always produce the same identifier, which makes stored objects
//! deduplicatable and lets the identifier double as the storage key.
//!
//! # Key Types
//!
//! - [`ContentId`] -- the identifier contract every digest type implements
//! - [`Md5Id`] -- 16-byte MD5 identifier (the store default)
//! - [`Blake3Id`] -- 32-byte BLAKE3 identifier
//! - [`IncrementalHasher`] -- chunked hashing, usable as an `io::Write` sink
//! - [`IdError`] -- malformed hex or byte input

pub mod digest;
pub mod error;
pub mod hasher;
pub mod id;

pub use digest::{Blake3Id, Blake3State, Md5Id, Md5State};
pub use error::IdError;
pub use hasher::IncrementalHasher;
pub use id::{ContentId, DigestState};
