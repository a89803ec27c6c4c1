//! Sharded, deduplicating content-addressable storage.
//!
//! Content is persisted under an identifier computed from the content
//! itself, laid out on disk as `base/<first two hex chars>/<remaining hex>`.
//! Storing the same bytes twice writes one object. Objects may be linked by
//! depends-on edges so that removing a composite object also removes the
//! parts registered under it.
//!
//! # Key Types
//!
//! - [`ContentStore`] -- the store, generic over graph and identifier
//! - [`Source`] -- seekable or single-pass content input
//! - [`DependencyGraph`] -- pluggable depends-on edge storage
//! - [`InMemoryDependencyGraph`] -- `HashMap`-based graph for tests and embedding
//! - [`FsDependencyGraph`] -- JSON side index that survives restarts
//! - [`StoreConfig`] -- base path, index location, spool threshold
//! - [`RemovalReport`] -- per-object outcomes of a cascading removal
//!
//! # Design Rules
//!
//! 1. An object file holds exactly the stored bytes, nothing else.
//! 2. Existing objects are never overwritten.
//! 3. Objects appear atomically: temporary file first, then a no-clobber link.
//! 4. Edges are registered only after the dependent is stored.
//! 5. Dependent failures during removal are logged and reported, never raised.

pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod memory;
pub mod removal;
pub mod source;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use graph::DependencyGraph;
pub use index::FsDependencyGraph;
pub use memory::InMemoryDependencyGraph;
pub use removal::{RemovalOutcome, RemovalReport};
pub use source::{ReadSeek, Source};
pub use store::{ContentStore, StoreStats};

use hoard_types::Md5Id;

/// Store whose edges persist in the on-disk index.
pub type FsContentStore<I = Md5Id> = ContentStore<FsDependencyGraph<I>, I>;

/// Store whose edges live in memory.
pub type MemoryContentStore<I = Md5Id> = ContentStore<InMemoryDependencyGraph<I>, I>;
