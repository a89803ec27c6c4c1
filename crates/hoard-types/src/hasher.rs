use std::io;

use crate::id::{ContentId, DigestState};

/// Incremental hasher for building an identifier across multiple chunks.
///
/// Implements [`io::Write`] so it can be the sink of [`io::copy`] or a tee
/// target while content is being persisted.
pub struct IncrementalHasher<I: ContentId> {
    state: I::State,
    len: u64,
}

impl<I: ContentId> IncrementalHasher<I> {
    /// Create a new incremental hasher.
    pub fn new() -> Self {
        Self {
            state: I::State::default(),
            len: 0,
        }
    }

    /// Feed more content.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
        self.len += data.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if nothing has been hashed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finalize and return the identifier.
    pub fn finalize(self) -> I {
        self.state.finalize()
    }
}

impl<I: ContentId> Default for IncrementalHasher<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ContentId> io::Write for IncrementalHasher<I> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Blake3Id, Md5Id};

    #[test]
    fn chunks_match_single_shot() {
        let mut hasher = IncrementalHasher::<Md5Id>::new();
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(hasher.len(), 5);
        assert_eq!(hasher.finalize(), Md5Id::digest(b"hello"));
    }

    #[test]
    fn write_impl_feeds_digest() {
        let data = b"written through io::Write".to_vec();
        let mut hasher = IncrementalHasher::<Blake3Id>::default();
        std::io::copy(&mut data.as_slice(), &mut hasher).unwrap();
        assert_eq!(hasher.finalize(), Blake3Id::digest(&data));
    }

    #[test]
    fn empty_hasher() {
        let hasher = IncrementalHasher::<Md5Id>::new();
        assert!(hasher.is_empty());
        assert_eq!(hasher.finalize(), Md5Id::digest(b""));
    }
}
