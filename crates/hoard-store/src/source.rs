use std::fmt;
use std::io::{Read, Seek};

/// A reader that can also be repositioned.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Content handed to [`ContentStore::store`](crate::ContentStore::store).
///
/// The variant is the capability check: a seekable source is hashed in one
/// pass and rewound to be persisted, a single-pass stream is buffered first
/// because its identifier is unknown until it has been read to the end.
/// Both produce identical objects for identical content.
pub enum Source<'a> {
    /// Replayable content. Reading starts at the current position.
    Seekable(&'a mut dyn ReadSeek),
    /// Single-pass content.
    Stream(&'a mut dyn Read),
}

impl<'a> Source<'a> {
    /// Wrap a replayable reader.
    pub fn seekable<R: Read + Seek>(reader: &'a mut R) -> Self {
        Self::Seekable(reader)
    }

    /// Wrap a single-pass reader.
    pub fn stream<R: Read>(reader: &'a mut R) -> Self {
        Self::Stream(reader)
    }

    /// Returns `true` if the source can be rewound.
    pub fn is_seekable(&self) -> bool {
        matches!(self, Self::Seekable(_))
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seekable(_) => f.write_str("Source::Seekable"),
            Self::Stream(_) => f.write_str("Source::Stream"),
        }
    }
}
