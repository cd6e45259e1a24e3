//! Error types for jfif-io

use crate::marker::Marker;
use std::{fmt, io};

/// Result type for jfif-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning, encoding or editing JPEG segments
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// The stream did not begin with a start-of-image marker
    #[error("Invalid JPEG: expected FF D8, found {found:02X?}")]
    InvalidHeader { found: [u8; 2] },

    /// A segment declared a length smaller than its own length field
    #[error("Short segment at offset {offset}: declared length {length}")]
    ShortSegment { offset: u64, length: u16 },

    /// A seek from the start or end (or backwards) was requested on a forward-only stream
    #[error("Unseekable stream")]
    UnseekableStream,

    /// An operation was attempted on a segment whose marker doesn't support it
    #[error("Wrong marker: {0}")]
    WrongMarker(Marker),

    /// The update target isn't part of the editor's index
    #[error("Unknown segment {marker} at offset {offset}")]
    UnknownSegment { offset: u64, marker: Marker },

    /// Not enough room to replace a segment payload in place
    #[error("Oversize payload: {size} bytes (available: {available})")]
    OversizePayload { size: usize, available: usize },

    /// Segment data doesn't fit in the 16-bit length field
    #[error("Oversize segment: {size} bytes of data (max: {})", crate::MAX_PAYLOAD_SIZE)]
    OversizeSegment { size: usize },

    /// The file on disk no longer matches the index captured at open
    #[error("Stale segment index: file changed at offset {offset}")]
    StaleIndex { offset: u64 },

    /// Malformed segment contents
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: u64, reason: String },
}

impl Error {
    /// True when the error is an unexpected end of input
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Payload carried inside `io::Error` by [`crate::ForwardReader`] so the
/// condition survives the `std::io::Seek` signature.
#[derive(Debug)]
pub(crate) struct Unseekable;

impl fmt::Display for Unseekable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("seek from start or end on a forward-only stream")
    }
}

impl std::error::Error for Unseekable {}

impl Unseekable {
    pub(crate) fn into_io() -> io::Error {
        io::Error::new(io::ErrorKind::Unsupported, Unseekable)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<Unseekable>()) {
            return Error::UnseekableStream;
        }
        Error::Io(err)
    }
}
