//! Segment types, location tracking and encoding

use crate::{
    error::{Error, Result},
    marker::Marker,
    signature::{self, AppPayload},
};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

/// Largest value the 16-bit length field can hold
pub const MAX_SEGMENT_LENGTH: usize = u16::MAX as usize;

/// Largest payload a single segment can carry (the length counts its own 2 bytes)
pub const MAX_PAYLOAD_SIZE: usize = MAX_SEGMENT_LENGTH - 2;

/// Location of a segment in a stream, without its payload.
///
/// `offset` is the address of the `0xFF` byte that precedes the marker.
/// `length` is the big-endian value stored after the marker, which includes
/// the two bytes of the field itself. Standalone markers (SOI, EOI, RSTn, TEM)
/// have no length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer {
    /// Offset of the leading 0xFF byte
    pub offset: u64,
    /// Segment type
    pub marker: Marker,
    /// Length field, inclusive of its own 2 bytes
    pub length: Option<u16>,
}

impl Pointer {
    /// Create a pointer for a segment with a length field
    pub fn new(offset: u64, marker: Marker, length: u16) -> Self {
        Self {
            offset,
            marker,
            length: Some(length),
        }
    }

    /// Create a pointer for a standalone marker
    pub fn standalone(offset: u64, marker: Marker) -> Self {
        Self {
            offset,
            marker,
            length: None,
        }
    }

    /// Number of payload bytes (0 for standalone markers)
    pub fn payload_len(&self) -> usize {
        self.length.map_or(0, |l| (l as usize).saturating_sub(2))
    }

    /// Bytes occupied on disk: 0xFF, marker, and the length field plus payload if present
    pub fn encoded_len(&self) -> u64 {
        2 + self.length.map_or(0, u64::from)
    }

    /// Offset of the first payload byte
    pub fn payload_offset(&self) -> u64 {
        if self.length.is_some() {
            self.offset + 4
        } else {
            self.offset + 2
        }
    }

    /// Offset one past the last byte of this segment
    pub fn end_offset(&self) -> u64 {
        self.offset + self.encoded_len()
    }

    /// Read the payload for this pointer from a random-access source.
    ///
    /// The source is positioned by absolute offset, so it must be the same
    /// stream (or a copy of it) the pointer was scanned from.
    pub fn load<R: Read + Seek>(&self, source: &mut R) -> Result<Segment> {
        if self.length.is_none() {
            return Ok(Segment {
                pointer: *self,
                data: None,
            });
        }

        source.seek(SeekFrom::Start(self.payload_offset()))?;
        let mut data = vec![0u8; self.payload_len()];
        source.read_exact(&mut data)?;
        Ok(Segment {
            pointer: *self,
            data: Some(data),
        })
    }
}

/// A segment with its payload materialized.
///
/// Each segment owns its buffer; segments from one decode pass never share bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Where the segment was found (offset is 0 for segments built in memory)
    pub pointer: Pointer,
    /// Payload bytes after the length field; `None` for standalone markers
    pub data: Option<Vec<u8>>,
}

impl Segment {
    /// Build a segment carrying `data`.
    ///
    /// The pointer length saturates at `u16::MAX` for oversize data; encoding
    /// such a segment fails with [`Error::OversizeSegment`].
    pub fn new(marker: Marker, data: Vec<u8>) -> Self {
        let length = u16::try_from(data.len() + 2).unwrap_or(u16::MAX);
        Self {
            pointer: Pointer::new(0, marker, length),
            data: Some(data),
        }
    }

    /// Build a standalone segment (marker only)
    pub fn standalone(marker: Marker) -> Self {
        Self {
            pointer: Pointer::standalone(0, marker),
            data: None,
        }
    }

    /// Segment type
    pub fn marker(&self) -> Marker {
        self.pointer.marker
    }

    /// Payload bytes, empty for standalone markers
    pub fn payload(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Bytes this segment occupies when encoded
    pub fn encoded_len(&self) -> usize {
        match &self.data {
            Some(data) => 4 + data.len(),
            None => 2,
        }
    }

    /// Match the payload against the signatures registered for this APPn slot.
    ///
    /// Returns `Ok(None)` when no signature matches, and [`Error::WrongMarker`]
    /// when the segment isn't an application segment.
    pub fn app_payload(&self) -> Result<Option<AppPayload<'_>>> {
        signature::match_signature(self.marker(), self.payload())
    }

    /// Encode this segment to `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        encode_segment(writer, self)
    }

    /// Encode this segment into a new buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        encode_segment(&mut buf, self)?;
        Ok(buf)
    }
}

/// Write `0xFF`, the marker and, when the segment has data, its length and payload.
///
/// The size check happens before anything is written.
pub fn encode_segment<W: Write>(writer: &mut W, segment: &Segment) -> Result<()> {
    let length = match &segment.data {
        Some(data) => Some(segment_length(data.len())?),
        None => None,
    };

    writer.write_all(&[0xFF, segment.marker().byte()])?;
    if let (Some(length), Some(data)) = (length, &segment.data) {
        writer.write_u16::<BigEndian>(length)?;
        writer.write_all(data)?;
    }
    Ok(())
}

/// Length field value for a payload of `size` bytes
pub(crate) fn segment_length(size: usize) -> Result<u16> {
    if size > MAX_PAYLOAD_SIZE {
        return Err(Error::OversizeSegment { size });
    }
    Ok((size + 2) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pointer_geometry() {
        let ptr = Pointer::new(20, Marker::DQT, 67);
        assert_eq!(ptr.payload_len(), 65);
        assert_eq!(ptr.encoded_len(), 69);
        assert_eq!(ptr.payload_offset(), 24);
        assert_eq!(ptr.end_offset(), 89);

        let soi = Pointer::standalone(0, Marker::SOI);
        assert_eq!(soi.payload_len(), 0);
        assert_eq!(soi.encoded_len(), 2);
        assert_eq!(soi.end_offset(), 2);
    }

    #[test]
    fn test_encode_with_payload() {
        let seg = Segment::new(Marker::COM, b"hello".to_vec());
        let bytes = seg.to_bytes().unwrap();
        assert_eq!(bytes, [0xFF, 0xFE, 0x00, 0x07, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(seg.encoded_len(), bytes.len());
        assert_eq!(seg.pointer.length, Some(7));
    }

    #[test]
    fn test_encode_standalone() {
        let seg = Segment::standalone(Marker::EOI);
        assert_eq!(seg.to_bytes().unwrap(), [0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_empty_payload_keeps_length() {
        let seg = Segment::new(Marker::APP5, Vec::new());
        assert_eq!(seg.to_bytes().unwrap(), [0xFF, 0xE5, 0x00, 0x02]);
    }

    #[test]
    fn test_encode_limits() {
        let seg = Segment::new(Marker::COM, vec![b'x'; MAX_PAYLOAD_SIZE]);
        let bytes = seg.to_bytes().unwrap();
        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);

        let seg = Segment::new(Marker::COM, vec![b'x'; MAX_PAYLOAD_SIZE + 1]);
        let mut out = Vec::new();
        let err = seg.write_to(&mut out).unwrap_err();
        assert!(matches!(err, Error::OversizeSegment { size } if size == MAX_PAYLOAD_SIZE + 1));
        assert!(out.is_empty(), "nothing written on failure");
    }

    #[test]
    fn test_load_from_pointer() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x05, b'a', b'b', b'c'];
        let mut source = Cursor::new(data);

        let seg = Pointer::new(2, Marker::COM, 5).load(&mut source).unwrap();
        assert_eq!(seg.payload(), b"abc");

        let soi = Pointer::standalone(0, Marker::SOI).load(&mut source).unwrap();
        assert_eq!(soi.data, None);

        // Truncated source
        let err = Pointer::new(2, Marker::COM, 9).load(&mut source).unwrap_err();
        assert!(err.is_eof());
    }
}
