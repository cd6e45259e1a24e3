//! Extended XMP envelope
//!
//! An XMP packet larger than one APP1 segment is stored as a short main packet
//! (standard XMP signature) that names a GUID in `xmpNote:HasExtendedXMP`, plus
//! any number of extension segments. Each extension payload starts with the
//! extension signature and a 40 byte header:
//!
//! - GUID: 32 ASCII hex digits, the MD5 of the full extended packet
//! - full length of the extended packet (u32, big-endian)
//! - offset of this chunk within it (u32, big-endian)
//!
//! Only the envelope is handled here; the XML itself is opaque.

use crate::{
    error::{Error, Result},
    marker::Marker,
    segment::{Segment, MAX_PAYLOAD_SIZE},
    signature::{self, EXTENDED_XMP, XMP},
};
use byteorder::{BigEndian, ByteOrder};
use log::debug;
use std::borrow::Cow;

/// Largest extended packet that will be reassembled
pub const MAX_EXTENDED_XMP_SIZE: u32 = 100 * 1024 * 1024; // 100 MB

const GUID_LEN: usize = 32;

/// GUID + full length + offset
pub const CHUNK_HEADER_SIZE: usize = GUID_LEN + 4 + 4;

/// Largest packet that fits in a single standard XMP segment
pub const MAX_MAIN_XMP_SIZE: usize = MAX_PAYLOAD_SIZE - XMP.prefix.len();

/// Largest chunk of extended data per extension segment
pub const MAX_CHUNK_SIZE: usize = MAX_PAYLOAD_SIZE - EXTENDED_XMP.prefix.len() - CHUNK_HEADER_SIZE;

const HAS_EXTENDED_XMP: &[u8] = b"xmpNote:HasExtendedXMP";

/// One extension segment's header and data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedXmpChunk<'a> {
    pub guid: [u8; GUID_LEN],
    /// Length of the complete extended packet
    pub full_length: u32,
    /// Where `data` starts within the complete packet
    pub offset: u32,
    pub data: &'a [u8],
}

impl<'a> ExtendedXmpChunk<'a> {
    /// Parse the bytes following the extension signature
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        Self::parse_at(payload, 0)
    }

    /// Parse an APP1 segment if it carries an extension chunk
    pub fn from_segment(segment: &'a Segment) -> Result<Option<Self>> {
        if segment.marker() != Marker::APP1 {
            return Ok(None);
        }
        match signature::match_signature(Marker::APP1, segment.payload())? {
            Some(found) if *found.signature == EXTENDED_XMP => {
                Self::parse_at(found.payload, segment.pointer.offset).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn parse_at(payload: &'a [u8], offset: u64) -> Result<Self> {
        if payload.len() < CHUNK_HEADER_SIZE {
            return Err(Error::InvalidSegment {
                offset,
                reason: format!(
                    "Extended XMP header needs {} bytes, found {}",
                    CHUNK_HEADER_SIZE,
                    payload.len()
                ),
            });
        }

        let mut guid = [0u8; GUID_LEN];
        guid.copy_from_slice(&payload[..GUID_LEN]);
        Ok(Self {
            guid,
            full_length: BigEndian::read_u32(&payload[GUID_LEN..GUID_LEN + 4]),
            offset: BigEndian::read_u32(&payload[GUID_LEN + 4..CHUNK_HEADER_SIZE]),
            data: &payload[CHUNK_HEADER_SIZE..],
        })
    }

    /// GUID as text, lossy for non-ASCII bytes
    pub fn guid_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.guid)
    }
}

/// Find the GUID a main XMP packet declares in `xmpNote:HasExtendedXMP`.
///
/// Both the attribute and the element form are recognized.
pub fn extended_xmp_guid(xmp: &[u8]) -> Option<String> {
    let start = xmp
        .windows(HAS_EXTENDED_XMP.len())
        .position(|w| w == HAS_EXTENDED_XMP)?
        + HAS_EXTENDED_XMP.len();

    let rest = &xmp[start..];
    let skip = rest
        .iter()
        .position(|&b| !matches!(b, b'=' | b'"' | b'\'' | b'>' | b' '))?;
    let value = rest.get(skip..skip + GUID_LEN)?;
    value
        .iter()
        .all(u8::is_ascii_hexdigit)
        .then(|| String::from_utf8_lossy(value).into_owned())
}

/// Reassemble the extended packet identified by `guid` from its chunks.
///
/// Chunks may appear in any order and other segments are ignored. Returns
/// `Ok(None)` when no chunk carries the GUID. Gaps left by missing chunks stay
/// zero-filled.
pub fn reassemble_extended_xmp(segments: &[Segment], guid: &str) -> Result<Option<Vec<u8>>> {
    let mut packet: Option<Vec<u8>> = None;

    for segment in segments {
        let Some(chunk) = ExtendedXmpChunk::from_segment(segment)? else {
            continue;
        };
        if chunk.guid.as_slice() != guid.as_bytes() {
            continue;
        }

        let at = segment.pointer.offset;
        if chunk.full_length > MAX_EXTENDED_XMP_SIZE {
            return Err(Error::InvalidSegment {
                offset: at,
                reason: format!(
                    "Extended XMP too large: {} bytes (max {} MB)",
                    chunk.full_length,
                    MAX_EXTENDED_XMP_SIZE / (1024 * 1024)
                ),
            });
        }

        let buf = packet.get_or_insert_with(|| vec![0u8; chunk.full_length as usize]);
        if buf.len() != chunk.full_length as usize {
            return Err(Error::InvalidSegment {
                offset: at,
                reason: format!(
                    "Extended XMP length {} disagrees with earlier chunk ({})",
                    chunk.full_length,
                    buf.len()
                ),
            });
        }

        let start = chunk.offset as usize;
        let end = start + chunk.data.len();
        if end > buf.len() {
            return Err(Error::InvalidSegment {
                offset: at,
                reason: format!(
                    "Extended XMP chunk {}..{} overruns declared length {}",
                    start,
                    end,
                    buf.len()
                ),
            });
        }
        buf[start..end].copy_from_slice(chunk.data);
    }

    if let Some(buf) = &packet {
        debug!("reassembled {} bytes of extended XMP {}", buf.len(), guid);
    }
    Ok(packet)
}

/// Split an XMP packet into APP1 segments.
///
/// A packet that fits is returned as a single standard XMP segment. Larger
/// packets become a main packet pointing at the extension plus as many
/// extension chunks as needed, all keyed by the upper-case MD5 of `xmp`.
pub fn extended_xmp_segments(xmp: &[u8]) -> Result<Vec<Segment>> {
    if xmp.len() <= MAX_MAIN_XMP_SIZE {
        return Ok(vec![xmp_segment(&XMP, &[xmp])]);
    }

    if xmp.len() > MAX_EXTENDED_XMP_SIZE as usize {
        return Err(Error::InvalidSegment {
            offset: 0,
            reason: format!(
                "Extended XMP too large: {} bytes (max {} MB)",
                xmp.len(),
                MAX_EXTENDED_XMP_SIZE / (1024 * 1024)
            ),
        });
    }

    let guid = format!("{:032X}", md5::compute(xmp));
    let main = format!(
        r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
      xmlns:xmpNote="http://ns.adobe.com/xmp/note/"
      xmpNote:HasExtendedXMP="{guid}"/>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    );

    let full_length = (xmp.len() as u32).to_be_bytes();
    let mut segments = vec![xmp_segment(&XMP, &[main.as_bytes()])];
    for (i, chunk) in xmp.chunks(MAX_CHUNK_SIZE).enumerate() {
        let offset = ((i * MAX_CHUNK_SIZE) as u32).to_be_bytes();
        segments.push(xmp_segment(
            &EXTENDED_XMP,
            &[guid.as_bytes(), &full_length, &offset, chunk],
        ));
    }

    debug!(
        "split {} bytes of XMP into {} extension segments",
        xmp.len(),
        segments.len() - 1
    );
    Ok(segments)
}

fn xmp_segment(sig: &signature::Signature, parts: &[&[u8]]) -> Segment {
    let mut data = sig.prefix.to_vec();
    for part in parts {
        data.extend_from_slice(part);
    }
    Segment::new(Marker::APP1, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(len: usize) -> Vec<u8> {
        let mut xmp = b"<x:xmpmeta>".to_vec();
        xmp.extend((0..len.saturating_sub(xmp.len())).map(|i| b'a' + (i % 26) as u8));
        xmp
    }

    #[test]
    fn test_parse_header() {
        let mut payload = b"0123456789ABCDEF0123456789ABCDEF".to_vec();
        payload.extend_from_slice(&1000u32.to_be_bytes());
        payload.extend_from_slice(&500u32.to_be_bytes());
        payload.extend_from_slice(b"chunk");

        let chunk = ExtendedXmpChunk::parse(&payload).unwrap();
        assert_eq!(chunk.guid_str(), "0123456789ABCDEF0123456789ABCDEF");
        assert_eq!(chunk.full_length, 1000);
        assert_eq!(chunk.offset, 500);
        assert_eq!(chunk.data, b"chunk");
    }

    #[test]
    fn test_parse_short_header() {
        let err = ExtendedXmpChunk::parse(&[b'0'; 39]).unwrap_err();
        assert!(matches!(err, Error::InvalidSegment { .. }));
    }

    #[test]
    fn test_small_packet_single_segment() {
        let xmp = packet(1000);
        let segments = extended_xmp_segments(&xmp).unwrap();
        assert_eq!(segments.len(), 1);

        let found = segments[0].app_payload().unwrap().unwrap();
        assert_eq!(*found.signature, XMP);
        assert_eq!(found.payload, xmp.as_slice());
    }

    #[test]
    fn test_split_and_reassemble() {
        let xmp = packet(200_000);
        let segments = extended_xmp_segments(&xmp).unwrap();
        // main + ceil(200000 / MAX_CHUNK_SIZE)
        assert_eq!(segments.len(), 1 + 200_000usize.div_ceil(MAX_CHUNK_SIZE));
        for segment in &segments {
            segment.to_bytes().unwrap();
        }

        let main = segments[0].app_payload().unwrap().unwrap();
        assert_eq!(*main.signature, XMP);
        let guid = extended_xmp_guid(main.payload).unwrap();
        assert_eq!(guid, format!("{:032X}", md5::compute(&xmp)));

        // Order doesn't matter
        let mut shuffled = segments.clone();
        shuffled.reverse();
        let rebuilt = reassemble_extended_xmp(&shuffled, &guid).unwrap().unwrap();
        assert_eq!(rebuilt, xmp);

        assert_eq!(
            reassemble_extended_xmp(&segments, "00000000000000000000000000000000").unwrap(),
            None
        );
    }

    #[test]
    fn test_guid_element_form() {
        let xmp = b"<xmpNote:HasExtendedXMP>0123456789abcdef0123456789abcdef</xmpNote:HasExtendedXMP>";
        assert_eq!(
            extended_xmp_guid(xmp).as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(extended_xmp_guid(b"<x:xmpmeta/>"), None);
        assert_eq!(extended_xmp_guid(b"xmpNote:HasExtendedXMP=\"short\""), None);
    }

    fn chunk_segment(guid: &[u8], full_length: u32, offset: u32, data: &[u8]) -> Segment {
        xmp_segment(
            &EXTENDED_XMP,
            &[guid, &full_length.to_be_bytes(), &offset.to_be_bytes(), data],
        )
    }

    #[test]
    fn test_reassemble_rejects_overrun() {
        let guid = [b'A'; 32];
        let segments = vec![chunk_segment(&guid, 10, 8, b"abcd")];
        let err = reassemble_extended_xmp(&segments, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").unwrap_err();
        assert!(matches!(err, Error::InvalidSegment { .. }));
    }

    #[test]
    fn test_reassemble_rejects_huge_length() {
        let guid = [b'B'; 32];
        let segments = vec![chunk_segment(&guid, MAX_EXTENDED_XMP_SIZE + 1, 0, b"x")];
        let err = reassemble_extended_xmp(&segments, "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB").unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_reassemble_rejects_inconsistent_length() {
        let guid = [b'C'; 32];
        let segments = vec![
            chunk_segment(&guid, 8, 0, b"abcd"),
            chunk_segment(&guid, 9, 4, b"efgh"),
        ];
        let err = reassemble_extended_xmp(&segments, "CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC").unwrap_err();
        assert!(matches!(err, Error::InvalidSegment { .. }));
    }
}
