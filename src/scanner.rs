//! Segment scanner
//!
//! Walks the marker structure of a JPEG stream from SOI through SOS. The
//! marker search matches what libjpeg (and decoders that follow it) accept:
//! stray bytes before a `0xFF` are skipped, `FF 00` stuffing is discarded and
//! runs of `0xFF` fill bytes collapse onto the marker that follows them.

use crate::{
    error::{Error, Result, Unseekable},
    marker::Marker,
    segment::{Pointer, Segment},
};
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, trace};
use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Segments,
    Done,
}

/// Incremental reader of segment boundaries.
///
/// The scanner owns advancement: each call hands back a complete pointer or
/// segment and leaves the source at the next marker. After the SOS segment is
/// returned the scanner is finished and the source sits on the first byte of
/// entropy-coded data.
///
/// Offsets are relative to the source position when the scanner was created.
pub struct Scanner<R> {
    source: R,
    position: u64,
    state: State,
}

impl<R: Read + Seek> Scanner<R> {
    /// Create a scanner positioned at the start of a JPEG stream
    pub fn new(source: R) -> Self {
        Self {
            source,
            position: 0,
            state: State::Start,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once SOS has been returned or a fatal error occurred
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// Access the underlying source
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Recover the underlying source
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Next segment location, skipping its payload
    pub fn next_pointer(&mut self) -> Result<Option<Pointer>> {
        let Some(pointer) = self.next_header()? else {
            return Ok(None);
        };

        let skip = pointer.payload_len() as u64;
        if skip > 0 {
            self.source.seek(SeekFrom::Current(skip as i64))?;
            self.position += skip;
        }

        self.finish(&pointer);
        Ok(Some(pointer))
    }

    /// Next segment with its payload read into an owned buffer
    pub fn next_segment(&mut self) -> Result<Option<Segment>> {
        let Some(pointer) = self.next_header()? else {
            return Ok(None);
        };

        let data = match pointer.length {
            Some(_) => {
                let mut data = vec![0u8; pointer.payload_len()];
                self.source.read_exact(&mut data)?;
                self.position += data.len() as u64;
                Some(data)
            }
            None => None,
        };

        self.finish(&pointer);
        Ok(Some(Segment { pointer, data }))
    }

    fn finish(&mut self, pointer: &Pointer) {
        trace!(
            "segment {} at {} (length {:?})",
            pointer.marker,
            pointer.offset,
            pointer.length
        );
        if pointer.marker == Marker::SOS {
            debug!("reached SOS, image data starts at {}", self.position);
            self.state = State::Done;
        }
    }

    /// Locate the next marker and read its length field.
    ///
    /// Leaves the source on the first payload byte.
    fn next_header(&mut self) -> Result<Option<Pointer>> {
        match self.state {
            State::Done => return Ok(None),
            State::Start => {
                // Any failure from here on ends the scan
                self.state = State::Done;
                let mut magic = Vec::with_capacity(2);
                (&mut self.source).take(2).read_to_end(&mut magic)?;
                self.position += magic.len() as u64;
                if magic != [0xFF, Marker::SOI.byte()] {
                    let mut found = [0u8; 2];
                    found[..magic.len()].copy_from_slice(&magic);
                    return Err(Error::InvalidHeader { found });
                }
                self.state = State::Segments;
                return Ok(Some(Pointer::standalone(0, Marker::SOI)));
            }
            State::Segments => {}
        }

        match self.read_header() {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                self.state = State::Done;
                Err(e)
            }
        }
    }

    fn read_header(&mut self) -> Result<Pointer> {
        let marker = loop {
            let mut sentinel = self.read_byte()?;
            let mut marker = self.read_byte()?;

            let mut stray = 0u64;
            while sentinel != 0xFF {
                sentinel = marker;
                marker = self.read_byte()?;
                stray += 1;
            }
            if stray > 0 {
                debug!(
                    "skipped {} bytes of extraneous data before offset {}",
                    stray,
                    self.position - 2
                );
            }

            if marker == 0x00 {
                debug!("discarding stuffed FF 00 at {}", self.position - 2);
                continue;
            }

            let mut fill = 0u64;
            while marker == 0xFF {
                marker = self.read_byte()?;
                fill += 1;
            }
            if fill > 0 {
                debug!("skipped {} fill bytes before offset {}", fill, self.position - 2);
            }

            break Marker(marker);
        };

        let offset = self.position - 2;
        if !marker.has_length() {
            return Ok(Pointer::standalone(offset, marker));
        }

        let length = self.source.read_u16::<BigEndian>()?;
        self.position += 2;
        if length < 2 {
            return Err(Error::ShortSegment { offset, length });
        }
        Ok(Pointer::new(offset, marker, length))
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = self.source.read_u8()?;
        self.position += 1;
        Ok(byte)
    }
}

/// A failed scan together with everything collected before the failure
#[derive(Debug)]
pub struct PartialScan<T> {
    /// Pointers or segments read before the error
    pub items: Vec<T>,
    /// What stopped the scan
    pub error: Error,
}

impl<T> fmt::Display for PartialScan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} segments)", self.error, self.items.len())
    }
}

impl<T: fmt::Debug> std::error::Error for PartialScan<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<PartialScan<T>> for Error {
    fn from(partial: PartialScan<T>) -> Self {
        partial.error
    }
}

/// Result of a batch scan: all items through SOS, or the partial list and the error
pub type ScanResult<T> = std::result::Result<Vec<T>, PartialScan<T>>;

fn collect<T>(mut next: impl FnMut() -> Result<Option<T>>) -> ScanResult<T> {
    let mut items = Vec::new();
    loop {
        match next() {
            Ok(Some(item)) => items.push(item),
            Ok(None) => return Ok(items),
            Err(error) => return Err(PartialScan { items, error }),
        }
    }
}

/// Find segment locations through SOS without reading payloads.
///
/// Use [`ForwardReader`] to scan a stream that can't seek.
pub fn scan_segments<R: Read + Seek>(source: &mut R) -> ScanResult<Pointer> {
    let mut scanner = Scanner::new(source);
    let result = collect(|| scanner.next_pointer());
    if let Ok(pointers) = &result {
        debug!("scanned {} segments", pointers.len());
    }
    result
}

/// Read segments and payloads through SOS.
///
/// On success the source is positioned at the start of the entropy-coded data.
pub fn decode_segments<R: Read + Seek>(source: &mut R) -> ScanResult<Segment> {
    let mut scanner = Scanner::new(source);
    let result = collect(|| scanner.next_segment());
    if let Ok(segments) = &result {
        debug!("decoded {} segments", segments.len());
    }
    result
}

/// Adds a forward-only [`Seek`] to any reader.
///
/// Relative forward seeks discard bytes; `SeekFrom::Current(0)` reports the
/// position. Anything else fails with [`Error::UnseekableStream`] once
/// converted into the crate error.
pub struct ForwardReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> ForwardReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes read or skipped so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ForwardReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> Seek for ForwardReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Current(n) if n >= 0 => {
                let wanted = n as u64;
                let skipped = io::copy(&mut (&mut self.inner).take(wanted), &mut io::sink())?;
                self.position += skipped;
                if skipped < wanted {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                Ok(self.position)
            }
            _ => Err(Unseekable::into_io()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{baseline_jpeg, JpegBuilder, BASELINE_LAYOUT};
    use std::io::Cursor;

    fn markers(pointers: &[Pointer]) -> Vec<Marker> {
        pointers.iter().map(|p| p.marker).collect()
    }

    #[test]
    fn test_scan_minimal() {
        let data = JpegBuilder::new()
            .segment(Marker::DQT, &[0u8; 65])
            .segment(Marker::SOS, &[1, 1, 0, 0, 63, 0])
            .scan_data(&[0x12, 0x34])
            .eoi()
            .build();
        let mut source = Cursor::new(data);

        let pointers = scan_segments(&mut source).unwrap();
        assert_eq!(
            pointers,
            vec![
                Pointer::standalone(0, Marker::SOI),
                Pointer::new(2, Marker::DQT, 67),
                Pointer::new(71, Marker::SOS, 8),
            ]
        );
        // Left on the first entropy-coded byte
        assert_eq!(source.position(), 81);
    }

    #[test]
    fn test_scan_and_decode_agree() {
        let data = baseline_jpeg();

        let pointers = scan_segments(&mut Cursor::new(&data)).unwrap();
        let segments = decode_segments(&mut Cursor::new(&data)).unwrap();

        assert_eq!(pointers.len(), BASELINE_LAYOUT.len());
        assert_eq!(pointers.len(), segments.len());
        for ((pointer, segment), &(marker, size)) in
            pointers.iter().zip(&segments).zip(BASELINE_LAYOUT)
        {
            assert_eq!(*pointer, segment.pointer);
            assert_eq!(pointer.marker, marker);
            assert_eq!(segment.payload().len(), size);
        }
    }

    #[test]
    fn test_fill_bytes_are_skipped() {
        let data = JpegBuilder::new()
            .segment(Marker::APP0, b"JFIF\0")
            .fill_bytes(3)
            .segment(Marker::SOS, &[0; 4])
            .build();

        let pointers = scan_segments(&mut Cursor::new(data)).unwrap();
        assert_eq!(markers(&pointers), [Marker::SOI, Marker::APP0, Marker::SOS]);
        // APP0 ends at 11; three fill bytes come before the real 0xFF
        assert_eq!(pointers[2].offset, 14);
    }

    #[test]
    fn test_extraneous_bytes_are_skipped() {
        let data = JpegBuilder::new()
            .segment(Marker::COM, b"x")
            .raw(&[0x00, 0x12, 0x34])
            .segment(Marker::SOS, &[0; 4])
            .build();

        let pointers = scan_segments(&mut Cursor::new(data)).unwrap();
        assert_eq!(markers(&pointers), [Marker::SOI, Marker::COM, Marker::SOS]);
        assert_eq!(pointers[2].offset, 2 + 5 + 3);
    }

    #[test]
    fn test_stuffed_zero_is_discarded() {
        let data = JpegBuilder::new()
            .raw(&[0xFF, 0x00])
            .segment(Marker::SOS, &[0; 4])
            .build();

        let pointers = scan_segments(&mut Cursor::new(data)).unwrap();
        assert_eq!(markers(&pointers), [Marker::SOI, Marker::SOS]);
        assert_eq!(pointers[1].offset, 4);
    }

    #[test]
    fn test_standalone_markers_before_sos() {
        let data = JpegBuilder::new()
            .standalone(Marker::RST3)
            .standalone(Marker::TEM)
            .segment(Marker::SOS, &[0; 4])
            .build();

        let segments = decode_segments(&mut Cursor::new(data)).unwrap();
        assert_eq!(segments[1].pointer, Pointer::standalone(2, Marker::RST3));
        assert_eq!(segments[1].data, None);
        assert_eq!(segments[2].pointer, Pointer::standalone(4, Marker::TEM));
        assert_eq!(segments[3].pointer, Pointer::new(6, Marker::SOS, 6));
    }

    #[test]
    fn test_invalid_header() {
        for data in [vec![0x89, b'P', b'N', b'G'], vec![0xFF, 0xD9], vec![0xFF], vec![]] {
            let err = scan_segments(&mut Cursor::new(&data)).unwrap_err();
            assert!(err.items.is_empty());
            assert!(matches!(err.error, Error::InvalidHeader { .. }), "{data:?}");

            let err = decode_segments(&mut Cursor::new(&data)).unwrap_err();
            assert!(err.items.is_empty());
            assert!(matches!(err.error, Error::InvalidHeader { .. }));
        }
    }

    #[test]
    fn test_short_segment() {
        for length in [0u8, 1] {
            let data = JpegBuilder::new()
                .segment(Marker::APP0, b"JFIF\0")
                .raw(&[0xFF, 0xDB, 0x00, length])
                .build();

            let err = scan_segments(&mut Cursor::new(&data)).unwrap_err();
            assert!(matches!(
                err.error,
                Error::ShortSegment { offset: 11, length: l } if l == length as u16
            ));
            assert_eq!(markers(&err.items), [Marker::SOI, Marker::APP0]);

            let err = decode_segments(&mut Cursor::new(&data)).unwrap_err();
            assert!(matches!(err.error, Error::ShortSegment { .. }));
            assert_eq!(err.items.len(), 2);
        }
    }

    #[test]
    fn test_eof_before_sos_keeps_partial() {
        let mut data = JpegBuilder::new()
            .segment(Marker::APP1, b"Exif\0\0MM")
            .segment(Marker::DQT, &[0u8; 65])
            .build();
        data.truncate(data.len() - 10);

        // Pointer mode seeks over the truncated payload, then hits EOF
        let err = scan_segments(&mut Cursor::new(&data)).unwrap_err();
        assert!(err.error.is_eof());
        assert_eq!(markers(&err.items), [Marker::SOI, Marker::APP1, Marker::DQT]);

        // Full mode fails while reading the DQT payload
        let err = decode_segments(&mut Cursor::new(&data)).unwrap_err();
        assert!(err.error.is_eof());
        assert_eq!(err.items.len(), 2);
        assert_eq!(err.items[1].payload(), b"Exif\0\0MM");
    }

    #[test]
    fn test_scanner_stops_after_sos() {
        let data = baseline_jpeg();
        let mut scanner = Scanner::new(Cursor::new(data));
        let mut count = 0;
        while let Some(pointer) = scanner.next_pointer().unwrap() {
            count += 1;
            if pointer.marker == Marker::SOS {
                assert!(scanner.is_finished());
            }
        }
        assert_eq!(count, BASELINE_LAYOUT.len());
        assert_eq!(scanner.next_pointer().unwrap(), None);
        assert_eq!(scanner.get_mut().position(), scanner.position());
    }

    #[test]
    fn test_forward_reader_scan() {
        let data = baseline_jpeg();
        let expected = scan_segments(&mut Cursor::new(&data)).unwrap();

        let mut reader = ForwardReader::new(&data[..]);
        let pointers = scan_segments(&mut reader).unwrap();
        assert_eq!(pointers, expected);

        let sos = pointers.last().unwrap();
        assert_eq!(reader.position(), sos.end_offset());
    }

    #[test]
    fn test_forward_reader_rejects_absolute_seeks() {
        let mut reader = ForwardReader::new(&[1u8, 2, 3, 4][..]);
        assert_eq!(reader.stream_position().unwrap(), 0);
        assert_eq!(reader.seek(SeekFrom::Current(2)).unwrap(), 2);
        assert_eq!(reader.read_u8().unwrap(), 3);

        for pos in [SeekFrom::Start(0), SeekFrom::End(0), SeekFrom::Current(-1)] {
            let err: Error = reader.seek(pos).unwrap_err().into();
            assert!(matches!(err, Error::UnseekableStream));
        }

        // Seeking past the end of a stream is an error, unlike on files
        let err: Error = reader.seek(SeekFrom::Current(5)).unwrap_err().into();
        assert!(err.is_eof());
    }

    #[test]
    fn test_pointer_load_matches_decode() {
        let data = baseline_jpeg();
        let mut source = Cursor::new(&data);
        let pointers = scan_segments(&mut source).unwrap();
        let segments = decode_segments(&mut Cursor::new(&data)).unwrap();

        for (pointer, segment) in pointers.iter().zip(&segments) {
            assert_eq!(&pointer.load(&mut source).unwrap(), segment);
        }
    }
}
