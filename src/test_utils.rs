//! Test utilities for building synthetic JPEG files.
//!
//! Fixtures are generated rather than committed: [`JpegBuilder`] writes the
//! marker structure byte by byte, including the irregularities (fill bytes,
//! stray bytes) real files contain.
//!
//! # Usage
//!
//! ```
//! use jfif_io::{test_utils::JpegBuilder, Marker};
//!
//! let jpeg = JpegBuilder::new()
//!     .segment(Marker::COM, b"hello")
//!     .segment(Marker::SOS, &[1, 1, 0, 0, 63, 0])
//!     .scan_data(&[0x12, 0x34])
//!     .eoi()
//!     .build();
//! assert_eq!(&jpeg[..4], &[0xFF, 0xD8, 0xFF, 0xFE]);
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::{marker::Marker, signature, Result};

/// Marker and payload size of each segment in [`baseline_jpeg`], SOI through SOS.
///
/// Matches the header of a typical camera JPEG with Exif and XMP.
pub const BASELINE_LAYOUT: &[(Marker, usize)] = &[
    (Marker::SOI, 0),
    (Marker::APP0, 14),
    (Marker::APP1, 11308),
    (Marker::APP1, 5023),
    (Marker::DQT, 65),
    (Marker::DQT, 65),
    (Marker::SOF0, 15),
    (Marker::DHT, 29),
    (Marker::DHT, 79),
    (Marker::DHT, 28),
    (Marker::DHT, 72),
    (Marker::SOS, 10),
];

/// Byte-level JPEG writer for tests
#[derive(Debug, Clone)]
pub struct JpegBuilder {
    bytes: Vec<u8>,
}

impl Default for JpegBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegBuilder {
    /// Start a file with SOI
    pub fn new() -> Self {
        Self {
            bytes: vec![0xFF, Marker::SOI.byte()],
        }
    }

    /// Append a segment with a length field
    pub fn segment(mut self, marker: Marker, payload: &[u8]) -> Self {
        let length = u16::try_from(payload.len() + 2).unwrap_or(u16::MAX);
        self.bytes.extend_from_slice(&[0xFF, marker.byte()]);
        self.bytes.extend_from_slice(&length.to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append an APPn segment starting with `sig`, padded with filler to `size` bytes
    pub fn app(self, sig: &signature::Signature, size: usize) -> Self {
        let mut payload = sig.prefix.to_vec();
        payload.extend(filler(size.saturating_sub(payload.len()), sig.marker.byte()));
        payload.truncate(size);
        self.segment(sig.marker, &payload)
    }

    /// Append a segment whose payload is `size` bytes of filler
    pub fn sized(self, marker: Marker, size: usize) -> Self {
        let payload: Vec<u8> = filler(size, marker.byte()).collect();
        self.segment(marker, &payload)
    }

    /// Append a marker without a length field
    pub fn standalone(mut self, marker: Marker) -> Self {
        self.bytes.extend_from_slice(&[0xFF, marker.byte()]);
        self
    }

    /// Append `count` 0xFF fill bytes
    pub fn fill_bytes(mut self, count: usize) -> Self {
        self.bytes.resize(self.bytes.len() + count, 0xFF);
        self
    }

    /// Append bytes verbatim
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Append entropy-coded data (written verbatim; callers stuff 0xFF bytes)
    pub fn scan_data(self, data: &[u8]) -> Self {
        self.raw(data)
    }

    pub fn eoi(self) -> Self {
        self.standalone(Marker::EOI)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Deterministic payload bytes; 0xFF values are included on purpose
fn filler(len: usize, seed: u8) -> impl Iterator<Item = u8> {
    (0..len).map(move |i| (i as u8).wrapping_mul(31).wrapping_add(seed))
}

/// A complete baseline JPEG with the segment layout in [`BASELINE_LAYOUT`],
/// followed by entropy-coded data containing stuffed bytes and restart markers.
pub fn baseline_jpeg() -> Vec<u8> {
    let mut jfif = signature::JFIF.prefix.to_vec();
    // v1.01, aspect ratio 1:1, no thumbnail
    jfif.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);

    let mut xmp = signature::XMP.prefix.to_vec();
    xmp.extend_from_slice(b"<?xpacket begin=\"\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>");
    xmp.resize(5023, b' ');

    let mut dqt = vec![0x00];
    dqt.extend(1..=64u8);

    let sof0 = [8, 0x01, 0xE0, 0x02, 0x80, 3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1];
    let sos = [3, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0];

    JpegBuilder::new()
        .segment(Marker::APP0, &jfif)
        .app(&signature::EXIF, 11308)
        .segment(Marker::APP1, &xmp)
        .segment(Marker::DQT, &dqt)
        .segment(Marker::DQT, &dqt)
        .segment(Marker::SOF0, &sof0)
        .sized(Marker::DHT, 29)
        .sized(Marker::DHT, 79)
        .sized(Marker::DHT, 28)
        .sized(Marker::DHT, 72)
        .segment(Marker::SOS, &sos)
        .scan_data(&[0xF8, 0xA2, 0xFF, 0x00, 0x8A, 0x28])
        .standalone(Marker::RST0)
        .scan_data(&[0x3F, 0xFF, 0x00, 0xFF, 0x00, 0x01])
        .eoi()
        .build()
}

/// Write `bytes` to `name` inside `dir`, returning the full path
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Write `bytes` to a file in a fresh temporary directory.
///
/// The directory is removed when the returned guard drops.
pub fn write_temp(bytes: &[u8]) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = write_fixture(dir.path(), "image.jpg", bytes)?;
    Ok((dir, path))
}
