//! Known APPn payload signatures
//!
//! Application segments are identified by a byte prefix at the start of their
//! payload. Each APPn slot has its own ordered candidate list; the first prefix
//! that matches wins.

use crate::{
    error::{Error, Result},
    marker::Marker,
};
use std::borrow::Cow;

/// A registered APPn payload prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    /// APPn slot this signature is registered for
    pub marker: Marker,
    /// Exact leading bytes of the payload
    pub prefix: &'static [u8],
}

impl Signature {
    const fn new(marker: Marker, prefix: &'static [u8]) -> Self {
        Self { marker, prefix }
    }

    /// Display form with trailing NUL/0xFF padding removed
    pub fn name(&self) -> Cow<'static, str> {
        clean_signature(self.prefix)
    }
}

// APP0
pub const JFIF: Signature = Signature::new(Marker::APP0, b"JFIF\0");
pub const JFXX: Signature = Signature::new(Marker::APP0, b"JFXX\0");

// APP1
pub const EXIF: Signature = Signature::new(Marker::APP1, b"Exif\0\0");
/// Exif with 0xFF padding, written by some older cameras
pub const EXIF_ALT: Signature = Signature::new(Marker::APP1, b"Exif\0\xFF");
pub const XMP: Signature = Signature::new(Marker::APP1, b"http://ns.adobe.com/xap/1.0/\0");
pub const EXTENDED_XMP: Signature =
    Signature::new(Marker::APP1, b"http://ns.adobe.com/xmp/extension/\0");

// APP2
pub const ICC_PROFILE: Signature = Signature::new(Marker::APP2, b"ICC_PROFILE\0");

// APP3
pub const META: Signature = Signature::new(Marker::APP3, b"META\0\0");
pub const META_LOWER: Signature = Signature::new(Marker::APP3, b"Meta\0\0");

// APP12
pub const DUCKY: Signature = Signature::new(Marker::APP12, b"Ducky\0");

// APP13
pub const PHOTOSHOP_3: Signature = Signature::new(Marker::APP13, b"Photoshop 3.0\0");
pub const PHOTOSHOP_2_5: Signature = Signature::new(Marker::APP13, b"Adobe_Photoshop2.5:");

// APP14
pub const ADOBE: Signature = Signature::new(Marker::APP14, b"Adobe\0");

static SIGNATURES: [&[Signature]; 16] = [
    &[JFIF, JFXX],
    &[EXIF, EXIF_ALT, XMP, EXTENDED_XMP],
    &[ICC_PROFILE],
    &[META, META_LOWER],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[],
    &[DUCKY],
    &[PHOTOSHOP_3, PHOTOSHOP_2_5],
    &[ADOBE],
    &[],
];

/// A matched signature and the payload bytes that follow it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppPayload<'a> {
    pub signature: &'static Signature,
    pub payload: &'a [u8],
}

/// Candidate signatures for an APPn marker, in match order.
///
/// Returns [`Error::WrongMarker`] for markers outside APP0..=APP15.
pub fn signatures_for(marker: Marker) -> Result<&'static [Signature]> {
    marker
        .app_index()
        .map(|slot| SIGNATURES[slot])
        .ok_or(Error::WrongMarker(marker))
}

/// Match `data` against the signatures registered for `marker`.
///
/// `Ok(None)` means the application segment is of an unknown kind, which is a
/// normal outcome. Calling this for a non-APPn marker is an error.
pub fn match_signature(marker: Marker, data: &[u8]) -> Result<Option<AppPayload<'_>>> {
    let found = signatures_for(marker)?
        .iter()
        .find(|sig| data.starts_with(sig.prefix))
        .map(|signature| AppPayload {
            signature,
            payload: &data[signature.prefix.len()..],
        });
    Ok(found)
}

/// Trim trailing NUL and 0xFF padding from a signature for display.
///
/// No validation is performed; invalid UTF-8 is replaced.
pub fn clean_signature(sig: &[u8]) -> Cow<'_, str> {
    let end = sig
        .iter()
        .rposition(|&b| b != 0x00 && b != 0xFF)
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&sig[..end])
}
