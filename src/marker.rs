//! JPEG marker codes (ITU T.81 Table B.1)

use std::fmt;

/// The byte following a `0xFF` sentinel that identifies a segment's role.
///
/// Unassigned values are representable so that non-conformant files can still be
/// scanned; they display as `0xHH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Marker(pub u8);

impl Marker {
    /// Temporary private use in arithmetic coding
    pub const TEM: Marker = Marker(0x01);

    // Start Of Frame, non-differential, Huffman coding
    pub const SOF0: Marker = Marker(0xC0); // Baseline DCT
    pub const SOF1: Marker = Marker(0xC1); // Extended sequential DCT
    pub const SOF2: Marker = Marker(0xC2); // Progressive DCT
    pub const SOF3: Marker = Marker(0xC3); // Lossless (sequential)

    /// Define Huffman table(s)
    pub const DHT: Marker = Marker(0xC4);

    // Start Of Frame, differential, Huffman coding
    pub const SOF5: Marker = Marker(0xC5);
    pub const SOF6: Marker = Marker(0xC6);
    pub const SOF7: Marker = Marker(0xC7);

    /// Reserved for JPEG extensions
    pub const JPG: Marker = Marker(0xC8);

    // Start Of Frame, non-differential, arithmetic coding
    pub const SOF9: Marker = Marker(0xC9);
    pub const SOF10: Marker = Marker(0xCA);
    pub const SOF11: Marker = Marker(0xCB);

    /// Define arithmetic coding conditioning(s)
    pub const DAC: Marker = Marker(0xCC);

    // Start Of Frame, differential, arithmetic coding
    pub const SOF13: Marker = Marker(0xCD);
    pub const SOF14: Marker = Marker(0xCE);
    pub const SOF15: Marker = Marker(0xCF);

    // Restart with modulo 8 count
    pub const RST0: Marker = Marker(0xD0);
    pub const RST1: Marker = Marker(0xD1);
    pub const RST2: Marker = Marker(0xD2);
    pub const RST3: Marker = Marker(0xD3);
    pub const RST4: Marker = Marker(0xD4);
    pub const RST5: Marker = Marker(0xD5);
    pub const RST6: Marker = Marker(0xD6);
    pub const RST7: Marker = Marker(0xD7);

    /// Start of image
    pub const SOI: Marker = Marker(0xD8);
    /// End of image
    pub const EOI: Marker = Marker(0xD9);
    /// Start of scan, entropy-coded data follows the header
    pub const SOS: Marker = Marker(0xDA);
    /// Define quantization table(s)
    pub const DQT: Marker = Marker(0xDB);
    /// Define number of lines
    pub const DNL: Marker = Marker(0xDC);
    /// Define restart interval
    pub const DRI: Marker = Marker(0xDD);
    /// Define hierarchical progression
    pub const DHP: Marker = Marker(0xDE);
    /// Expand reference component(s)
    pub const EXP: Marker = Marker(0xDF);

    // Application segments
    pub const APP0: Marker = Marker(0xE0);
    pub const APP1: Marker = Marker(0xE1);
    pub const APP2: Marker = Marker(0xE2);
    pub const APP3: Marker = Marker(0xE3);
    pub const APP4: Marker = Marker(0xE4);
    pub const APP5: Marker = Marker(0xE5);
    pub const APP6: Marker = Marker(0xE6);
    pub const APP7: Marker = Marker(0xE7);
    pub const APP8: Marker = Marker(0xE8);
    pub const APP9: Marker = Marker(0xE9);
    pub const APP10: Marker = Marker(0xEA);
    pub const APP11: Marker = Marker(0xEB);
    pub const APP12: Marker = Marker(0xEC);
    pub const APP13: Marker = Marker(0xED);
    pub const APP14: Marker = Marker(0xEE);
    pub const APP15: Marker = Marker(0xEF);

    // Reserved for JPEG extensions
    pub const JPG0: Marker = Marker(0xF0);
    pub const JPG1: Marker = Marker(0xF1);
    pub const JPG2: Marker = Marker(0xF2);
    pub const JPG3: Marker = Marker(0xF3);
    pub const JPG4: Marker = Marker(0xF4);
    pub const JPG5: Marker = Marker(0xF5);
    pub const JPG6: Marker = Marker(0xF6);
    pub const JPG7: Marker = Marker(0xF7);
    pub const JPG8: Marker = Marker(0xF8);
    pub const JPG9: Marker = Marker(0xF9);
    pub const JPG10: Marker = Marker(0xFA);
    pub const JPG11: Marker = Marker(0xFB);
    pub const JPG12: Marker = Marker(0xFC);
    pub const JPG13: Marker = Marker(0xFD);

    /// Comment
    pub const COM: Marker = Marker(0xFE);

    /// The raw marker byte
    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Symbolic name, or `None` for unassigned codes
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0x01 => "TEM",
            0xC0 => "SOF0",
            0xC1 => "SOF1",
            0xC2 => "SOF2",
            0xC3 => "SOF3",
            0xC4 => "DHT",
            0xC5 => "SOF5",
            0xC6 => "SOF6",
            0xC7 => "SOF7",
            0xC8 => "JPG",
            0xC9 => "SOF9",
            0xCA => "SOF10",
            0xCB => "SOF11",
            0xCC => "DAC",
            0xCD => "SOF13",
            0xCE => "SOF14",
            0xCF => "SOF15",
            0xD0 => "RST0",
            0xD1 => "RST1",
            0xD2 => "RST2",
            0xD3 => "RST3",
            0xD4 => "RST4",
            0xD5 => "RST5",
            0xD6 => "RST6",
            0xD7 => "RST7",
            0xD8 => "SOI",
            0xD9 => "EOI",
            0xDA => "SOS",
            0xDB => "DQT",
            0xDC => "DNL",
            0xDD => "DRI",
            0xDE => "DHP",
            0xDF => "EXP",
            0xE0 => "APP0",
            0xE1 => "APP1",
            0xE2 => "APP2",
            0xE3 => "APP3",
            0xE4 => "APP4",
            0xE5 => "APP5",
            0xE6 => "APP6",
            0xE7 => "APP7",
            0xE8 => "APP8",
            0xE9 => "APP9",
            0xEA => "APP10",
            0xEB => "APP11",
            0xEC => "APP12",
            0xED => "APP13",
            0xEE => "APP14",
            0xEF => "APP15",
            0xF0 => "JPG0",
            0xF1 => "JPG1",
            0xF2 => "JPG2",
            0xF3 => "JPG3",
            0xF4 => "JPG4",
            0xF5 => "JPG5",
            0xF6 => "JPG6",
            0xF7 => "JPG7",
            0xF8 => "JPG8",
            0xF9 => "JPG9",
            0xFA => "JPG10",
            0xFB => "JPG11",
            0xFC => "JPG12",
            0xFD => "JPG13",
            0xFE => "COM",
            _ => return None,
        };
        Some(name)
    }

    /// True for APP0 through APP15
    pub fn is_app(self) -> bool {
        (Self::APP0.0..=Self::APP15.0).contains(&self.0)
    }

    /// Slot number `n` of an APPn marker
    pub fn app_index(self) -> Option<usize> {
        self.is_app().then(|| (self.0 - Self::APP0.0) as usize)
    }

    /// True for RST0 through RST7
    pub fn is_rst(self) -> bool {
        (Self::RST0.0..=Self::RST7.0).contains(&self.0)
    }

    /// True for the start-of-frame family (DHT, JPG and DAC share the range but are excluded)
    pub fn is_sof(self) -> bool {
        (Self::SOF0.0..=Self::SOF15.0).contains(&self.0)
            && self != Self::DHT
            && self != Self::JPG
            && self != Self::DAC
    }

    /// Whether a 2-byte length field follows the marker.
    ///
    /// SOI, EOI, TEM and RSTn stand alone.
    pub fn has_length(self) -> bool {
        !(self == Self::SOI || self == Self::EOI || self == Self::TEM || self.is_rst())
    }
}

impl From<u8> for Marker {
    fn from(byte: u8) -> Self {
        Marker(byte)
    }
}

impl From<Marker> for u8 {
    fn from(marker: Marker) -> Self {
        marker.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}
