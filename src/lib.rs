//! Streaming access to the segment structure of JPEG/JFIF files.
//!
//! This crate locates, reads, encodes and edits the marker segments that make
//! up the header of a JPEG file: everything from SOI through SOS. Entropy-coded
//! image data is never decoded.
//!
//! # Design Principles
//!
//! - **Streaming**: Scanning reads forward once and stops at SOS
//! - **Lazy loading**: [`scan_segments`] returns locations only; payloads are
//!   read on demand with [`Pointer::load`]
//! - **Lenient reading**: Fill bytes, byte stuffing and stray bytes between
//!   segments are skipped the way common decoders do
//! - **Safe writing**: Segments are validated before any byte is written, and
//!   [`append`] replaces files with a single rename
//!
//! # Reading
//!
//! ```no_run
//! use jfif_io::{decode_segments, Marker};
//! use std::fs::File;
//!
//! # fn main() -> jfif_io::Result<()> {
//! let mut file = File::open("image.jpg")?;
//! for segment in decode_segments(&mut file)? {
//!     if let Ok(Some(app)) = segment.app_payload() {
//!         println!("{} {} ({} bytes)", segment.marker(), app.signature.name(), app.payload.len());
//!     } else if segment.marker() == Marker::COM {
//!         println!("comment: {}", String::from_utf8_lossy(segment.payload()));
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Editing
//!
//! ```no_run
//! use jfif_io::{add, Editor, Marker};
//!
//! # fn main() -> jfif_io::Result<()> {
//! // Grow the file: insert a comment before SOS
//! add("image.jpg", Marker::COM, b"processed")?;
//!
//! // Rewrite it in place, without changing the file size
//! let mut editor = Editor::open("image.jpg")?;
//! let com = editor.query(Marker::COM).next();
//! if let Some(com) = com {
//!     editor.update(&com, b"reviewed")?;
//! }
//! editor.close()?;
//! # Ok(())
//! # }
//! ```

mod edit;
mod error;
mod marker;
mod scanner;
mod segment;
pub mod signature;
mod splice;
#[cfg(feature = "xmp")]
pub mod xmp;

pub use edit::{EditOptions, Editor, Padding};
pub use error::{Error, Result};
pub use marker::Marker;
pub use scanner::{
    decode_segments, scan_segments, ForwardReader, PartialScan, ScanResult, Scanner,
};
pub use segment::{encode_segment, Pointer, Segment, MAX_PAYLOAD_SIZE, MAX_SEGMENT_LENGTH};
pub use signature::{clean_signature, match_signature, AppPayload, Signature};
pub use splice::{add, append};

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
