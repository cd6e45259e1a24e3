//! In-place segment editing
//!
//! [`Editor`] rewrites a segment's payload without changing the file size. It's
//! meant for files that are already a working copy: a failed write can leave the
//! segment half updated. Use [`crate::append`] when the file must grow.

use crate::{
    error::{Error, Result},
    marker::Marker,
    scanner::scan_segments,
    segment::{Pointer, Segment, MAX_PAYLOAD_SIZE},
};
use byteorder::{BigEndian, WriteBytesExt};
use log::{info, warn};
use std::{
    fs::{self, File, Metadata},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

/// How a payload shorter than the available space is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Padding {
    /// Shrink the length field and fill the gap with 0xFF bytes, which readers
    /// skip while searching for the next marker
    #[default]
    FillBytes,
    /// Keep the segment's footprint and append zero bytes to the payload
    ZeroExtend,
}

/// Options for [`Editor::open_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOptions {
    pub padding: Padding,
    /// Flush data to disk after each update
    pub sync: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            padding: Padding::default(),
            sync: true,
        }
    }
}

impl EditOptions {
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// A JPEG file opened for in-place segment updates.
///
/// The segment index is captured when the file is opened and refreshed after
/// each update. Only segments through SOS are indexed.
///
/// # Example
///
/// ```no_run
/// use jfif_io::{Editor, Marker};
///
/// # fn main() -> jfif_io::Result<()> {
/// let mut editor = Editor::open("copy.jpg")?;
/// let com = editor.query(Marker::COM).next();
/// if let Some(com) = com {
///     editor.update(&com, b"new comment")?;
/// }
/// editor.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Editor {
    file: File,
    path: PathBuf,
    pointers: Vec<Pointer>,
    opened: Metadata,
    options: EditOptions,
}

impl Editor {
    /// Open `path` read-write and index its segments
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, EditOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: EditOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::options().read(true).write(true).open(path)?;
        let pointers = scan_segments(&mut file)?;
        let opened = file.metadata()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            pointers,
            opened,
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Indexed segments in file order, SOI through SOS
    pub fn pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    /// Indexed segments with the given marker
    pub fn query(&self, marker: Marker) -> impl Iterator<Item = Pointer> + '_ {
        self.pointers
            .iter()
            .filter(move |p| p.marker == marker)
            .copied()
    }

    /// Read a segment's current payload from disk
    pub fn load(&mut self, pointer: &Pointer) -> Result<Segment> {
        pointer.load(&mut self.file)
    }

    /// Replace the payload of an indexed segment.
    ///
    /// Room available is the current payload plus any fill bytes before the
    /// next indexed segment. The file size never changes. On success the index
    /// entry is replaced and the new pointer returned; on error the file is
    /// untouched.
    pub fn update(&mut self, pointer: &Pointer, payload: &[u8]) -> Result<Pointer> {
        let index = self
            .pointers
            .iter()
            .position(|p| p == pointer)
            .ok_or(Error::UnknownSegment {
                offset: pointer.offset,
                marker: pointer.marker,
            })?;
        let Some(length) = pointer.length else {
            return Err(Error::WrongMarker(pointer.marker));
        };

        let next = self.pointers.get(index + 1).copied();
        let space = match next {
            Some(next) => (next.offset - pointer.offset - 4) as usize,
            None => pointer.payload_len(),
        };
        if payload.len() > space || payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::OversizePayload {
                size: payload.len(),
                available: space.min(MAX_PAYLOAD_SIZE),
            });
        }

        self.check_fresh(pointer.offset, pointer.marker, length)?;

        // Zero padding is part of the payload, fill bytes follow it
        let zeros = match (self.options.padding, next) {
            (Padding::ZeroExtend, _) => space.min(MAX_PAYLOAD_SIZE) - payload.len(),
            (Padding::FillBytes, None) => {
                if space > payload.len() {
                    warn!(
                        "{} at {} is the last indexed segment, zero-extending {} bytes",
                        pointer.marker,
                        pointer.offset,
                        space - payload.len()
                    );
                }
                space - payload.len()
            }
            (Padding::FillBytes, Some(_)) => 0,
        };
        let fill = space - payload.len() - zeros;
        let new_length = (payload.len() + zeros + 2) as u16;

        let mut buf = Vec::with_capacity(4 + space);
        buf.write_all(&[0xFF, pointer.marker.byte()])?;
        buf.write_u16::<BigEndian>(new_length)?;
        buf.write_all(payload)?;
        buf.resize(buf.len() + zeros, 0x00);
        buf.resize(buf.len() + fill, 0xFF);

        self.file.seek(SeekFrom::Start(pointer.offset))?;
        self.file.write_all(&buf)?;
        if self.options.sync {
            self.file.sync_data()?;
        }

        let updated = Pointer::new(pointer.offset, pointer.marker, new_length);
        self.pointers[index] = updated;
        info!(
            "updated {} at {}: {} byte payload, {} zero and {} fill bytes",
            pointer.marker,
            pointer.offset,
            payload.len(),
            zeros,
            fill
        );
        Ok(updated)
    }

    /// Flush pending writes and release the file
    pub fn close(self) -> Result<()> {
        if self.options.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Verify the file still matches the index before writing to it.
    ///
    /// The path must still name the open file: [`crate::append`] replaces
    /// files by rename, which leaves this handle on the unlinked original.
    fn check_fresh(&mut self, offset: u64, marker: Marker, length: u16) -> Result<()> {
        let stale = Error::StaleIndex { offset };
        let current = self.file.metadata()?;
        if current.len() != self.opened.len() {
            return Err(stale);
        }
        match fs::metadata(&self.path) {
            Ok(at_path) if same_file(&current, &at_path) => {}
            Ok(_) => return Err(stale),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(stale),
            Err(e) => return Err(e.into()),
        }

        let mut header = [0u8; 4];
        self.file.seek(SeekFrom::Start(offset))?;
        if let Err(e) = self.file.read_exact(&mut header) {
            let err = Error::from(e);
            return Err(if err.is_eof() { stale } else { err });
        }

        let [hi, lo] = length.to_be_bytes();
        if header != [0xFF, marker.byte(), hi, lo] {
            return Err(stale);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

// No stable file identity elsewhere; a replaced file almost always differs in size
#[cfg(not(unix))]
fn same_file(a: &Metadata, b: &Metadata) -> bool {
    a.len() == b.len()
}
