//! Inserting segments before SOS
//!
//! New bytes can't be inserted in place, so the file is rebuilt next to the
//! original and renamed over it. Readers see either the old or the new file.

use crate::{
    error::Result,
    marker::Marker,
    scanner::scan_segments,
    segment::{encode_segment, Segment},
};
use log::{debug, info};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// Insert `segments` immediately before the SOS segment of the file at `path`.
///
/// Pointer offsets and lengths in `segments` are ignored; each is encoded from
/// its marker and data. Every segment is validated before the file is touched.
pub fn append<P: AsRef<Path>>(path: P, segments: &[Segment]) -> Result<()> {
    let path = path.as_ref();

    let mut insert = Vec::new();
    for segment in segments {
        encode_segment(&mut insert, segment)?;
    }

    let mut file = File::open(path)?;
    let pointers = scan_segments(&mut file)?;
    // A successful scan always ends with SOS
    let sos = pointers.last().map_or(0, |p| p.offset);
    debug!("splicing {} bytes into {:?} at {}", insert.len(), path, sos);

    splice_file(path, &mut file, &insert, sos)?;
    info!(
        "appended {} segments ({} bytes) to {:?}",
        segments.len(),
        insert.len(),
        path
    );
    Ok(())
}

/// Insert one segment with `marker` and `data` before SOS. See [`append`].
pub fn add<P: AsRef<Path>>(path: P, marker: Marker, data: &[u8]) -> Result<()> {
    append(path, &[Segment::new(marker, data.to_vec())])
}

/// Replace `path` with `source[..at] + insert + source[at..]`.
///
/// The replacement is built in a temporary file in the same directory, so the
/// final rename stays on one filesystem. The temporary is removed on any error.
fn splice_file(path: &Path, source: &mut File, insert: &[u8], at: u64) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        source.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut Read::by_ref(source).take(at), &mut writer)?;
        if copied < at {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        writer.write_all(insert)?;
        io::copy(source, &mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    let permissions = source.metadata()?.permissions();
    fs::set_permissions(temp.path(), permissions)?;

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
