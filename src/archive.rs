// src/archive.rs

//! Archive collaborator: compressed tar reading and safe extraction
//!
//! Packages are tar streams compressed with gzip, bzip2 or xz; the
//! compression is detected from magic bytes rather than the filename, so
//! any `name#version.ext1.ext2` naming works. Extraction preserves owner,
//! permissions and timestamps, and refuses members that try to traverse
//! above the extraction root.

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tar::{Archive, Entry};
use xz2::read::XzDecoder;

/// Compression applied to the tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Gzip,
    Bzip2,
    Xz,
    None,
}

/// Detect the compression format from the file's magic bytes
fn detect_compression(path: &Path) -> Result<Compression> {
    let mut file = File::open(path).map_err(|e| Error::archive(path, e))?;
    let mut magic = [0u8; 6];
    let n = file.read(&mut magic).map_err(|e| Error::archive(path, e))?;

    if n >= 2 && magic[0..2] == [0x1F, 0x8B] {
        Ok(Compression::Gzip)
    } else if n >= 3 && &magic[0..3] == b"BZh" {
        Ok(Compression::Bzip2)
    } else if n >= 6 && magic[0..6] == [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00] {
        Ok(Compression::Xz)
    } else {
        // fall through to plain tar
        Ok(Compression::None)
    }
}

/// Open a package archive for reading.
///
/// The returned archive is configured to preserve owner, permissions and
/// modification times on extraction. Open failures are fatal
/// ([`Error::Archive`]).
pub fn open(path: &Path) -> Result<Archive<Box<dyn Read>>> {
    let compression = detect_compression(path)?;
    let file = File::open(path).map_err(|e| Error::archive(path, e))?;

    let reader: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(file)),
        Compression::Bzip2 => Box::new(BzDecoder::new(file)),
        Compression::Xz => Box::new(XzDecoder::new(file)),
        Compression::None => Box::new(file),
    };

    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_preserve_ownerships(true);
    archive.set_unpack_xattrs(false);
    Ok(archive)
}

/// Member pathname with a leading `./` stripped, lossily decoded.
pub fn entry_rpath<R: Read>(entry: &Entry<'_, R>) -> String {
    let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
    match raw.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => raw,
    }
}

/// Extract one member below `root`.
///
/// Returns `Ok(false)` when the member was skipped because its path would
/// escape the extraction root. With `unlink`, a pre-existing non-directory
/// object at the target is removed before extraction.
pub fn extract_entry<R: Read>(
    entry: &mut Entry<'_, R>,
    root: &Path,
    rpath: &str,
    unlink: bool,
) -> std::io::Result<bool> {
    if unlink {
        let target = root.join(rpath);
        if let Ok(meta) = fs::symlink_metadata(&target) {
            if !meta.is_dir() {
                fs::remove_file(&target)?;
            }
        }
    }
    entry.unpack_in(root)
}
