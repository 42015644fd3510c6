// src/package.rs

//! In-memory package records
//!
//! A [`Package`] is created either from a manifest in the database
//! directory or from a package archive about to be installed. Either way it
//! carries an ordered file manifest: order is significant, removal walks it
//! in reverse.

use crate::archive;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::name;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Options threaded through install and removal operations
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Override collision checks on install; delete symlinks and prune
    /// empty directories on removal.
    pub force: bool,
}

/// One file recorded in a package manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Absolute path: installation root joined with `rpath`
    pub path: PathBuf,
    /// Root-relative path as recorded in the manifest or archive
    pub rpath: String,
}

impl PackageEntry {
    pub(crate) fn new(root: &Path, rpath: &str) -> Self {
        Self {
            path: root.join(rpath),
            rpath: rpath.to_string(),
        }
    }
}

/// One installed (or to-be-installed) package
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub version: Option<String>,
    /// Manifest path when loaded from the database, archive path when
    /// loaded for installation
    pub path: PathBuf,
    /// Ordered file manifest (manifest/archive order)
    pub entries: Vec<PackageEntry>,
}

impl Package {
    /// Create a package from a database manifest.
    /// e.g. `/var/pkg/zlib#1.3`
    pub fn from_manifest(root: &Path, manifest: &Path) -> Result<Self> {
        let file = manifest
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| Error::InvalidFilename(manifest.to_path_buf()))?;
        let name = name::parse_db_name(file)?;
        let version = name::parse_db_version(file)?;

        let content = fs::read_to_string(manifest)?;
        let mut entries = Vec::new();
        for line in content.lines() {
            if line.is_empty() {
                return Err(Error::Io(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("{}: malformed manifest", manifest.display()),
                )));
            }
            entries.push(PackageEntry::new(root, line));
        }

        Ok(Self {
            name,
            version,
            path: manifest.to_path_buf(),
            entries,
        })
    }

    /// Create a package from an archive on disk.
    /// e.g. `/tmp/zlib#1.3.pkg.tgz`
    ///
    /// Enumerates the archive members without touching the filesystem. A
    /// leading `./` is stripped from member pathnames, empty pathnames are
    /// skipped, and reject-matched members are excluded so that they never
    /// appear in the persisted manifest.
    pub fn from_archive(db: &Database, file: &Path) -> Result<Self> {
        let path = fs::canonicalize(file).map_err(|e| Error::path(file, e))?;
        let name = name::parse_name(&path)?;
        let version = name::parse_version(&path)?;

        let mut entries = Vec::new();
        let mut ar = archive::open(&path)?;
        for entry in ar.entries().map_err(|e| Error::archive(&path, e))? {
            let entry = entry.map_err(|e| Error::archive(&path, e))?;
            let rpath = archive::entry_rpath(&entry);
            if rpath.is_empty() {
                continue;
            }
            if db.rejects().matches(&rpath) {
                warn!("rejecting {rpath}");
                continue;
            }
            entries.push(PackageEntry::new(db.root(), &rpath));
        }

        Ok(Self {
            name,
            version,
            path,
            entries,
        })
    }

    /// Manifest filename for this package: `name` or `name#version`
    pub fn manifest_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}#{}", self.name, version),
            None => self.name.clone(),
        }
    }

    /// Check the package's file entries against the filesystem.
    ///
    /// An existing non-directory object at an entry's target path is a
    /// collision; directories never collide since packages may share them.
    /// Every entry is checked so that the returned [`Error::Collision`]
    /// carries the complete list of conflicting paths, canonicalized when
    /// possible.
    pub fn collisions(&self) -> Result<()> {
        let mut paths = Vec::new();
        for pe in &self.entries {
            match fs::metadata(&pe.path) {
                Ok(meta) if !meta.is_dir() => {
                    let resolved =
                        fs::canonicalize(&pe.path).unwrap_or_else(|_| pe.path.clone());
                    warn!("{} exists", resolved.display());
                    paths.push(resolved);
                }
                _ => {}
            }
        }
        if paths.is_empty() {
            Ok(())
        } else {
            Err(Error::Collision { paths })
        }
    }
}
