// src/db.rs

//! The installed-package registry
//!
//! The database is a directory of manifests under `<root>/var/pkg`, one
//! file per installed package named `name` or `name#version`, each holding
//! one root-relative path per line. [`Database`] owns the loaded packages
//! and the reject rule set, and implements the install and removal
//! algorithms on top of them.
//!
//! The loaded package collection is a point-in-time snapshot of the
//! manifest directory; it is never refreshed automatically. Nothing
//! protects against a second concurrent invocation on the same root —
//! concurrent install/remove is an unsupported hazard.

use crate::archive;
use crate::error::{Error, Result};
use crate::package::{Options, Package};
use crate::reject::RejectRules;
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Location of the package database, relative to the installation root
pub const DB_PATH: &str = "var/pkg";

/// Visitor outcome for [`Database::walk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    /// End the traversal successfully
    Stop,
}

/// The package database rooted at a filesystem root
#[derive(Debug)]
pub struct Database {
    /// Canonicalized installation root
    root: PathBuf,
    /// `root` joined with [`DB_PATH`]
    path: PathBuf,
    /// Handle on the manifest directory, retained for the process
    /// lifetime and used as a durability barrier for manifest creation
    dir: File,
    rejects: RejectRules,
    packages: Vec<Package>,
    /// Removed but not yet destroyed packages, kept for caller inspection
    removed: Vec<Package>,
}

impl Database {
    /// Open the package database under `root`.
    ///
    /// Fails with [`Error::Path`] if the root cannot be resolved or the
    /// manifest directory is missing. While the handle is open the four
    /// common interruption signals are ignored; this is a best-effort
    /// atomicity window, not a transaction log — a hard kill mid-operation
    /// can still leave the manifest and filesystem inconsistent.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = fs::canonicalize(root.as_ref())
            .map_err(|e| Error::path(root.as_ref(), e))?;
        let path = root.join(DB_PATH);
        let dir = File::open(&path).map_err(|e| Error::path(&path, e))?;
        let rejects = RejectRules::load(&root)?;

        ignore_signals();

        Ok(Self {
            root,
            path,
            dir,
            rejects,
            packages: Vec::new(),
            removed: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rejects(&self) -> &RejectRules {
        &self.rejects
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn removed(&self) -> &[Package] {
        &self.removed
    }

    /// Load every manifest in the database directory.
    ///
    /// Any malformed manifest filename or manifest line aborts the whole
    /// load; the database is never left partially loaded, since later
    /// install and removal decisions depend on completeness.
    pub fn load(&mut self) -> Result<()> {
        let mut packages = Vec::new();
        for dent in fs::read_dir(&self.path)? {
            let dent = dent?;
            packages.push(Package::from_manifest(&self.root, &dent.path())?);
        }
        debug!("loaded {} package(s) from {}", packages.len(), self.path.display());
        self.packages = packages;
        Ok(())
    }

    /// Persist the package manifest: one line per entry's root-relative
    /// path, in entry order, flushed and fsynced before returning.
    pub fn add(&self, pkg: &Package) -> Result<()> {
        let path = self.path.join(pkg.manifest_name());
        let mut out = BufWriter::new(File::create(&path)?);
        for pe in &pkg.entries {
            debug!("installed {}", pe.path.display());
            out.write_all(pe.rpath.as_bytes())?;
            out.write_all(b"\n")?;
        }
        debug!("adding {}", path.display());
        out.flush()?;
        out.get_ref().sync_all()?;
        // make the new directory entry durable as well
        self.dir.sync_all()?;
        Ok(())
    }

    /// Delete the package manifest, then sync the storage device.
    pub fn remove_manifest(&self, pkg: &Package) -> Result<()> {
        let path = self.path.join(pkg.manifest_name());
        debug!("removing {}", path.display());
        fs::remove_file(&path)?;
        // coarse barrier; removal is infrequent
        unistd::sync();
        Ok(())
    }

    /// Install a package: collision check (unless forced), manifest
    /// persistence, then archive extraction under the root.
    ///
    /// The package joins the active collection even if extraction failed
    /// part-way, matching the manifest already written.
    pub fn install(&mut self, pkg: Package, opts: Options) -> Result<()> {
        if !opts.force {
            pkg.collisions()?;
        }
        self.add(&pkg)?;
        let result = self.extract(&pkg, opts);
        self.packages.push(pkg);
        result
    }

    /// Extract the package archive below the database root.
    ///
    /// Reject-matched members are skipped entirely. Per-member extraction
    /// failures are reported and do not abort the operation; archive open
    /// and header failures are fatal.
    pub fn extract(&self, pkg: &Package, opts: Options) -> Result<()> {
        let mut ar = archive::open(&pkg.path)?;
        for entry in ar.entries().map_err(|e| Error::archive(&pkg.path, e))? {
            let mut entry = entry.map_err(|e| Error::archive(&pkg.path, e))?;
            let rpath = archive::entry_rpath(&entry);
            if rpath.is_empty() {
                continue;
            }
            if self.rejects.matches(&rpath) {
                warn!("rejecting {rpath}");
                continue;
            }
            match archive::extract_entry(&mut entry, &self.root, &rpath, opts.force) {
                Ok(true) => debug!("extracted {rpath}"),
                Ok(false) => {
                    warn!("{rpath}: refusing to extract outside {}", self.root.display());
                }
                Err(e) => warn!("extract {rpath}: {e}"),
            }
        }
        Ok(())
    }

    /// Remove the named package.
    ///
    /// Returns `Ok(false)` if no loaded package has that name. On
    /// completion the package moves from the active to the removed
    /// collection, where the caller may still inspect it.
    pub fn remove(&mut self, name: &str, opts: Options) -> Result<bool> {
        let Some(idx) = self.packages.iter().position(|p| p.name == name) else {
            return Ok(false);
        };

        self.remove_files(&self.packages[idx], opts);

        let pkg = self.packages.remove(idx);
        let result = self.remove_manifest(&pkg);
        self.removed.push(pkg);
        result?;
        Ok(true)
    }

    /// Two-phase file removal.
    ///
    /// Phase 1 walks the entries in reverse manifest order and unlinks
    /// regular files (and, with force, symlinks); directories are deferred.
    /// Phase 2, force only, prunes now-empty directories bottom-up,
    /// skipping any path still referenced by another loaded package.
    /// Individual failures are reported and skipped.
    fn remove_files(&self, pkg: &Package, opts: Options) {
        for pe in pkg.entries.iter().rev() {
            if self.rejects.matches(&pe.rpath) {
                warn!("rejecting {}", pe.rpath);
                continue;
            }

            let meta = match fs::symlink_metadata(&pe.path) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("lstat {}: {e}", pe.path.display());
                    continue;
                }
            };

            if meta.is_dir() {
                if !opts.force {
                    info!("ignoring directory {}", pe.path.display());
                }
                // removed in the pruning pass below
                continue;
            }

            if meta.file_type().is_symlink() && !opts.force {
                info!("ignoring link {}", pe.path.display());
                continue;
            }

            debug!("removing {}", pe.path.display());
            if let Err(e) = fs::remove_file(&pe.path) {
                warn!("remove {}: {e}", pe.path.display());
            }
        }

        if opts.force {
            // prune empty directories as well
            for pe in pkg.entries.iter().rev() {
                if self.rejects.matches(&pe.rpath) {
                    continue;
                }
                if self.count_links(&pe.path) > 1 {
                    // still referenced by another loaded package
                    continue;
                }
                prune_empty_dirs(&pe.path);
            }
        }
    }

    /// Short-circuiting iteration over the loaded packages.
    ///
    /// Returns `Ok(true)` if the visitor stopped the traversal, `Ok(false)`
    /// if it ran to completion; visitor errors propagate.
    pub fn walk<F>(&self, mut visitor: F) -> Result<bool>
    where
        F: FnMut(&Package) -> Result<Walk>,
    {
        for pkg in &self.packages {
            match visitor(pkg)? {
                Walk::Stop => return Ok(true),
                Walk::Continue => {}
            }
        }
        Ok(false)
    }

    /// Number of (package, entry) pairs in the loaded database whose
    /// absolute path equals the given path.
    ///
    /// Known limitation: this only sees paths recorded by currently loaded
    /// packages. Hard links and bind-mount aliases are invisible to it, as
    /// are reject-matched entries elsewhere.
    pub fn count_links(&self, path: &Path) -> usize {
        self.packages
            .iter()
            .flat_map(|pkg| &pkg.entries)
            .filter(|pe| pe.path == path)
            .count()
    }

    /// Packages owning the filesystem object at `path`.
    ///
    /// Ownership is decided by device and inode equality, not path string
    /// comparison, so hard-linked or bind-mounted aliases match correctly.
    pub fn owners(&self, path: &Path) -> Result<Vec<&Package>> {
        let meta = fs::symlink_metadata(path).map_err(|e| Error::path(path, e))?;
        let (dev, ino) = (meta.dev(), meta.ino());

        let mut owners = Vec::new();
        for pkg in &self.packages {
            for pe in &pkg.entries {
                let Ok(entry_meta) = fs::symlink_metadata(&pe.path) else {
                    continue;
                };
                if entry_meta.dev() == dev && entry_meta.ino() == ino {
                    owners.push(pkg);
                    break;
                }
            }
        }
        Ok(owners)
    }
}

/// Ignore the four common interruption signals.
///
/// In effect for the remainder of the process; the window closes only at
/// process exit. SIGKILL and power loss are of course not covered.
fn ignore_signals() {
    for sig in [
        Signal::SIGHUP,
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGTERM,
    ] {
        unsafe {
            let _ = signal(sig, SigHandler::SigIgn);
        }
    }
}

/// Bottom-up removal of empty directories below `path`, silently skipping
/// non-empty ones. A vanished or non-directory `path` is a no-op.
fn prune_empty_dirs(path: &Path) {
    for entry in WalkDir::new(path)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() {
            debug!("removing {}", entry.path().display());
            let _ = fs::remove_dir(entry.path());
        }
    }
}
