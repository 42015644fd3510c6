// src/lib.rs

//! pkgtools
//!
//! Local package registry and lifecycle manager for a minimal-distribution
//! host: tracks which files belong to which installed package, installs
//! packages from compressed tar archives with collision detection, removes
//! them while honoring administrator-defined reject rules, and answers
//! file-ownership queries.
//!
//! # Architecture
//!
//! - Manifest-per-package: the database is a directory of plain text file
//!   lists under `<root>/var/pkg`, fsynced on every write
//! - Name and version derive purely from the `name[#version].ext1.ext2`
//!   filename convention
//! - Reject rules exclude paths symmetrically from install and removal
//! - Two-phase removal: reverse-order file pass, then bottom-up pruning of
//!   empty, unreferenced directories
//!
//! Single-threaded, synchronous I/O throughout. No locking protects two
//! invocations against the same root.

pub mod archive;
pub mod db;
mod error;
pub mod name;
pub mod package;
pub mod reject;

pub use db::{DB_PATH, Database, Walk};
pub use error::{Error, Result};
pub use package::{Options, Package, PackageEntry};
pub use reject::{REJECT_CONF, RejectRules};
