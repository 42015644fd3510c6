// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for pkgtools
#[derive(Error, Debug)]
pub enum Error {
    /// Package filename does not follow the `name[#version].ext1.ext2` form
    #[error("{}: invalid package filename", .0.display())]
    InvalidFilename(PathBuf),

    /// Unresolvable root or missing package database directory
    #[error("{}: {source}", .path.display())]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O errors (read/write/flush/sync)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fatal archive failure (open or header read)
    #[error("archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Pre-existing non-directory objects at install target paths
    #[error("{} target path(s) already exist on the filesystem", .paths.len())]
    Collision { paths: Vec<PathBuf> },

    /// Malformed reject pattern; the whole rule set is discarded
    #[error("invalid reject pattern {pattern:?}: {source}")]
    Config {
        pattern: String,
        source: regex::Error,
    },
}

impl Error {
    pub(crate) fn archive(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::Archive {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn path(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::Path {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type alias using pkgtools' Error type
pub type Result<T> = std::result::Result<T, Error>;
