// src/name.rs

//! Package filename parsing
//!
//! Package archives are named `name[#version].ext1.ext2` (e.g.
//! `zlib#1.3.pkg.tgz`); the database keeps one manifest per package named
//! `name[#version]` with no extension. Name and version are derived purely
//! from the filename, never from archive contents.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;

/// Take the final path component and strip exactly two trailing
/// dot-delimited suffixes.
fn strip_suffixes(path: &Path) -> Result<&str> {
    let base = path
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| Error::InvalidFilename(path.to_path_buf()))?;
    let base = &base[..base
        .rfind('.')
        .ok_or_else(|| Error::InvalidFilename(path.to_path_buf()))?];
    let base = &base[..base
        .rfind('.')
        .ok_or_else(|| Error::InvalidFilename(path.to_path_buf()))?];
    Ok(base)
}

/// Extract the package name from an archive filename.
/// e.g. `/tmp/pkg#version.pkg.tgz` yields `pkg`
pub fn parse_name(path: &Path) -> Result<String> {
    let base = strip_suffixes(path)?;
    let name = match base.find('#') {
        Some(pos) => &base[..pos],
        None => base,
    };
    if name.is_empty() {
        return Err(Error::InvalidFilename(path.to_path_buf()));
    }
    Ok(name.to_string())
}

/// Extract the package version from an archive filename, if any.
/// e.g. `/tmp/pkg#version.pkg.tgz` yields `version`
pub fn parse_version(path: &Path) -> Result<Option<String>> {
    let base = strip_suffixes(path)?;
    match base.find('#') {
        None => Ok(None),
        Some(pos) => {
            let version = &base[pos + 1..];
            if version.is_empty() {
                return Err(Error::InvalidFilename(path.to_path_buf()));
            }
            Ok(Some(version.to_string()))
        }
    }
}

/// Extract the package name from a manifest filename (`name[#version]`,
/// no extension).
pub fn parse_db_name(file: &str) -> Result<String> {
    let name = match file.find('#') {
        Some(pos) => &file[..pos],
        None => file,
    };
    if name.is_empty() {
        return Err(Error::InvalidFilename(file.into()));
    }
    Ok(name.to_string())
}

/// Extract the package version from a manifest filename, if any.
pub fn parse_db_version(file: &str) -> Result<Option<String>> {
    match file.find('#') {
        None => Ok(None),
        Some(pos) => {
            let version = &file[pos + 1..];
            if version.is_empty() {
                return Err(Error::InvalidFilename(file.into()));
            }
            Ok(Some(version.to_string()))
        }
    }
}
