// src/reject.rs

//! Administrator-defined exclusion rules
//!
//! `<root>/etc/pkgtools/reject.conf` holds one unanchored regex per line;
//! blank lines and `#` comments are skipped. Paths matching any rule are
//! excluded from both installation and removal, so files the administrator
//! manages by hand are never placed or deleted by the tool.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Location of the reject rule file, relative to the installation root
pub const REJECT_CONF: &str = "etc/pkgtools/reject.conf";

/// Compiled reject rules, kept in file order
#[derive(Debug, Default)]
pub struct RejectRules {
    rules: Vec<Regex>,
}

impl RejectRules {
    /// Load and compile the reject rules under the given root.
    ///
    /// A missing rule file is not an error and yields an empty set. A rule
    /// that fails to compile discards the whole set and fails with
    /// [`Error::Config`].
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(REJECT_CONF);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no reject rules at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut rules = Vec::new();
        for line in content.lines() {
            // skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let rule = Regex::new(line).map_err(|source| Error::Config {
                pattern: line.to_string(),
                source,
            })?;
            rules.push(rule);
        }

        debug!("loaded {} reject rule(s) from {}", rules.len(), path.display());
        Ok(Self { rules })
    }

    /// True if any rule matches the given root-relative path.
    pub fn matches(&self, rpath: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(rpath))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
