//! Display names for keyboard layouts.
//!
//! Sway reports long XKB names such as `English (US)`.  Translation files
//! map them to something shorter for the bar.  Each file holds one
//! mapping per line:
//!
//! ```text
//! # original<TAB>display
//! English (US)	us
//! German	de
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.  When several
//! files map the same name, the last one loaded wins.

use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Layout name translation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutNames {
    map: HashMap<String, String>,
}

/// Error from loading a translation file.
#[derive(Debug, thiserror::Error)]
pub enum LayoutNamesError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: expected two tab-separated columns", .path.display())]
    Syntax { path: PathBuf, line: usize },
}

impl LayoutNames {
    /// An empty table that passes every name through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge every file in `paths`, in order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, LayoutNamesError> {
        let mut names = Self::new();
        for path in paths {
            names.load_file(path.as_ref())?;
        }
        Ok(names)
    }

    /// Merge the mappings from one file into this table.
    pub fn load_file(&mut self, path: &Path) -> Result<(), LayoutNamesError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LayoutNamesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let before = self.map.len();
        self.merge(&contents)
            .map_err(|line| LayoutNamesError::Syntax {
                path: path.to_path_buf(),
                line,
            })?;
        info!(
            "loaded layout names from {} ({} new)",
            path.display(),
            self.map.len() - before
        );
        Ok(())
    }

    /// Merge mappings from file contents.  On error returns the 1-based
    /// line number of the first malformed line.
    fn merge(&mut self, contents: &str) -> Result<(), usize> {
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (from, to) = line.split_once('\t').ok_or(i + 1)?;
            self.map.insert(from.to_string(), to.to_string());
        }
        Ok(())
    }

    /// Display name for `layout`, or `layout` itself if unmapped.
    pub fn translate<'a>(&'a self, layout: &'a str) -> &'a str {
        self.map.get(layout).map(String::as_str).unwrap_or(layout)
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LayoutNames {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
