// src/paths.rs

//! Logical path roots.
//!
//! All file references in the pipeline go through a named root (`src`,
//! `dev`, `tmp`, `dist`) plus a relative path — never an absolute path.
//! The mapping is built once from the `[paths]` section and passed by
//! reference into every component that touches the filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Roots that every configuration must define.
pub const REQUIRED_ROOTS: [&str; 4] = ["src", "dev", "tmp", "dist"];

/// Immutable logical-root table, read-only after construction.
#[derive(Debug, Clone)]
pub struct PathConfig {
    roots: BTreeMap<String, PathBuf>,
}

impl PathConfig {
    /// Build the table from configured root directories, joining relative
    /// entries onto `project_root` (the directory containing the config
    /// file).
    pub fn new(project_root: &Path, configured: &BTreeMap<String, PathBuf>) -> Self {
        let roots = configured
            .iter()
            .map(|(name, dir)| {
                let abs = if dir.is_absolute() {
                    dir.clone()
                } else {
                    project_root.join(dir)
                };
                (name.clone(), abs)
            })
            .collect();
        Self { roots }
    }

    /// Resolve a logical root name to its directory.
    pub fn resolve(&self, logical: &str) -> Result<&Path> {
        self.roots
            .get(logical)
            .map(PathBuf::as_path)
            .ok_or_else(|| PipelineError::UnknownRoot(logical.to_string()))
    }

    /// Resolve a root and join a relative path onto it.
    pub fn join(&self, logical: &str, rel: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.resolve(logical)?.join(rel))
    }

    /// Iterate over all configured root names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }
}
