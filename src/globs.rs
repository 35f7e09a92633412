// src/globs.rs

//! Glob compilation and rooted directory scanning.
//!
//! Both step input selection and watch rules express file sets as glob
//! patterns relative to a logical root. This module owns the compilation
//! of those patterns and the walk that expands them against the filesystem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// Build a [`GlobSet`] from string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// A file matched under a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Absolute (root-joined) path.
    pub abs: PathBuf,
    /// Path relative to the scan root, forward slashes.
    pub rel: String,
}

/// Walk `root` and return every file matching `include` but not `exclude`.
///
/// Results are sorted by relative path so downstream work (hashing,
/// manifests, logs) is deterministic regardless of directory order.
/// A missing root yields an empty set rather than an error: a stage may
/// legitimately match nothing (e.g. a project without sprite images).
pub fn scan(root: &Path, include: &GlobSet, exclude: Option<&GlobSet>) -> Vec<MatchedFile> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut matched = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = relative_str(root, entry.path()) else {
            continue;
        };
        if !include.is_match(&rel) {
            continue;
        }
        if let Some(ex) = exclude {
            if ex.is_match(&rel) {
                continue;
            }
        }
        matched.push(MatchedFile {
            abs: entry.path().to_path_buf(),
            rel,
        });
    }

    matched.sort_by(|a, b| a.rel.cmp(&b.rel));
    matched
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root` and cannot be relativized.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s)
}
