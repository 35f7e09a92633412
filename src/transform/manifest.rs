// src/transform/manifest.rs

//! Manifests: the hand-off contract between hash-rename and
//! reference-rewrite steps.
//!
//! A manifest maps an asset's original relative path to its content-hashed
//! path. Within one process invocation the store serves manifests from
//! memory; every produced manifest is also persisted as TOML under the
//! store directory so separately invoked stages read exactly what the
//! earlier stage wrote.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Result;

/// Mapping from original relative path to hashed relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn insert(&mut self, original: impl Into<String>, hashed: impl Into<String>) {
        self.entries.insert(original.into(), hashed.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named manifests for the life of one run, backed by a directory of TOML
/// files (conventionally `<tmp>/.manifests/`).
#[derive(Debug)]
pub struct ManifestStore {
    dir: PathBuf,
    loaded: BTreeMap<String, Manifest>,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: BTreeMap::new(),
        }
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.toml"))
    }

    /// Record a manifest and persist it.
    pub fn insert(&mut self, name: &str, manifest: Manifest) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating manifest directory at {:?}", self.dir))?;

        let path = self.file_path(name);
        let contents = toml::to_string(&manifest)
            .with_context(|| format!("serializing manifest '{name}'"))?;
        fs::write(&path, contents)
            .with_context(|| format!("writing manifest '{name}' to {:?}", path))?;

        info!(manifest = %name, entries = manifest.len(), "stored manifest");
        self.loaded.insert(name.to_string(), manifest);
        Ok(())
    }

    /// Fetch a manifest, reading it from disk on first access.
    pub fn get(&mut self, name: &str) -> Result<Option<&Manifest>> {
        if !self.loaded.contains_key(name) {
            let path = self.file_path(name);
            if path.is_file() {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("reading manifest '{name}' from {:?}", path))?;
                let manifest: Manifest = toml::from_str(&contents)
                    .with_context(|| format!("parsing manifest '{name}' from {:?}", path))?;
                debug!(manifest = %name, entries = manifest.len(), "loaded manifest from disk");
                self.loaded.insert(name.to_string(), manifest);
            }
        }
        Ok(self.loaded.get(name))
    }

    /// Whether a manifest is available, in memory or on disk.
    pub fn exists(&self, name: &str) -> bool {
        self.loaded.contains_key(name) || self.file_path(name).is_file()
    }
}
