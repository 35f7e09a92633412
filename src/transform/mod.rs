// src/transform/mod.rs

//! Transforms and the registry that names them.
//!
//! A transform is a file-to-file conversion with a uniform contract: it
//! receives a batch of matched input files and an output directory, and
//! returns one terminal outcome per input. The contract guarantees:
//!
//! - it never writes outside the batch's output directory (manifests go
//!   through the [`manifest::ManifestStore`], which owns its own location)
//! - it is deterministic for identical inputs and options
//! - a failing input is reported individually without aborting unaffected
//!   files in the same batch; all-or-nothing tools (e.g. a module bundler
//!   driven through `run-command`) simply report every input as failed
//!
//! The built-ins cover the file-level work the pipeline owns itself
//! (copy, content-hash rename, reference rewrite, include expansion) and
//! a shell adapter for external compilers/minifiers/compressors.

pub mod command;
pub mod copy;
pub mod hash;
pub mod include;
pub mod manifest;
pub mod rewrite;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::anyhow;

use crate::config::model::ProjectSection;
use crate::errors::{PipelineError, Result};
use crate::globs::MatchedFile;
use crate::paths::PathConfig;

pub use manifest::{Manifest, ManifestStore};

/// Option map attached to a transform step, with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    map: BTreeMap<String, toml::Value>,
}

impl TransformOptions {
    pub fn new(map: BTreeMap<String, toml::Value>) -> Self {
        Self { map }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(|v| v.as_str())
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| PipelineError::Other(anyhow!("missing required option '{key}'")))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(|v| v.as_integer()).map(|i| i as u64)
    }

    /// Accepts either a single string or an array of strings.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        match self.map.get(key) {
            Some(toml::Value::String(s)) => Some(vec![s.to_string()]),
            Some(toml::Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Everything a transform may reach beyond its own batch: logical roots,
/// project metadata for banner interpolation, and the manifest store.
pub struct TransformCtx<'a> {
    pub paths: &'a PathConfig,
    pub project: &'a ProjectSection,
    pub manifests: &'a mut ManifestStore,
}

/// One invocation's worth of work: the matched inputs, where they live,
/// where outputs go, and the step's options.
#[derive(Debug, Clone)]
pub struct TransformBatch {
    pub inputs: Vec<MatchedFile>,
    /// Directory the inputs' relative paths are rooted at.
    pub input_root: PathBuf,
    pub output_dir: PathBuf,
    pub options: TransformOptions,
}

/// Terminal outcome for a single input file.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Output written at this path.
    Written(PathBuf),
    /// This input failed; the rest of the batch still ran.
    Failed(String),
}

/// Per-input result of a transform invocation.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub input: PathBuf,
    pub outcome: Outcome,
}

impl TransformResult {
    pub fn written(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            outcome: Outcome::Written(output.into()),
        }
    }

    pub fn failed(input: impl Into<PathBuf>, cause: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            outcome: Outcome::Failed(cause.into()),
        }
    }
}

/// The uniform transform contract.
pub trait Transform: Send + Sync {
    fn apply(
        &self,
        ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>>;
}

/// Mapping from transform name to implementation.
pub struct TransformRegistry {
    map: BTreeMap<String, Box<dyn Transform>>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    /// An empty registry; callers register everything themselves.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the built-in transforms.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("copy", Box::new(copy::CopyFiles));
        registry.register("hash-rename", Box::new(hash::HashRename));
        registry.register("rewrite-refs", Box::new(rewrite::RewriteRefs));
        registry.register("expand-includes", Box::new(include::ExpandIncludes));
        registry.register("run-command", Box::new(command::RunCommand));
        registry
    }

    /// Register a transform. A name registered twice is replaced.
    pub fn register(&mut self, name: &str, transform: Box<dyn Transform>) {
        self.map.insert(name.to_string(), transform);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Invoke a registered transform.
    pub fn invoke(
        &self,
        name: &str,
        ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>> {
        let transform = self
            .map
            .get(name)
            .ok_or_else(|| PipelineError::UnknownTransform(name.to_string()))?;
        transform.apply(ctx, batch)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}
