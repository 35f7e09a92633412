// src/transform/rewrite.rs

//! `rewrite-refs`: burn hashed asset paths into text files.
//!
//! Given one or more manifests produced by earlier `hash-rename` steps,
//! every embedded reference to an original asset path is replaced with its
//! hashed path. Rewriting must run strictly after the referenced assets'
//! hash step and strictly before the text file's own hash step, so that
//! references are part of the content that gets hashed; that ordering is
//! expressed by step order in the task declarations.
//!
//! Replacement is a single alternation regex over all manifest keys,
//! longest key first, guarded on the left so `biglogo.png` never matches
//! the `logo.png` entry. Hashed names embed the hash segment, so applying
//! the same manifest to an already-rewritten file is a no-op.
//!
//! Options:
//! - `manifest` (required): manifest name, or list of names to merge

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, anyhow};
use regex::Regex;
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::transform::{Transform, TransformBatch, TransformCtx, TransformResult};

pub struct RewriteRefs;

impl Transform for RewriteRefs {
    fn apply(
        &self,
        ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>> {
        let names = batch
            .options
            .get_str_list("manifest")
            .ok_or_else(|| PipelineError::Other(anyhow!("missing required option 'manifest'")))?;

        let mut mapping: BTreeMap<String, String> = BTreeMap::new();
        for name in names.iter() {
            let manifest = ctx
                .manifests
                .get(name)?
                .ok_or_else(|| PipelineError::UnknownManifest(name.clone()))?;
            for (original, hashed) in manifest.iter() {
                mapping.insert(original.to_string(), hashed.to_string());
            }
        }

        let replacer = RefReplacer::new(&mapping)?;
        let mut results = Vec::with_capacity(batch.inputs.len());

        for input in batch.inputs.iter() {
            let out_path = batch.output_dir.join(&input.rel);
            let outcome = fs::read_to_string(&input.abs)
                .with_context(|| format!("reading text file {:?}", input.abs))
                .and_then(|text| {
                    let rewritten = replacer.rewrite(&text);
                    if rewritten != text {
                        debug!(input = %input.rel, "rewrote asset references");
                    }
                    if let Some(parent) = out_path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&out_path, rewritten.as_bytes())
                        .with_context(|| format!("writing rewritten file {:?}", out_path))?;
                    Ok(())
                });

            match outcome {
                Ok(()) => results.push(TransformResult::written(&input.abs, &out_path)),
                Err(err) => results.push(TransformResult::failed(&input.abs, err.to_string())),
            }
        }

        Ok(results)
    }
}

/// Compiled reference replacer for one merged manifest mapping.
pub struct RefReplacer {
    pattern: Option<Regex>,
    mapping: BTreeMap<String, String>,
}

impl RefReplacer {
    pub fn new(mapping: &BTreeMap<String, String>) -> Result<Self> {
        if mapping.is_empty() {
            return Ok(Self {
                pattern: None,
                mapping: BTreeMap::new(),
            });
        }

        // Longest key first so `sub/logo.png` wins over a bare `logo.png`
        // starting inside it.
        let mut keys: Vec<&str> = mapping.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");

        // Left boundary: start of text or a char that cannot be part of a
        // path segment, so partial filenames never match.
        let pattern = Regex::new(&format!("(^|[^A-Za-z0-9_.-])({alternation})"))
            .map_err(|e| PipelineError::Other(anyhow!("building reference regex: {e}")))?;

        Ok(Self {
            pattern: Some(pattern),
            mapping: mapping.clone(),
        })
    }

    pub fn rewrite(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };
        pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let boundary = &caps[1];
                let key = &caps[2];
                match self.mapping.get(key) {
                    Some(hashed) => format!("{boundary}{hashed}"),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
