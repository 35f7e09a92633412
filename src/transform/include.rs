// src/transform/include.rs

//! `expand-includes`: textual include expansion for markup.
//!
//! Directives of the form `@@include("relative/path.html")` are replaced
//! with the referenced file's contents, resolved relative to the file
//! containing the directive and expanded recursively up to a fixed depth
//! (deeper nesting indicates an include loop and fails that input).
//! `@@project.name` and `@@project.version` interpolate the `[project]`
//! metadata into generated files.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, anyhow};
use regex::Regex;

use crate::config::model::ProjectSection;
use crate::errors::Result;
use crate::transform::{Transform, TransformBatch, TransformCtx, TransformResult};

const MAX_INCLUDE_DEPTH: usize = 8;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@@include\(\s*"([^"]+)"\s*\)"#).expect("include directive regex is valid")
});

pub struct ExpandIncludes;

impl Transform for ExpandIncludes {
    fn apply(
        &self,
        ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>> {
        let mut results = Vec::with_capacity(batch.inputs.len());

        for input in batch.inputs.iter() {
            let out_path = batch.output_dir.join(&input.rel);
            let outcome = expand_file(&input.abs, ctx.project, 0).and_then(|expanded| {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&out_path, expanded.as_bytes())
                    .with_context(|| format!("writing expanded file {:?}", out_path))?;
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

fn expand_file(path: &Path, project: &ProjectSection, depth: usize) -> anyhow::Result<String> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(anyhow!(
            "include depth exceeded {MAX_INCLUDE_DEPTH} at {:?} (include loop?)",
            path
        ));
    }

    let text = fs::read_to_string(path).with_context(|| format!("reading include {:?}", path))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut expanded = String::with_capacity(text.len());
    let mut last = 0;

    for caps in INCLUDE_RE.captures_iter(&text) {
        let whole = caps.get(0).expect("capture 0 always present");
        let target = base.join(&caps[1]);

        expanded.push_str(&text[last..whole.start()]);
        expanded.push_str(&expand_file(&target, project, depth + 1)?);
        last = whole.end();
    }
    expanded.push_str(&text[last..]);

    Ok(expanded
        .replace("@@project.name", &project.name)
        .replace("@@project.version", &project.version))
}
