// src/transform/command.rs

//! `run-command`: adapter for external collaborators.
//!
//! Style compilers, image compressors, linters, module bundlers and
//! minifiers stay outside this crate; this transform shells out to them
//! one input at a time with `{input}` / `{output}` substituted into the
//! command template. A nonzero exit fails that input only; the rest of
//! the batch still runs. There is no timeout — a hung tool blocks the
//! pipeline, which is documented rather than masked.
//!
//! Options:
//! - `cmd` (required): shell template, e.g. `"sassc {input} {output}"`
//! - `ext`: replace the output file's extension, e.g. `".css"`

use std::fs;
use std::process::Command;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::transform::{Transform, TransformBatch, TransformCtx, TransformResult};

pub struct RunCommand;

impl Transform for RunCommand {
    fn apply(
        &self,
        _ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>> {
        let template = batch.options.require_str("cmd")?.to_string();
        let ext = batch.options.get_str("ext").map(str::to_string);

        let mut results = Vec::with_capacity(batch.inputs.len());

        for input in batch.inputs.iter() {
            let out_rel = match &ext {
                Some(ext) => swap_extension(&input.rel, ext),
                None => input.rel.clone(),
            };
            let out_path = batch.output_dir.join(&out_rel);

            let outcome = (|| -> anyhow::Result<()> {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let cmd = template
                    .replace("{input}", &input.abs.to_string_lossy())
                    .replace("{output}", &out_path.to_string_lossy());

                debug!(input = %input.rel, cmd = %cmd, "running external command");
                let output = shell(&cmd).output()?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    warn!(input = %input.rel, "external command failed");
                    anyhow::bail!(
                        "command exited with {}: {}",
                        output.status,
                        stderr.trim_end()
                    );
                }
                Ok(())
            })();

            match outcome {
                Ok(()) => results.push(TransformResult::written(&input.abs, &out_path)),
                Err(err) => results.push(TransformResult::failed(&input.abs, err.to_string())),
            }
        }

        Ok(results)
    }
}

/// Build a platform-appropriate shell invocation.
fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// `page/home.scss` + `.css` → `page/home.css`.
fn swap_extension(rel: &str, ext: &str) -> String {
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    match rel.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => format!("{stem}.{ext}"),
        _ => format!("{rel}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_swap_keeps_directories() {
        assert_eq!(swap_extension("page/home.scss", ".css"), "page/home.css");
        assert_eq!(swap_extension("app.js", "min.js"), "app.min.js");
        assert_eq!(swap_extension("LICENSE", ".txt"), "LICENSE.txt");
    }
}
