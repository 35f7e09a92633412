// src/transform/copy.rs

//! `copy`: glob-to-directory copy preserving relative subpaths.

use std::fs;

use tracing::debug;

use crate::errors::Result;
use crate::transform::{Transform, TransformBatch, TransformCtx, TransformResult};

pub struct CopyFiles;

impl Transform for CopyFiles {
    fn apply(
        &self,
        _ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>> {
        let mut results = Vec::with_capacity(batch.inputs.len());

        for input in batch.inputs.iter() {
            let out_path = batch.output_dir.join(&input.rel);
            let outcome = (|| -> std::io::Result<()> {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&input.abs, &out_path)?;
                Ok(())
            })();

            match outcome {
                Ok(()) => {
                    debug!(input = %input.rel, "copied");
                    results.push(TransformResult::written(&input.abs, &out_path));
                }
                Err(err) => results.push(TransformResult::failed(&input.abs, err.to_string())),
            }
        }

        Ok(results)
    }
}
