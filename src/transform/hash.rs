// src/transform/hash.rs

//! `hash-rename`: content-hash cache busting.
//!
//! Each input is copied into the output directory with a content-derived
//! identifier embedded before the extension (`logo.png -> logo.a1b2c3d4.png`),
//! and the original→hashed mapping is recorded as a named manifest for the
//! reference-rewrite step. The hash depends only on file content, so
//! re-running over byte-identical inputs yields byte-identical manifests.
//!
//! Options:
//! - `manifest` (required): name the produced manifest is stored under
//! - `hash_len`: hex characters to embed (default 8)

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use blake3::Hasher;
use tracing::debug;

use crate::errors::Result;
use crate::transform::{
    Manifest, Transform, TransformBatch, TransformCtx, TransformResult,
};

const DEFAULT_HASH_LEN: u64 = 8;

pub struct HashRename;

impl Transform for HashRename {
    fn apply(
        &self,
        ctx: &mut TransformCtx<'_>,
        batch: &TransformBatch,
    ) -> Result<Vec<TransformResult>> {
        let manifest_name = batch.options.require_str("manifest")?.to_string();
        let hash_len = batch.options.get_u64("hash_len").unwrap_or(DEFAULT_HASH_LEN) as usize;

        let mut manifest = Manifest::default();
        let mut results = Vec::with_capacity(batch.inputs.len());

        for input in batch.inputs.iter() {
            match hash_one(&input.abs, &input.rel, hash_len, batch) {
                Ok((hashed_rel, out_path)) => {
                    debug!(input = %input.rel, output = %hashed_rel, "hashed asset");
                    manifest.insert(input.rel.clone(), hashed_rel);
                    results.push(TransformResult::written(&input.abs, out_path));
                }
                Err(err) => {
                    results.push(TransformResult::failed(&input.abs, err.to_string()));
                }
            }
        }

        ctx.manifests.insert(&manifest_name, manifest)?;
        Ok(results)
    }
}

fn hash_one(
    abs: &Path,
    rel: &str,
    hash_len: usize,
    batch: &TransformBatch,
) -> anyhow::Result<(String, std::path::PathBuf)> {
    let digest = content_hash(abs)?;
    let short = &digest[..hash_len.min(digest.len())];

    let hashed_rel = insert_hash(rel, short);
    let out_path = batch.output_dir.join(&hashed_rel);

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(abs, &out_path)?;

    Ok((hashed_rel, out_path))
}

/// Hex blake3 digest of a file's contents, streamed in fixed-size chunks.
fn content_hash(path: &Path) -> anyhow::Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Embed the hash before the extension, keeping any directory prefix:
/// `single/logo.png` + `a1b2c3d4` → `single/logo.a1b2c3d4.png`.
/// Extensionless files get the hash as a suffix segment.
fn insert_hash(rel: &str, hash: &str) -> String {
    match rel.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') => {
            format!("{stem}.{hash}.{ext}")
        }
        _ => format!("{rel}.{hash}"),
    }
}
