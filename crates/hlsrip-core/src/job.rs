//! Job identity and filesystem layout.
//!
//! A job is one manifest URL destined for one output artifact. Its stable
//! identity is a content hash of the URL's path component; the hash keys the
//! per-job segment cache so repeated runs resume instead of refetching.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::manifest::SEGMENT_EXT;

/// Hex chars kept from the SHA-256 digest for the job identifier.
const HASH_LEN: usize = 32;

/// Segment files are named by zero-padded ordinal so lexical filename order
/// equals playback order.
///
/// The padding is four digits wide; ordinals past 9999 widen and lose the
/// lexical-order guarantee. Assembly is unaffected (segment paths are always
/// derived from ordinals, never from directory listings), but anything
/// sorting the cache by name is bounded at 10000 segments per job.
pub fn segment_filename(ordinal: usize) -> String {
    format!("{:04}{}", ordinal, SEGMENT_EXT)
}

/// Content hash of a manifest URL: truncated SHA-256 of the path component.
/// Stable across query-string churn (tokens, expiry) on the same path.
pub fn content_hash(manifest_url: &str) -> Result<String> {
    let parsed = url::Url::parse(manifest_url)
        .map_err(|e| anyhow!("invalid manifest URL {}: {}", manifest_url, e))?;
    let digest = Sha256::digest(parsed.path().as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    Ok(hash)
}

/// One end-to-end request: convert one manifest URL into one output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub manifest_url: String,
    /// Final artifact filename, including the container extension.
    pub output_name: String,
    /// Stable job identifier; names the working directory.
    pub hash: String,
}

impl Job {
    /// Builds a job from a manifest URL and a requested output name.
    ///
    /// An empty name, or one without the container extension, is replaced by
    /// `<hash>.<container>` so every job always has a usable artifact name.
    pub fn new(manifest_url: &str, requested_name: &str, container: &str) -> Result<Self> {
        let hash = content_hash(manifest_url)?;
        let suffix = format!(".{}", container);
        let output_name = if requested_name.is_empty() || !requested_name.ends_with(&suffix) {
            format!("{}{}", hash, suffix)
        } else {
            requested_name.to_string()
        };
        Ok(Job {
            manifest_url: manifest_url.to_string(),
            output_name,
            hash,
        })
    }

    /// Per-job segment cache directory under the temp root.
    pub fn work_dir(&self, temp_root: &Path) -> PathBuf {
        temp_root.join(&self.hash)
    }

    /// Final artifact path under the output root.
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.output_name)
    }
}
