//! Run manifest — a deterministic record of what a run produced.
//!
//! Written next to the output as `<output>.manifest.json`. Contains the
//! full config, the history hash and (for single-file outputs) the
//! SHA-256 of the artifact. No timestamps, so identical runs produce
//! byte-identical manifests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use nca_engine::ENGINE_VERSION;

use crate::config::RunConfig;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("manifest io error: {0}")]
    Io(#[from] io::Error),

    #[error("manifest parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest from engine v{found}, this is v{expected}")]
    Version { found: u32, expected: u32 },
}

/// Manifest on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunManifest {
    pub engine_version: u32,
    pub config: RunConfig,
    /// Snapshots the engine recorded (always `config.steps`).
    pub frames: usize,
    /// Snapshots that made it into the artifact after parity filtering.
    pub exported_frames: usize,
    pub history_hash: String,
    pub output: PathBuf,
    /// SHA-256 of the output file; `None` for PNG directories.
    pub output_sha256: Option<String>,
}

impl RunManifest {
    pub fn new(
        config: &RunConfig,
        frames: usize,
        exported_frames: usize,
        history_hash: String,
    ) -> Self {
        Self {
            engine_version: ENGINE_VERSION,
            config: config.clone(),
            frames,
            exported_frames,
            history_hash,
            output: config.output.clone(),
            output_sha256: None,
        }
    }
}

/// `<output>.manifest.json`, beside the output.
pub fn manifest_path_for(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".manifest.json");
    output.with_file_name(name)
}

/// SHA-256 of a file's bytes. Lowercase hex.
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

pub fn save_manifest(path: &Path, manifest: &RunManifest) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(path, content.as_bytes())?;
    Ok(())
}

/// Load a manifest, rejecting ones written by another engine version.
pub fn load_manifest(path: &Path) -> Result<RunManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    let manifest: RunManifest = serde_json::from_str(&content)?;
    if manifest.engine_version != ENGINE_VERSION {
        return Err(ManifestError::Version {
            found: manifest.engine_version,
            expected: ENGINE_VERSION,
        });
    }
    Ok(manifest)
}
