//! Replay orchestrator — rebuild a run's history from its config.
//!
//! Delegates all stepping to the engine. No cached state.
//!
//! Hash-only paths stream frames into the hasher; only `rebuild_history`
//! and `rebuild_state` keep the frames in memory.

use log::debug;

use nca_engine::hashing::{history_hash, HistoryHasher};
use nca_engine::history::FrameHistory;

use crate::config::{ConfigError, RunConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::manifest::RunManifest;

/// Run the engine described by `config` and return the full history.
pub fn rebuild_history(config: &RunConfig) -> Result<FrameHistory, ConfigError> {
    let engine = config.build_engine()?;
    Ok(engine.run())
}

/// Rebuild and return `(history, history_hash)`.
pub fn rebuild_state(config: &RunConfig) -> Result<(FrameHistory, String), ConfigError> {
    let history = rebuild_history(config)?;
    let hash = history_hash(&history);
    Ok((history, hash))
}

/// Rebuild and return only the history hash, one frame in memory at a time.
pub fn rebuild_hash(config: &RunConfig) -> Result<String, ConfigError> {
    let engine = config.build_engine()?;
    let mut hasher = HistoryHasher::new();
    let frames = match engine.run_into(&mut hasher) {
        Ok(n) => n,
        Err(never) => match never {},
    };
    Ok(hasher.finish(frames))
}

/// Run the same config twice and require identical hashes.
pub fn verify_determinism(config: &RunConfig) -> RuntimeResult<String> {
    let first = rebuild_hash(config)?;
    let second = rebuild_hash(config)?;
    debug!("determinism check: {} / {}", first, second);
    if first != second {
        return Err(RuntimeError::Determinism { first, second });
    }
    Ok(first)
}

/// Outcome of re-running a manifest's config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub expected_hash: String,
    pub actual_hash: String,
}

impl VerifyReport {
    pub fn matches(&self) -> bool {
        self.expected_hash == self.actual_hash
    }
}

/// Re-simulate a recorded run and compare its history hash.
pub fn verify_manifest(manifest: &RunManifest) -> RuntimeResult<VerifyReport> {
    let actual_hash = rebuild_hash(&manifest.config)?;
    Ok(VerifyReport {
        expected_hash: manifest.history_hash.clone(),
        actual_hash,
    })
}
