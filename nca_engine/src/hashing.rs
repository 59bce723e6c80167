/// Engine v1 — Canonical Hashing
///
/// Deterministic binary layout + SHA-256, identical across platforms.
///
/// Grid layout:
///   - engine_version  u32 LE
///   - height          u64 LE
///   - width           u64 LE
///   - cells           f64 bit patterns, u64 LE, row-major
///
/// History hash: engine_version u32 LE, frame count u64 LE, then every
/// frame's grid layout in order. Raw bit patterns are hashed, so the hash
/// is a bit-identity check, not a tolerance check.

use std::convert::Infallible;

use sha2::{Digest, Sha256};

use crate::grid::Grid;
use crate::history::{FrameHistory, FrameSink};
use crate::ENGINE_VERSION;

/// Canonical bytes of one grid.
pub fn canonical_grid_bytes(grid: &Grid) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 16 + grid.cells().len() * 8);
    write_grid(&mut out, grid);
    out
}

/// SHA-256 of one grid's canonical bytes. Lowercase hex.
pub fn grid_hash(grid: &Grid) -> String {
    to_hex(&Sha256::digest(canonical_grid_bytes(grid)))
}

/// SHA-256 over a whole history. Lowercase hex.
pub fn history_hash(history: &FrameHistory) -> String {
    let mut hasher = HistoryHasher::new();
    for frame in history {
        hasher.update(frame);
    }
    hasher.finish(history.len())
}

/// Incremental history hash for streamed runs.
///
/// Produces the same digest as `history_hash` over the same frames.
pub struct HistoryHasher {
    frames: Sha256,
}

impl HistoryHasher {
    pub fn new() -> Self {
        Self {
            frames: Sha256::new(),
        }
    }

    pub fn update(&mut self, frame: &Grid) {
        self.frames.update(canonical_grid_bytes(frame));
    }

    /// Finalize. `count` must equal the number of `update` calls.
    pub fn finish(self, count: usize) -> String {
        // Header is hashed first, frames digest folded in after.
        let mut outer = Sha256::new();
        outer.update(ENGINE_VERSION.to_le_bytes());
        outer.update((count as u64).to_le_bytes());
        outer.update(self.frames.finalize());
        to_hex(&outer.finalize())
    }
}

impl FrameSink for HistoryHasher {
    type Error = Infallible;

    fn accept(&mut self, _index: usize, frame: &Grid) -> Result<(), Infallible> {
        self.update(frame);
        Ok(())
    }
}

impl Default for HistoryHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn write_grid(out: &mut Vec<u8>, grid: &Grid) {
    out.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    out.extend_from_slice(&(grid.height() as u64).to_le_bytes());
    out.extend_from_slice(&(grid.width() as u64).to_le_bytes());
    for v in grid.cells() {
        out.extend_from_slice(&v.to_bits().to_le_bytes());
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
