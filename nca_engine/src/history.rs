//! Frame history — the ordered snapshots a run produces.
//!
//! Append-only while the engine runs (crate-private push), read-only
//! afterwards. Each entry is an owned copy, never a view of the
//! engine's working buffer.

use std::convert::Infallible;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::grid::Grid;
use crate::invariants::try_validate_history;

/// Receives snapshots in step order.
pub trait FrameSink {
    type Error;

    /// Called once per step with the snapshot recorded at `index`.
    fn accept(&mut self, index: usize, frame: &Grid) -> Result<(), Self::Error>;
}

/// Which frames a parity filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// Indices 0, 2, 4, ...
    Even,
    /// Indices 1, 3, 5, ...
    Odd,
}

impl Parity {
    pub fn keeps(self, index: usize) -> bool {
        match self {
            Parity::Even => index % 2 == 0,
            Parity::Odd => index % 2 == 1,
        }
    }
}

/// Ordered, finite sequence of grid snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameHistory {
    frames: Vec<Grid>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            frames: Vec::with_capacity(n),
        }
    }

    /// Rebuild a history from stored frames, enforcing the range and
    /// constant-shape invariants.
    pub fn from_frames(frames: Vec<Grid>) -> EngineResult<Self> {
        try_validate_history(&frames)?;
        Ok(Self { frames })
    }

    pub(crate) fn push(&mut self, frame: Grid) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Grid> {
        self.frames.get(index)
    }

    pub fn first(&self) -> Option<&Grid> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Grid> {
        self.frames.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Grid> {
        self.frames.iter()
    }

    pub fn frames(&self) -> &[Grid] {
        &self.frames
    }

    /// Shape shared by every frame, or `None` when empty.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.frames.first().map(Grid::shape)
    }

    pub fn into_frames(self) -> Vec<Grid> {
        self.frames
    }

    /// `(index, frame)` pairs kept by `parity`, in order.
    pub fn select_parity(&self, parity: Parity) -> impl Iterator<Item = (usize, &Grid)> {
        self.frames
            .iter()
            .enumerate()
            .filter(move |(i, _)| parity.keeps(*i))
    }
}

impl Index<usize> for FrameHistory {
    type Output = Grid;

    fn index(&self, index: usize) -> &Grid {
        &self.frames[index]
    }
}

impl<'a> IntoIterator for &'a FrameHistory {
    type Item = &'a Grid;
    type IntoIter = std::slice::Iter<'a, Grid>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl FrameSink for FrameHistory {
    type Error = Infallible;

    fn accept(&mut self, _index: usize, frame: &Grid) -> Result<(), Infallible> {
        self.push(frame.clone());
        Ok(())
    }
}
