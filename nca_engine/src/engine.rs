/// Engine v1 — Simulation Engine
///
/// Top-level orchestrator. Owns the working grid; delegates to
/// convolution and the injected activation.
///
/// Per step i (0..N):
///   1. record `current` as snapshot i
///   2. convolve `current` with the kernel (toroidal)
///   3. apply the activation elementwise
///   4. persistent and i > 0: add snapshot i-1
///   5. clip to [0, 1]
///   6. `current` := result
///
/// Snapshot timing is PRE-UPDATE: snapshot i is the grid step i read,
/// not the grid it produced. The grid computed by the last step is
/// never recorded and is dropped with the engine. Existing renders
/// depend on this frame alignment; see `SnapshotTiming`.

use crate::activation::Activation;
use crate::convolution::convolve_toroidal;
use crate::error::{EngineError, EngineResult};
use crate::grid::Grid;
use crate::history::{FrameHistory, FrameSink};
use crate::invariants::try_validate_grid;
use crate::kernel::Kernel;

/// When a snapshot is taken relative to the update.
///
/// Only `PreUpdate` exists. A run of N steps therefore yields N frames,
/// the first being the untouched initial grid, and the N-th computed
/// grid is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTiming {
    PreUpdate,
}

/// Stateful engine running a fixed number of steps from a fixed start.
pub struct SimulationEngine<A = Box<dyn Activation>> {
    current: Grid,
    /// Snapshot i-1; only retained in persistent mode.
    previous: Option<Grid>,
    kernel: Kernel,
    activation: A,
    steps: usize,
    persistent: bool,
    index: usize,
}

impl<A: Activation> SimulationEngine<A> {
    /// Build an engine. Fails fast on a zero step count; grid and kernel
    /// shapes are already validated by their constructors.
    ///
    /// `initial` becomes snapshot 0 unchanged, so its cells must already
    /// lie in [0, 1]. Only debug builds check this.
    pub fn new(
        initial: Grid,
        kernel: Kernel,
        activation: A,
        steps: usize,
        persistent: bool,
    ) -> EngineResult<Self> {
        if steps == 0 {
            return Err(EngineError::Shape(
                "step count must be positive".to_string(),
            ));
        }
        debug_assert!(
            try_validate_grid(&initial).is_ok(),
            "initial grid must be finite and within [0, 1]"
        );
        Ok(Self {
            current: initial,
            previous: None,
            kernel,
            activation,
            steps,
            persistent,
            index: 0,
        })
    }

    pub const SNAPSHOT_TIMING: SnapshotTiming = SnapshotTiming::PreUpdate;

    /// Total number of steps (and frames) in the run.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Index of the next step to execute.
    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.steps
    }

    /// `(height, width)` of every frame this engine produces.
    pub fn shape(&self) -> (usize, usize) {
        self.current.shape()
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Execute one transition and return snapshot i (the pre-update grid).
    ///
    /// Returns `None` once all N steps have run.
    pub fn step(&mut self) -> Option<Grid> {
        if self.is_finished() {
            return None;
        }

        let act = &self.activation;
        let mut next = convolve_toroidal(&self.current, &self.kernel).map(|v| act.apply(v));

        if self.persistent && self.index > 0 {
            if let Some(prev) = &self.previous {
                next.add_assign(prev);
            }
        }
        next.clip_unit();

        // The old grid moves out as the snapshot; the history never
        // shares storage with the working buffer.
        let snapshot = std::mem::replace(&mut self.current, next);
        if self.persistent {
            self.previous = Some(snapshot.clone());
        }
        self.index += 1;
        Some(snapshot)
    }

    /// Run every remaining step and collect the snapshots.
    pub fn run(mut self) -> FrameHistory {
        let mut history = FrameHistory::with_capacity(self.steps - self.index);
        while let Some(frame) = self.step() {
            history.push(frame);
        }
        history
    }

    /// Streaming run: hand each snapshot to `sink` in order instead of
    /// buffering. Returns the number of frames delivered.
    pub fn run_into<S: FrameSink>(mut self, sink: &mut S) -> Result<usize, S::Error> {
        let mut delivered = 0;
        while let Some(frame) = self.step() {
            sink.accept(self.index - 1, &frame)?;
            delivered += 1;
        }
        Ok(delivered)
    }
}

impl<A: Activation> Iterator for SimulationEngine<A> {
    type Item = Grid;

    fn next(&mut self) -> Option<Grid> {
        self.step()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.steps - self.index;
        (left, Some(left))
    }
}
