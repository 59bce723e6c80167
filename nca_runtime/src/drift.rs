//! Drift detection — compare two frame histories cell by cell.

use nca_engine::history::FrameHistory;

/// Structured comparison of two histories.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    pub len_a: usize,
    pub len_b: usize,
    pub len_delta: i64,
    /// Frames compared (the common prefix).
    pub compared: usize,
    /// True when the two histories have different frame shapes.
    pub shape_mismatch: bool,
    /// First index whose frames differ in any cell.
    pub first_divergent: Option<usize>,
    /// Number of compared frames that differ.
    pub divergent_frames: usize,
    /// Largest absolute cell difference across compared frames.
    pub max_abs_diff: f64,
}

impl DriftReport {
    /// Same length, same shape, every cell bit-equal.
    pub fn is_identical(&self) -> bool {
        self.len_delta == 0 && !self.shape_mismatch && self.first_divergent.is_none()
    }
}

pub fn compare_histories(a: &FrameHistory, b: &FrameHistory) -> DriftReport {
    let shape_mismatch = match (a.shape(), b.shape()) {
        (Some(sa), Some(sb)) => sa != sb,
        _ => false,
    };

    let mut first_divergent = None;
    let mut divergent_frames = 0;
    let mut max_abs_diff: f64 = 0.0;
    let compared = if shape_mismatch { 0 } else { a.len().min(b.len()) };

    for (i, (fa, fb)) in a.iter().zip(b.iter()).take(compared).enumerate() {
        let mut frame_differs = false;
        for (&x, &y) in fa.cells().iter().zip(fb.cells()) {
            if x.to_bits() != y.to_bits() {
                frame_differs = true;
                max_abs_diff = max_abs_diff.max((x - y).abs());
            }
        }
        if frame_differs {
            divergent_frames += 1;
            first_divergent.get_or_insert(i);
        }
    }

    DriftReport {
        len_a: a.len(),
        len_b: b.len(),
        len_delta: b.len() as i64 - a.len() as i64,
        compared,
        shape_mismatch,
        first_divergent,
        divergent_frames,
        max_abs_diff,
    }
}
