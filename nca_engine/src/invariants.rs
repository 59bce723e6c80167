/// Engine v1 — Frame Invariants
///
///   - every cell is finite and lies in [0, 1]
///   - every frame in a history has the same shape
///
/// The engine never calls these on its hot path; they guard frames that
/// come back from disk and back the property tests.

use crate::error::{EngineError, EngineResult};
use crate::grid::Grid;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check a single frame. Returns the first violation found.
pub fn try_validate_grid(grid: &Grid) -> EngineResult<()> {
    try_check_finite(grid)?;
    try_check_unit_range(grid)?;
    Ok(())
}

/// Check every frame and the shared shape.
pub fn try_validate_history(frames: &[Grid]) -> EngineResult<()> {
    let Some(first) = frames.first() else {
        return Ok(());
    };
    for (i, frame) in frames.iter().enumerate() {
        if frame.shape() != first.shape() {
            return Err(EngineError::Invariant(format!(
                "[INVARIANT:constant_shape] frame {} is {}x{}, frame 0 is {}x{}",
                i,
                frame.height(),
                frame.width(),
                first.height(),
                first.width()
            )));
        }
        try_validate_grid(frame)
            .map_err(|e| EngineError::Invariant(format!("frame {}: {}", i, e)))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn try_check_finite(grid: &Grid) -> EngineResult<()> {
    if let Some(pos) = grid.cells().iter().position(|v| !v.is_finite()) {
        let (r, c) = (pos / grid.width(), pos % grid.width());
        return Err(EngineError::Invariant(format!(
            "[INVARIANT:finite] cell ({}, {}) is {}",
            r,
            c,
            grid.cells()[pos]
        )));
    }
    Ok(())
}

fn try_check_unit_range(grid: &Grid) -> EngineResult<()> {
    if let Some(pos) = grid
        .cells()
        .iter()
        .position(|v| !(0.0..=1.0).contains(v))
    {
        let (r, c) = (pos / grid.width(), pos % grid.width());
        return Err(EngineError::Invariant(format!(
            "[INVARIANT:unit_range] cell ({}, {}) = {} outside [0, 1]",
            r,
            c,
            grid.cells()[pos]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_grid_passes() {
        let g = Grid::from_rows(&[vec![0.0, 0.5, 1.0]]).unwrap();
        assert!(try_validate_grid(&g).is_ok());
    }

    #[test]
    fn test_nan_reported_as_finite_violation() {
        let g = Grid::from_rows(&[vec![0.0, f64::NAN]]).unwrap();
        let msg = try_validate_grid(&g).unwrap_err().to_string();
        assert!(msg.contains("finite"), "got: {}", msg);
        assert!(msg.contains("(0, 1)"), "got: {}", msg);
    }

    #[test]
    fn test_negative_reported_as_range_violation() {
        let g = Grid::from_rows(&[vec![0.2], vec![-0.1]]).unwrap();
        let msg = try_validate_grid(&g).unwrap_err().to_string();
        assert!(msg.contains("unit_range"), "got: {}", msg);
    }

    #[test]
    fn test_history_reports_frame_index() {
        let mut bad = Grid::zeros(2, 2);
        bad.set(1, 1, 2.0);
        let msg = try_validate_history(&[Grid::zeros(2, 2), bad])
            .unwrap_err()
            .to_string();
        assert!(msg.contains("frame 1"), "got: {}", msg);
    }

    #[test]
    fn test_empty_history_is_valid() {
        assert!(try_validate_history(&[]).is_ok());
    }
}
