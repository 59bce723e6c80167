/// Engine v1 — Grid
///
/// Fixed-size H×W matrix of f64, stored row-major.
/// Dimensions never change after construction.

use serde::{Deserialize, Serialize};

use crate::arithmetic::{clip_unit, wrap_index};
use crate::error::{EngineError, EngineResult};

/// A rectangular field of cell values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<f64>,
}

/// Unchecked wire form; converted through `Grid::from_cells`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGrid {
    height: usize,
    width: usize,
    cells: Vec<f64>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = EngineError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        Grid::from_cells(raw.height, raw.width, raw.cells)
    }
}

impl Grid {
    /// All-zero grid. Panics on a zero dimension; use `try_zeros` for input.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self::try_zeros(height, width).unwrap_or_else(|e| panic!("{}", e))
    }

    /// All-zero grid, rejecting zero dimensions.
    pub fn try_zeros(height: usize, width: usize) -> EngineResult<Self> {
        let len = check_dims(height, width)?;
        Ok(Self {
            height,
            width,
            cells: vec![0.0; len],
        })
    }

    /// Build from a row-major cell vector.
    pub fn from_cells(height: usize, width: usize, cells: Vec<f64>) -> EngineResult<Self> {
        let len = check_dims(height, width)?;
        if cells.len() != len {
            return Err(EngineError::Shape(format!(
                "grid {}x{} needs {} cells, got {}",
                height,
                width,
                len,
                cells.len()
            )));
        }
        Ok(Self { height, width, cells })
    }

    /// Build from nested rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> EngineResult<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(EngineError::Shape(format!(
                "ragged grid: row {} has {} cells, expected {}",
                bad,
                rows[bad].len(),
                width
            )));
        }
        Self::from_cells(height, width, rows.concat())
    }

    /// Zero grid with each listed `(row, col)` set to 1.
    ///
    /// Coordinates outside the grid are a shape error, not wrapped.
    pub fn from_active_cells(
        height: usize,
        width: usize,
        cells: &[(usize, usize)],
    ) -> EngineResult<Self> {
        let mut grid = Self::try_zeros(height, width)?;
        for &(row, col) in cells {
            if row >= height || col >= width {
                return Err(EngineError::Shape(format!(
                    "active cell ({}, {}) outside {}x{} grid",
                    row, col, height, width
                )));
            }
            grid.set(row, col, 1.0);
        }
        Ok(grid)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [f64] {
        &mut self.cells
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cells[row * self.width + col] = value;
    }

    /// Circular shift: cell `(r, c)` moves to `(r + dr, c + dc)` modulo the shape.
    pub fn roll(&self, dr: isize, dc: isize) -> Grid {
        let mut out = Grid {
            height: self.height,
            width: self.width,
            cells: vec![0.0; self.cells.len()],
        };
        for r in 0..self.height {
            let tr = wrap_index(r, dr, self.height);
            for c in 0..self.width {
                let tc = wrap_index(c, dc, self.width);
                out.set(tr, tc, self.get(r, c));
            }
        }
        out
    }

    /// Apply `f` to every cell, producing a new grid.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Grid {
        Grid {
            height: self.height,
            width: self.width,
            cells: self.cells.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Elementwise sum in place. Shapes must match.
    pub fn add_assign(&mut self, other: &Grid) {
        assert_eq!(
            self.shape(),
            other.shape(),
            "grid shape mismatch in elementwise add"
        );
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += b;
        }
    }

    /// Clamp every cell to `[0, 1]` in place.
    pub fn clip_unit(&mut self) {
        for v in &mut self.cells {
            *v = clip_unit(*v);
        }
    }

    /// Sum of all cell values.
    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }
}

/// Cell count of a `height`×`width` grid, or a shape error.
fn check_dims(height: usize, width: usize) -> EngineResult<usize> {
    if height == 0 || width == 0 {
        return Err(EngineError::Shape(format!(
            "grid dimensions must be positive, got {}x{}",
            height, width
        )));
    }
    height.checked_mul(width).ok_or_else(|| {
        EngineError::Shape(format!(
            "grid {}x{} has more cells than fit in memory",
            height, width
        ))
    })
}
