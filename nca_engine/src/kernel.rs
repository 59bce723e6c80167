/// Engine v1 — Kernel
///
/// Immutable odd×odd weight matrix, centered on the cell being updated.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Reference weights for the "moho" pattern.
pub const MOHO_WEIGHTS: [[f64; 3]; 3] = [
    [-0.84899998, 0.912, -0.84899998],
    [0.912, 0.0, 0.912],
    [-0.84899998, 0.912, -0.84899998],
];

/// Centered neighbour-weighting pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Kernel {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build from nested rows. Rejects empty, ragged or even-sized input.
    pub fn new(rows: &[Vec<f64>]) -> EngineResult<Self> {
        let kh = rows.len();
        let kw = rows.first().map(|r| r.len()).unwrap_or(0);
        if kh == 0 || kw == 0 {
            return Err(EngineError::Shape("kernel must not be empty".to_string()));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != kw) {
            return Err(EngineError::Shape(format!(
                "ragged kernel: row {} has {} weights, expected {}",
                bad,
                rows[bad].len(),
                kw
            )));
        }
        if kh % 2 == 0 || kw % 2 == 0 {
            return Err(EngineError::Shape(format!(
                "kernel dimensions must be odd, got {}x{}",
                kh, kw
            )));
        }
        Ok(Self {
            rows: kh,
            cols: kw,
            weights: rows.concat(),
        })
    }

    /// The reference 3×3 "moho" kernel.
    pub fn moho() -> Self {
        Self {
            rows: 3,
            cols: 3,
            weights: MOHO_WEIGHTS.iter().flatten().copied().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row offset of the center (`kh / 2`).
    pub fn center_row(&self) -> usize {
        self.rows / 2
    }

    /// Column offset of the center (`kw / 2`).
    pub fn center_col(&self) -> usize {
        self.cols / 2
    }

    pub fn weight(&self, dr: usize, dc: usize) -> f64 {
        self.weights[dr * self.cols + dc]
    }

    /// 180° rotation. Correlating with the flipped kernel is a true
    /// (signal-processing) convolution with the original.
    pub fn flipped(&self) -> Kernel {
        let mut weights = self.weights.clone();
        weights.reverse();
        Kernel {
            rows: self.rows,
            cols: self.cols,
            weights,
        }
    }

    /// Nested row form.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.weights.chunks(self.cols).map(|r| r.to_vec()).collect()
    }

    /// Sum of all weights.
    pub fn weight_sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl TryFrom<Vec<Vec<f64>>> for Kernel {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Kernel::new(&rows)
    }
}

impl From<Kernel> for Vec<Vec<f64>> {
    fn from(k: Kernel) -> Self {
        k.to_rows()
    }
}
