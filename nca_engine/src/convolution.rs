/// Engine v1 — Toroidal Convolution
///
/// C[r,c] = Σ K[dr,dc] · G[(r + dr − kh/2) mod H, (c + dc − kw/2) mod W]
///
/// Indices wrap in both axes. The kernel is applied as written (not
/// flipped); use `Kernel::flipped` for signal-processing orientation.
/// Rows are computed in parallel: each output cell reads only the input.

use rayon::prelude::*;

use crate::arithmetic::wrap_index;
use crate::grid::Grid;
use crate::kernel::Kernel;

/// Convolve `grid` with `kernel` on a torus. `grid` is not modified.
pub fn convolve_toroidal(grid: &Grid, kernel: &Kernel) -> Grid {
    let (height, width) = grid.shape();
    let mut out = Grid::zeros(height, width);

    out.cells_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(r, out_row)| convolve_row(grid, kernel, r, out_row));

    out
}

/// Fill one output row.
fn convolve_row(grid: &Grid, kernel: &Kernel, r: usize, out_row: &mut [f64]) {
    let (height, width) = grid.shape();
    let cr = kernel.center_row() as isize;
    let cc = kernel.center_col() as isize;

    for (c, out) in out_row.iter_mut().enumerate() {
        let mut acc = 0.0;
        for dr in 0..kernel.rows() {
            let src_row = grid.row(wrap_index(r, dr as isize - cr, height));
            for dc in 0..kernel.cols() {
                let w = kernel.weight(dr, dc);
                acc += w * src_row[wrap_index(c, dc as isize - cc, width)];
            }
        }
        *out = acc;
    }
}
