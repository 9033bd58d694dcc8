//! Multilinear interpolation over regular grids.

use serde::{Deserialize, Serialize};

use crate::grid::{GridArray, GridAxes};

/// A function approximated by multilinear interpolation over precomputed
/// values on a regular grid.
///
/// Queries outside the grid bounds never fail: the boundary cell is used, so
/// the interpolant extrapolates linearly. This tolerates floating-point
/// boundary misses from downstream arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridInterpolant {
    axes: GridAxes,
    values: GridArray<f64>,
}

impl GridInterpolant {
    /// Wrap axes and a value array of matching shape.
    pub fn new(axes: GridAxes, values: GridArray<f64>) -> Option<Self> {
        if axes.shape() != values.shape() {
            return None;
        }
        Some(Self { axes, values })
    }

    /// Get the grid axes
    #[must_use]
    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    /// Get the number of dimensions
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.axes.ndim()
    }

    /// Interpolated value at a single point.
    ///
    /// `point` must have one coordinate per grid dimension.
    #[must_use]
    pub fn eval_one(&self, point: &[f64]) -> f64 {
        let ndim = self.axes.ndim();
        assert_eq!(point.len(), ndim, "query has wrong number of coordinates");

        // Per dimension, the cell spanning the coordinate and the fractional
        // position inside it. Clamping the cell to the boundary makes the
        // fraction run past [0, 1] for out-of-range coordinates, which is
        // exactly linear extrapolation.
        let mut cells = Vec::with_capacity(ndim);
        let mut fractions = Vec::with_capacity(ndim);
        for (dim, &x) in point.iter().enumerate() {
            let axis = self.axes.axis(dim);
            let upper = axis.partition_point(|&edge| edge <= x);
            let cell = upper.saturating_sub(1).min(axis.len() - 2);
            cells.push(cell);
            fractions.push((x - axis[cell]) / (axis[cell + 1] - axis[cell]));
        }

        // Weighted sum over the 2^n corners of the cell
        let mut value = 0.0;
        let mut corner = vec![0usize; ndim];
        for mask in 0..(1usize << ndim) {
            let mut weight = 1.0;
            for dim in 0..ndim {
                let upper_corner = mask >> dim & 1 == 1;
                corner[dim] = cells[dim] + usize::from(upper_corner);
                weight *= if upper_corner {
                    fractions[dim]
                } else {
                    1.0 - fractions[dim]
                };
            }
            value += weight * self.values[corner.as_slice()];
        }
        value
    }

    /// Interpolated values at a batch of points.
    #[must_use]
    pub fn eval_many(&self, points: &[Vec<f64>]) -> Vec<f64> {
        points.iter().map(|point| self.eval_one(point)).collect()
    }
}
