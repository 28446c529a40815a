//! Reach coefficients
//!
//! Which demand points lie within a radius of which candidate sites.

use nalgebra::DMatrix;
use rayon::prelude::*;

/// Cell count above which the reach matrix is computed in parallel.
const PARALLEL_CELLS: usize = 10_000;

/// Boolean matrix of which demand points lie within a threshold of which sites.
///
/// Rows are demand points and columns are candidate sites, the same shape as
/// the distance matrix it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachMatrix {
    reach: DMatrix<bool>,
}

impl ReachMatrix {
    /// Compute `distances[i][j] <= threshold` element-wise.
    ///
    /// A distance equal to the threshold is reachable; NaN never is.
    pub fn compute(distances: &DMatrix<f64>, threshold: f64) -> Self {
        let (n_rows, n_cols) = distances.shape();

        // Storage is column-major on both sides, so the flat layout carries over
        let flags: Vec<bool> = if n_rows * n_cols > PARALLEL_CELLS {
            distances
                .as_slice()
                .par_iter()
                .map(|&d| d <= threshold)
                .collect()
        } else {
            distances.iter().map(|&d| d <= threshold).collect()
        };

        Self {
            reach: DMatrix::from_vec(n_rows, n_cols, flags),
        }
    }

    pub fn nrows(&self) -> usize {
        self.reach.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.reach.ncols()
    }

    /// Whether demand point `i` is reachable from site `j`.
    pub fn reaches(&self, i: usize, j: usize) -> bool {
        self.reach[(i, j)]
    }

    /// Reach as a 0/1 constraint coefficient.
    pub fn coefficient(&self, i: usize, j: usize) -> f64 {
        if self.reach[(i, j)] {
            1.0
        } else {
            0.0
        }
    }

    /// Sites that reach demand point `i`.
    pub fn sites_reaching(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.ncols()).filter(move |&j| self.reach[(i, j)])
    }
}
