//! QR-based least squares with rank detection
//!
//! The factorization itself is `faer`'s Householder QR. Rank detection scans
//! the diagonal of R left to right: column j is aliased when `|R_jj|` falls
//! below `tol * ||x_j||`. An aliased column is dropped and the rest
//! refactored, so dependent columns are always the rightmost ones of a
//! dependent set and accepted columns keep their original order.

use crate::data::Matrix;
use faer::linalg::triangular_solve::solve_upper_triangular_in_place;
use faer::{Col, Mat, Par};
use ndarray::{Array1, ArrayView1};

/// Default relative tolerance for rank detection
pub const DEFAULT_RANK_TOLERANCE: f64 = 1e-7;

/// QR factorization of the linearly independent columns of an `n x p` matrix
#[derive(Debug, Clone)]
pub struct QrDecomposition {
    q: Mat<f64>,
    r_inverse: Mat<f64>,
    kept: Vec<usize>,
    ncols: usize,
}

impl QrDecomposition {
    /// Factorize `x`
    pub fn new(x: &Matrix, tol: f64) -> Self {
        let (n, p) = x.dim();
        let norms: Vec<f64> = x.columns().into_iter().map(|c| c.dot(&c).sqrt()).collect();

        let mut kept: Vec<usize> = (0..p).collect();
        let mut checked = 0;
        loop {
            if kept.is_empty() || n == 0 {
                return Self::empty(n, p);
            }

            let a = Mat::from_fn(n, kept.len(), |i, k| x[[i, kept[k]]]);
            let qr = a.qr();
            let r = qr.thin_R();

            let dependent = (checked..kept.len().min(n)).find(|&k| {
                let norm = norms[kept[k]];
                !(norm > 0.0 && r[(k, k)].abs() >= tol * norm)
            });
            if let Some(k) = dependent {
                kept.remove(k);
                checked = k;
                continue;
            }

            // n independent columns already span every row
            kept.truncate(n);
            let rank = kept.len();
            let r = Mat::from_fn(rank, rank, |i, j| r[(i, j)]);
            let mut r_inverse = Mat::<f64>::identity(rank, rank);
            solve_upper_triangular_in_place(r.as_ref(), r_inverse.as_mut(), Par::Seq);

            return Self {
                q: qr.compute_thin_Q(),
                r_inverse,
                kept,
                ncols: p,
            };
        }
    }

    fn empty(n: usize, p: usize) -> Self {
        Self {
            q: Mat::zeros(n, 0),
            r_inverse: Mat::zeros(0, 0),
            kept: Vec::new(),
            ncols: p,
        }
    }

    /// Numerical rank
    pub fn rank(&self) -> usize {
        self.kept.len()
    }

    /// Accepted columns followed by the aliased ones, each in original order
    pub fn pivot(&self) -> Vec<usize> {
        let aliased = self.aliased();
        let mut pivot = self.kept.clone();
        pivot.extend((0..self.ncols).filter(|&j| aliased[j]));
        pivot
    }

    /// Per original column, whether it was found linearly dependent
    pub fn aliased(&self) -> Vec<bool> {
        let mut mask = vec![true; self.ncols];
        for &j in &self.kept {
            mask[j] = false;
        }
        mask
    }

    /// Least-squares coefficients, NaN for dependent columns
    pub fn coefficients(&self, y: ArrayView1<f64>) -> Array1<f64> {
        let mut out = Array1::from_elem(self.ncols, f64::NAN);
        if self.kept.is_empty() {
            return out;
        }

        let y = Col::from_fn(y.len(), |i| y[i]);
        let qty = self.q.transpose() * &y;
        let beta = self.r_inverse.as_ref() * &qty;
        for (k, &j) in self.kept.iter().enumerate() {
            out[j] = beta[k];
        }
        out
    }

    /// `(X'X)^-1` over the accepted columns, in their original order
    pub fn unscaled_covariance(&self) -> Matrix {
        let rank = self.rank();
        let v = self.r_inverse.as_ref() * self.r_inverse.transpose();
        Matrix::from_shape_fn((rank, rank), |(i, j)| v[(i, j)])
    }
}
