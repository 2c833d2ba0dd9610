//! Numeric fitting of a design matrix against a response
//!
//! Gaussian models are solved directly by least squares on a QR
//! decomposition. Binomial and Poisson models are fit by iteratively
//! reweighted least squares. Linearly dependent design columns are dropped,
//! rightmost first, and reported through the alias mask.

mod family;
mod irls;
mod ols;

#[cfg(test)]
mod tests;

pub use family::Family;

use crate::base::{ModelError, Result};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use tilde_core::data::Matrix;
use tilde_core::design::DesignMatrix;
use tilde_core::linalg::DEFAULT_RANK_TOLERANCE;

/// Handling of rows with missing response or predictor values at fit time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NaAction {
    /// Drop incomplete rows and record their indices
    #[default]
    Omit,
    /// Raise a missing-data error on the first incomplete row
    Fail,
}

/// Fit configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub family: Family,
    /// Iteration cap for iterative fits
    pub max_iter: usize,
    /// Convergence tolerance on the relative coefficient change
    pub tolerance: f64,
    /// Relative tolerance for detecting linearly dependent columns
    pub rank_tolerance: f64,
    pub na_action: NaAction,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            family: Family::Gaussian,
            max_iter: 25,
            tolerance: 1e-8,
            rank_tolerance: DEFAULT_RANK_TOLERANCE,
            na_action: NaAction::Omit,
        }
    }
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(mut self, family: Family) -> Self {
        self.family = family;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn rank_tolerance(mut self, rank_tolerance: f64) -> Self {
        self.rank_tolerance = rank_tolerance;
        self
    }

    pub fn na_action(mut self, na_action: NaAction) -> Self {
        self.na_action = na_action;
        self
    }

    /// Reject option combinations no fit can run with
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(ModelError::invalid_config("max_iter must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ModelError::invalid_config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.rank_tolerance > 0.0 && self.rank_tolerance < 1.0) {
            return Err(ModelError::invalid_config(format!(
                "rank_tolerance must lie in (0, 1), got {}",
                self.rank_tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a numeric fit
#[derive(Debug, Clone)]
pub struct FitSolution {
    /// One estimate per design column, NaN where aliased
    pub coefficients: Array1<f64>,
    /// Per design column, whether it was dropped as linearly dependent
    pub aliased: Vec<bool>,
    pub rank: usize,
    /// `(X'WX)^-1` over the kept columns, in design order
    pub unscaled_covariance: Matrix,
    /// Fitted means
    pub fitted: Array1<f64>,
    pub linear_predictor: Array1<f64>,
    pub deviance: f64,
    /// IRLS iterations, zero for direct least squares
    pub iterations: usize,
}

impl FitSolution {
    /// Indices of the kept design columns
    pub fn kept(&self) -> Vec<usize> {
        (0..self.aliased.len()).filter(|&j| !self.aliased[j]).collect()
    }

    pub fn df_residual(&self) -> usize {
        self.fitted.len().saturating_sub(self.rank)
    }
}

/// Least-squares and IRLS solver over a design matrix
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelFitter {
    options: FitOptions,
}

impl ModelFitter {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Fit `y` on the columns of `x`
    ///
    /// `x` and `y` must be complete; missing-value handling happens upstream.
    pub fn fit(&self, x: &DesignMatrix, y: ArrayView1<f64>) -> Result<FitSolution> {
        self.options.validate()?;

        if x.nrows() != y.len() {
            return Err(ModelError::Formula(
                tilde_core::formula::FormulaError::DimensionMismatch {
                    message: "design matrix and response differ in length".to_string(),
                    expected: format!("{} rows", x.nrows()),
                    actual: format!("{} responses", y.len()),
                },
            ));
        }
        if y.iter().any(|v| !v.is_finite()) || x.matrix.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::numerical(
                "design matrix or response contains non-finite values",
                "fit",
            ));
        }

        let solution = match self.options.family {
            Family::Gaussian => ols::fit(x, y, &self.options)?,
            Family::Binomial | Family::Poisson => irls::fit(x, y, &self.options)?,
        };

        let n = y.len();
        if x.ncols() > 0 && solution.rank == 0 {
            return Err(ModelError::SingularFit {
                message: "every design column is zero".to_string(),
                rank: 0,
                n_obs: n,
            });
        }
        if n <= solution.rank {
            return Err(ModelError::SingularFit {
                message: "no residual degrees of freedom".to_string(),
                rank: solution.rank,
                n_obs: n,
            });
        }

        let aliased: Vec<&str> = x
            .names
            .iter()
            .zip(&solution.aliased)
            .filter(|(_, a)| **a)
            .map(|(name, _)| name.as_str())
            .collect();
        if !aliased.is_empty() {
            log::warn!(
                "{} coefficient(s) not estimable because of singularities: {}",
                aliased.len(),
                aliased.join(", ")
            );
        }

        Ok(solution)
    }
}

/// `X beta` with aliased (NaN) coefficients treated as zero
pub(crate) fn linear_predictor(x: &Matrix, beta: &Array1<f64>) -> Array1<f64> {
    let beta = beta.mapv(|b| if b.is_nan() { 0.0 } else { b });
    x.dot(&beta)
}

/// Keep the given columns of a matrix
pub(crate) fn select_columns(x: &Matrix, kept: &[usize]) -> Matrix {
    x.select(ndarray::Axis(1), kept)
}
