//! Design matrices: categorical encoding, transform bases and assembly
//!
//! Column order is deterministic: intercept, main effects, transforms, then
//! interactions by increasing order. Categorical variables contribute one
//! indicator column per non-reference level.

mod builder;
mod encoder;
mod transform;


pub use builder::{DesignSpec, INTERCEPT};
pub use encoder::{CategoricalEncoder, Factor, LevelPolicy, UnseenLevels};
pub use transform::{FittedTransform, TransformKind};

use crate::data::Matrix;
use crate::linalg::QrDecomposition;

/// Named numeric columns, row-aligned with the source data
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    pub names: Vec<String>,
    pub matrix: Matrix,
    /// Term index per column, 0 for the intercept
    pub assign: Vec<usize>,
}

/// Outcome of a rank check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankCheck {
    pub rank: usize,
    /// Per column, whether it is linearly dependent on columns to its left
    pub aliased: Vec<bool>,
    /// Names of the dependent columns
    pub aliased_names: Vec<String>,
}

impl RankCheck {
    pub fn is_full_rank(&self) -> bool {
        self.aliased_names.is_empty()
    }
}

impl DesignMatrix {
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Column by name
    pub fn column(&self, name: &str) -> Option<ndarray::ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.matrix.column(j))
    }

    /// Rows without any missing (NaN) entry
    pub fn complete_rows(&self) -> Vec<bool> {
        self.matrix
            .rows()
            .into_iter()
            .map(|row| row.iter().all(|v| !v.is_nan()))
            .collect()
    }

    /// Keep the rows selected by `mask`
    pub fn select_rows(&self, mask: &[bool]) -> DesignMatrix {
        let rows: Vec<usize> = (0..self.nrows()).filter(|&i| mask.get(i) == Some(&true)).collect();
        DesignMatrix {
            names: self.names.clone(),
            matrix: self.matrix.select(ndarray::Axis(0), &rows),
            assign: self.assign.clone(),
        }
    }

    /// Detect exact linear dependence among the columns of the complete rows
    pub fn check_rank(&self, tol: f64) -> RankCheck {
        let complete = self.select_rows(&self.complete_rows());
        let qr = QrDecomposition::new(&complete.matrix, tol);
        let aliased = qr.aliased();
        let aliased_names = self
            .names
            .iter()
            .zip(&aliased)
            .filter(|(_, a)| **a)
            .map(|(n, _)| n.clone())
            .collect();

        RankCheck {
            rank: qr.rank(),
            aliased,
            aliased_names,
        }
    }
}
