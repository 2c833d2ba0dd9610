//! Core building blocks for formula-driven modelling
//!
//! - [`data`]: column-typed data frames with missing values
//! - [`formula`]: R-style formula parsing, binding and term expansion
//! - [`design`]: categorical encoding, transform bases and design matrices
//! - [`linalg`]: QR least squares with rank detection

pub mod data;
pub mod design;
pub mod formula;
pub mod linalg;

pub use data::{ColumnKind, DataError, DataFrame, DataFrameBuilder, Schema, Series};
pub use design::{
    CategoricalEncoder, DesignMatrix, DesignSpec, Factor, LevelPolicy, RankCheck, UnseenLevels,
};
pub use formula::{Formula, FormulaError, FormulaResult, Term};
pub use linalg::{QrDecomposition, DEFAULT_RANK_TOLERANCE};
