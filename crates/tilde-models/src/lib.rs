//! Model fitting, prediction and comparison on top of `tilde-core`
//!
//! ```text
//! formula ──parse──► terms ──DesignSpec::fit──► design ──ModelFitter──► FittedModel
//!                                                  ▲                        │
//!             new data ──DesignSpec::build (frozen)┘            predict / summary / compare
//! ```
//!
//! - [`model`]: [`Model`] specification, [`lm`] / [`glm`] and the [`FittedModel`] artifact
//! - [`fit`]: fit families, options and the least-squares / IRLS solver
//! - [`predict`]: row-preserving predictions under a missing-data policy
//! - [`compare`]: nested model comparison
//! - [`grouped`]: one model per level of a grouping column

pub mod base;
pub mod compare;
pub mod error;
pub mod fit;
pub mod grouped;
pub mod model;
pub mod predict;

#[cfg(test)]
mod fixtures;

pub use base::{Coefficient, ModelStatistics, ModelSummary, ResidualStatistics, Result};
pub use compare::{compare, AnovaRow, AnovaTable, ComparisonTest};
pub use error::ModelError;
pub use fit::{Family, FitOptions, FitSolution, ModelFitter, NaAction};
pub use grouped::{fit_grouped, GroupedFit};
pub use model::{glm, lm, FittedModel, Model, ResponseSpec};
pub use predict::{
    predict, Interval, MissingPolicy, PredictOptions, PredictionKind, PredictionRequest,
    PredictionResult,
};
