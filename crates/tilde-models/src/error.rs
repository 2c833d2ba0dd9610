//! Model-related error types

use thiserror::Error;

use tilde_core::data::DataError;
use tilde_core::formula::FormulaError;

/// Model-related errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Formula parsing, binding or design construction error
    #[error("Formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Data-related error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Missing value found while missing values are not allowed
    #[error("Missing value in column '{column}' at row {row}")]
    MissingData {
        /// Column holding the missing value
        column: String,
        /// Row index in the input data
        row: usize,
    },

    /// Iteratively reweighted least squares exceeded its iteration cap
    #[error(
        "Fit did not converge after {iterations} iterations (last relative change {last_change:.3e})"
    )]
    NonConvergence {
        /// Iterations performed
        iterations: usize,
        /// Largest relative coefficient change of the last iteration
        last_change: f64,
        /// Last coefficient iterate, over the design columns kept in the fit
        coefficients: Vec<f64>,
    },

    /// The system is degenerate as a whole
    #[error("Singular fit: {message} (rank {rank}, {n_obs} observations)")]
    SingularFit {
        /// What made the fit degenerate
        message: String,
        /// Numerical rank of the design matrix
        rank: usize,
        /// Number of observations used
        n_obs: usize,
    },

    /// The reduced model has a term the full model lacks
    #[error("Models are not nested: term '{term}' of the reduced model is not in the full model")]
    NotNested {
        /// Offending term label
        term: String,
    },

    /// The two models were not fit to the same observations
    #[error("Models are not comparable: {reason}")]
    MismatchedData {
        /// Why the models differ
        reason: String,
    },

    /// The response column cannot be used with the requested family
    #[error("Invalid response '{column}': {message}")]
    InvalidResponse {
        /// Response column name
        column: String,
        /// What is wrong with it
        message: String,
    },

    /// Invalid model configuration
    #[error("Invalid model configuration: {message}")]
    InvalidConfig {
        /// Configuration error message
        message: String,
    },

    /// Numerical computation error
    #[error("Numerical error: {message} (operation: {operation})")]
    NumericalError {
        /// Error message
        message: String,
        /// Operation that failed
        operation: String,
    },
}

impl ModelError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        ModelError::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn numerical(message: impl Into<String>, operation: &str) -> Self {
        ModelError::NumericalError {
            message: message.into(),
            operation: operation.to_string(),
        }
    }
}
