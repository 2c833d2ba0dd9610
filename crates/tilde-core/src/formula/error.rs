//! Formula-specific error types
//!
//! This module provides detailed error types for formula parsing, binding
//! and design matrix construction.

use crate::data::DataError;
use thiserror::Error;

/// Errors that can occur during formula parsing and evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Syntax errors in the formula string
    #[error("Syntax error at position {position}: {message}")]
    Syntax {
        position: usize,
        message: String,
        context: Option<String>,
    },

    /// Variable not found in the bound schema or data
    #[error("Variable '{variable}' not found. Available variables: {available_vars:?}")]
    VariableNotFound {
        variable: String,
        available_vars: Vec<String>,
    },

    /// Variable type mismatch
    #[error("Variable '{variable}' has type {actual_type}, but {expected_type} was expected")]
    TypeMismatch {
        variable: String,
        expected_type: &'static str,
        actual_type: String,
    },

    /// Function application errors
    #[error("Error in function '{function}': {message}")]
    FunctionError {
        function: String,
        message: String,
        argument: Option<String>,
    },

    /// Interaction term errors
    #[error("Invalid interaction term '{term}': {message}")]
    InteractionError { term: String, message: String },

    /// Input outside the domain of a transform
    #[error("Domain error in term '{term}': {message}")]
    Domain { term: String, message: String },

    /// Categorical value absent from the levels frozen at fit time
    #[error("Unseen level '{level}' for variable '{variable}'; known levels: {levels:?}")]
    UnseenLevel {
        variable: String,
        level: String,
        levels: Vec<String>,
    },

    /// Invalid level order or reference level for a categorical variable
    #[error("Invalid level policy for '{variable}': {message}")]
    LevelPolicy { variable: String, message: String },

    /// Data lacks a column referenced by the formula, or has the wrong shape
    #[error("Dimension mismatch: {message}. Expected {expected}, got {actual}")]
    DimensionMismatch {
        message: String,
        expected: String,
        actual: String,
    },

    /// Missing response variable
    #[error("Response variable is required but not provided")]
    MissingResponse,

    /// Data-related errors that bubble up from the data layer
    #[error("Data error in formula evaluation: {0}")]
    Data(#[from] DataError),
}

/// Result type alias for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

impl FormulaError {
    /// Create a syntax error
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
            context: None,
        }
    }

    /// Create a syntax error with context
    pub fn syntax_with_context(
        position: usize,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        FormulaError::Syntax {
            position,
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a variable not found error
    pub fn variable_not_found(variable: &str, available_vars: &[&str]) -> Self {
        FormulaError::VariableNotFound {
            variable: variable.to_string(),
            available_vars: available_vars.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a function error
    pub fn function(function: &str, message: impl Into<String>) -> Self {
        FormulaError::FunctionError {
            function: function.to_string(),
            message: message.into(),
            argument: None,
        }
    }

    /// Create a function error with argument
    pub fn function_with_arg(function: &str, argument: &str, message: impl Into<String>) -> Self {
        FormulaError::FunctionError {
            function: function.to_string(),
            message: message.into(),
            argument: Some(argument.to_string()),
        }
    }

    /// Create a domain error for a term
    pub fn domain(term: impl Into<String>, message: impl Into<String>) -> Self {
        FormulaError::Domain {
            term: term.into(),
            message: message.into(),
        }
    }

    /// Create an error for a column missing from the data
    pub fn missing_column(column: &str) -> Self {
        FormulaError::DimensionMismatch {
            message: format!("data has no column '{}' referenced by the formula", column),
            expected: format!("column '{}'", column),
            actual: "no such column".to_string(),
        }
    }
}
