//! Statistical structures for model results

use serde::{Deserialize, Serialize};
use tilde_core::data::quantile;

/// Model statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    /// R-squared
    pub r_squared: Option<f64>,
    /// Adjusted R-squared
    pub adj_r_squared: Option<f64>,
    /// Residual standard error
    pub residual_std_error: Option<f64>,
    /// F-statistic
    pub f_statistic: Option<f64>,
    /// F-statistic p-value
    pub f_p_value: Option<f64>,
    /// Log-likelihood
    pub log_likelihood: Option<f64>,
    /// AIC
    pub aic: Option<f64>,
    /// BIC
    pub bic: Option<f64>,
    /// Null deviance
    pub null_deviance: Option<f64>,
    /// Residual deviance
    pub residual_deviance: Option<f64>,
    /// Likelihood-ratio chi-squared statistic against the null model
    pub chi_squared: Option<f64>,
    /// Chi-squared p-value
    pub chi_squared_p_value: Option<f64>,
    /// Dispersion parameter
    pub dispersion: Option<f64>,
    /// Residual degrees of freedom
    pub df_residual: Option<usize>,
    /// Model degrees of freedom
    pub df_model: Option<usize>,
    /// Null model degrees of freedom
    pub df_null: Option<usize>,
    /// Number of iterations
    pub iterations: Option<usize>,
}

/// Five-number summary of the deviance residuals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualStatistics {
    /// Minimum residual
    pub min: f64,
    /// First quartile
    pub q1: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q3: f64,
    /// Maximum residual
    pub max: f64,
}

impl ResidualStatistics {
    /// Summarize a residual vector with type-7 quantiles
    pub fn from_residuals(residuals: &[f64]) -> Self {
        let at = |q: f64| quantile(residuals, q).unwrap_or(f64::NAN);
        Self {
            min: at(0.0),
            q1: at(0.25),
            median: at(0.5),
            q3: at(0.75),
            max: at(1.0),
        }
    }
}
