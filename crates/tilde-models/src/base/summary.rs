//! Model summary structures

use super::coefficient::Coefficient;
use super::statistics::{ModelStatistics, ResidualStatistics};
use crate::fit::Family;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficient table and model statistics at a given confidence level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Fit family
    pub family: Family,
    /// Model formula
    pub formula: String,
    /// Number of observations used in the fit
    pub n_obs: usize,
    /// Rows of the input data omitted for missing values
    pub n_omitted: usize,
    /// Numerical rank of the design matrix
    pub rank: usize,
    /// Confidence level of the intervals
    pub level: f64,
    /// Coefficients table
    pub coefficients: Vec<Coefficient>,
    /// Model statistics
    pub model_statistics: ModelStatistics,
    /// Residual statistics
    pub residual_statistics: ResidualStatistics,
}

impl ModelSummary {
    /// Coefficient row by design column name
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stat_label = if self.family == Family::Gaussian {
            "t value"
        } else {
            "z value"
        };

        writeln!(f, "Model Summary")?;
        writeln!(f, "=============")?;
        writeln!(f, "Family: {} ({} link)", self.family, self.family.link_name())?;
        writeln!(f, "Formula: {}", self.formula)?;
        writeln!(f, "Observations: {}", self.n_obs)?;
        if self.n_omitted > 0 {
            writeln!(f, "Omitted for missingness: {}", self.n_omitted)?;
        }
        writeln!(f)?;

        let r = &self.residual_statistics;
        writeln!(f, "Residuals:")?;
        writeln!(
            f,
            "{:>12} {:>12} {:>12} {:>12} {:>12}",
            "Min", "1Q", "Median", "3Q", "Max"
        )?;
        writeln!(
            f,
            "{:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            r.min, r.q1, r.median, r.q3, r.max
        )?;
        writeln!(f)?;

        writeln!(f, "Coefficients:")?;
        writeln!(
            f,
            "{:<24} {:>12} {:>12} {:>12} {:>12}",
            "Term", "Estimate", "Std Error", stat_label, "p-value"
        )?;
        writeln!(
            f,
            "{:-<24} {:-<12} {:-<12} {:-<12} {:-<12}",
            "", "", "", "", ""
        )?;

        let mut aliased = 0;
        for coeff in &self.coefficients {
            if coeff.aliased {
                aliased += 1;
                writeln!(f, "{:<24} {:>12}", coeff.name, "NA")?;
                continue;
            }
            writeln!(
                f,
                "{:<24} {:>12.6} {:>12.6} {:>12.4} {:>12.4e}",
                coeff.name,
                coeff.estimate,
                coeff.std_error.unwrap_or(f64::NAN),
                coeff.statistic.unwrap_or(f64::NAN),
                coeff.p_value.unwrap_or(f64::NAN)
            )?;
        }
        if aliased > 0 {
            writeln!(f, "({} not defined because of singularities)", aliased)?;
        }
        writeln!(f)?;

        let s = &self.model_statistics;
        writeln!(f, "Model Statistics:")?;
        if let Some(resid_se) = s.residual_std_error {
            writeln!(f, "  Residual Std. Error: {:.4}", resid_se)?;
        }
        if let Some(r2) = s.r_squared {
            writeln!(f, "  R-squared: {:.4}", r2)?;
        }
        if let Some(adj_r2) = s.adj_r_squared {
            writeln!(f, "  Adjusted R-squared: {:.4}", adj_r2)?;
        }
        if let (Some(f_stat), Some(p)) = (s.f_statistic, s.f_p_value) {
            writeln!(f, "  F-statistic: {:.4} (p = {:.4e})", f_stat, p)?;
        }
        if let (Some(null), Some(df_null)) = (s.null_deviance, s.df_null) {
            writeln!(f, "  Null deviance: {:.4} on {} df", null, df_null)?;
        }
        if let (Some(dev), Some(df_res)) = (s.residual_deviance, s.df_residual) {
            writeln!(f, "  Residual deviance: {:.4} on {} df", dev, df_res)?;
        }
        if let Some(log_lik) = s.log_likelihood {
            writeln!(f, "  Log-likelihood: {:.4}", log_lik)?;
        }
        if let Some(aic) = s.aic {
            writeln!(f, "  AIC: {:.4}", aic)?;
        }
        if let Some(bic) = s.bic {
            writeln!(f, "  BIC: {:.4}", bic)?;
        }
        if let Some(iterations) = s.iterations {
            writeln!(f, "  Fisher scoring iterations: {}", iterations)?;
        }

        Ok(())
    }
}
