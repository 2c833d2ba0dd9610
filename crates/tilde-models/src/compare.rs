//! Nested model comparison
//!
//! Gaussian fits are compared with an F test on the drop in residual sum of
//! squares; binomial and Poisson fits with a likelihood-ratio chi-squared
//! test on the drop in deviance.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};
use std::fmt;
use tilde_core::design::INTERCEPT;

use crate::base::{ModelError, Result};
use crate::fit::Family;
use crate::model::FittedModel;

/// Test used for a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonTest {
    F,
    ChiSquared,
}

/// One model's line of an analysis-of-deviance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaRow {
    pub formula: String,
    pub df_residual: usize,
    /// Residual sum of squares, or deviance for non-Gaussian fits
    pub rss: f64,
}

/// Comparison of a reduced model against a full model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaTable {
    pub reduced: AnovaRow,
    pub full: AnovaRow,
    /// Difference in residual degrees of freedom
    pub df: usize,
    /// Drop in residual sum of squares or deviance
    pub sum_of_squares: f64,
    pub test: ComparisonTest,
    /// F or chi-squared statistic
    pub statistic: f64,
    pub p_value: f64,
}

/// Compare `reduced` against `full` with an F (or chi-squared) test
///
/// Both models must share family, response and observations, and every term
/// of `reduced` (the intercept included) must appear in `full`.
pub fn compare(reduced: &FittedModel, full: &FittedModel) -> Result<AnovaTable> {
    check_comparable(reduced, full)?;
    check_nested(reduced, full)?;

    if reduced.df_residual() < full.df_residual() {
        return Err(ModelError::MismatchedData {
            reason: format!(
                "full model has more residual df ({}) than the reduced model ({})",
                full.df_residual(),
                reduced.df_residual()
            ),
        });
    }

    let df = reduced.df_residual() - full.df_residual();
    let sum_of_squares = reduced.deviance() - full.deviance();
    let test = match full.family() {
        Family::Gaussian => ComparisonTest::F,
        Family::Binomial | Family::Poisson => ComparisonTest::ChiSquared,
    };

    let (statistic, p_value) = if df == 0 {
        (0.0, 1.0)
    } else {
        match test {
            ComparisonTest::F => {
                let df_full = full.df_residual() as f64;
                let statistic =
                    ((sum_of_squares / df as f64) / (full.deviance() / df_full)).max(0.0);
                let f_dist = FisherSnedecor::new(df as f64, df_full).map_err(|e| {
                    ModelError::numerical(
                        format!("Failed to create F-distribution: {}", e),
                        "compare",
                    )
                })?;
                (statistic, 1.0 - f_dist.cdf(statistic))
            }
            ComparisonTest::ChiSquared => {
                let statistic = sum_of_squares.max(0.0);
                let chi_dist = ChiSquared::new(df as f64).map_err(|e| {
                    ModelError::numerical(
                        format!("Failed to create chi-squared distribution: {}", e),
                        "compare",
                    )
                })?;
                (statistic, 1.0 - chi_dist.cdf(statistic))
            }
        }
    };

    log::debug!(
        "compared '{}' against '{}': {:?} = {:.6}, p = {:.6}",
        reduced.formula(),
        full.formula(),
        test,
        statistic,
        p_value
    );

    Ok(AnovaTable {
        reduced: AnovaRow::of(reduced),
        full: AnovaRow::of(full),
        df,
        sum_of_squares,
        test,
        statistic,
        p_value,
    })
}

fn check_comparable(reduced: &FittedModel, full: &FittedModel) -> Result<()> {
    let mismatch = |reason: String| -> Result<()> { Err(ModelError::MismatchedData { reason }) };

    if reduced.family() != full.family() {
        return mismatch(format!(
            "families differ ({} vs {})",
            reduced.family(),
            full.family()
        ));
    }
    if reduced.response().name != full.response().name {
        return mismatch(format!(
            "responses differ ('{}' vs '{}')",
            reduced.response().name,
            full.response().name
        ));
    }
    if reduced.n_obs() != full.n_obs() {
        return mismatch(format!(
            "fit on {} and {} observations",
            reduced.n_obs(),
            full.n_obs()
        ));
    }
    if reduced.omitted_rows() != full.omitted_rows() {
        return mismatch("different rows were omitted for missing values".to_string());
    }
    Ok(())
}

fn check_nested(reduced: &FittedModel, full: &FittedModel) -> Result<()> {
    if reduced.has_intercept() && !full.has_intercept() {
        return Err(ModelError::NotNested {
            term: INTERCEPT.to_string(),
        });
    }
    match reduced
        .formula()
        .terms
        .iter()
        .find(|term| !full.formula().contains_term(term))
    {
        Some(term) => Err(ModelError::NotNested {
            term: term.to_string(),
        }),
        None => Ok(()),
    }
}

impl AnovaRow {
    fn of(model: &FittedModel) -> Self {
        Self {
            formula: model.formula().to_string(),
            df_residual: model.df_residual(),
            rss: model.deviance(),
        }
    }
}

impl fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (stat_label, rss_label) = match self.test {
            ComparisonTest::F => ("F", "RSS"),
            ComparisonTest::ChiSquared => ("Chisq", "Deviance"),
        };

        writeln!(f, "Analysis of Variance Table")?;
        writeln!(f)?;
        writeln!(f, "Model 1: {}", self.reduced.formula)?;
        writeln!(f, "Model 2: {}", self.full.formula)?;
        writeln!(
            f,
            "  {:>8} {:>12} {:>4} {:>12} {:>10} {:>12}",
            "Res.Df", rss_label, "Df", "Sum of Sq", stat_label, "Pr(>stat)"
        )?;
        writeln!(
            f,
            "1 {:>8} {:>12.4}",
            self.reduced.df_residual, self.reduced.rss
        )?;
        writeln!(
            f,
            "2 {:>8} {:>12.4} {:>4} {:>12.4} {:>10.4} {:>12.4e}",
            self.full.df_residual,
            self.full.rss,
            self.df,
            self.sum_of_squares,
            self.statistic,
            self.p_value
        )
    }
}
