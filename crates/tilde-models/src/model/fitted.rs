//! The fitted model artifact

use indexmap::IndexMap;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tilde_core::data::Matrix;
use tilde_core::design::{DesignSpec, INTERCEPT};
use tilde_core::formula::Formula;

use super::response::ResponseSpec;
use crate::base::ResidualStatistics;
use crate::fit::{Family, FitSolution};

/// Immutable result of fitting a model
///
/// Holds the frozen design recipe (formula, factor levels, transform
/// parameters) together with the sufficient statistics needed for summaries
/// and predictions. The whole value is serializable and never needs the
/// original data again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    family: Family,
    design: DesignSpec,
    response: ResponseSpec,
    #[serde(with = "nan_as_null::vec")]
    coefficients: Vec<f64>,
    aliased: Vec<bool>,
    unscaled_covariance: Matrix,
    rank: usize,
    n_obs: usize,
    df_residual: usize,
    deviance: f64,
    null_deviance: f64,
    dispersion: f64,
    #[serde(with = "nan_as_null::scalar")]
    log_likelihood: f64,
    iterations: usize,
    residual_summary: ResidualStatistics,
    fitted_values: Vec<f64>,
    residuals: Vec<f64>,
    omitted_rows: Vec<usize>,
}

impl FittedModel {
    pub(crate) fn new(
        family: Family,
        design: DesignSpec,
        response: ResponseSpec,
        y: &Array1<f64>,
        solution: FitSolution,
        omitted_rows: Vec<usize>,
    ) -> Self {
        let n = y.len();
        let y: Vec<f64> = y.to_vec();
        let mu: Vec<f64> = solution.fitted.to_vec();
        let df_residual = solution.df_residual();

        let null_mu = if design.formula().has_intercept {
            y.iter().sum::<f64>() / n as f64
        } else {
            family.inverse_link(0.0)
        };
        let null_deviance = family.deviance(&y, &vec![null_mu; n]);

        let dispersion = if family.estimates_dispersion() {
            solution.deviance / df_residual as f64
        } else {
            1.0
        };

        let deviance_residuals: Vec<f64> = y
            .iter()
            .zip(&mu)
            .map(|(&y, &m)| (y - m).signum() * family.unit_deviance(y, m).max(0.0).sqrt())
            .collect();

        Self {
            family,
            response,
            coefficients: solution.coefficients.to_vec(),
            aliased: solution.aliased,
            unscaled_covariance: solution.unscaled_covariance,
            rank: solution.rank,
            n_obs: n,
            df_residual,
            deviance: solution.deviance,
            null_deviance,
            dispersion,
            log_likelihood: family.log_likelihood(&y, &mu),
            iterations: solution.iterations,
            residual_summary: ResidualStatistics::from_residuals(&deviance_residuals),
            residuals: y.iter().zip(&mu).map(|(y, m)| y - m).collect(),
            fitted_values: mu,
            omitted_rows,
            design,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn formula(&self) -> &Formula {
        self.design.formula()
    }

    /// Frozen design recipe replayed at prediction time
    pub fn design(&self) -> &DesignSpec {
        &self.design
    }

    pub fn response(&self) -> &ResponseSpec {
        &self.response
    }

    pub fn has_intercept(&self) -> bool {
        self.formula().has_intercept
    }

    /// Design column names, one per coefficient
    pub fn coefficient_names(&self) -> &[String] {
        self.design.column_names()
    }

    /// Estimates in design column order, NaN where aliased
    pub fn estimates(&self) -> &[f64] {
        &self.coefficients
    }

    /// Estimates keyed by design column name
    pub fn coefficients(&self) -> IndexMap<String, f64> {
        self.coefficient_names()
            .iter()
            .cloned()
            .zip(self.coefficients.iter().copied())
            .collect()
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficient_names()
            .iter()
            .position(|n| n == name)
            .map(|j| self.coefficients[j])
    }

    pub fn intercept(&self) -> Option<f64> {
        self.coefficient(INTERCEPT)
    }

    /// Per design column, whether it was dropped as linearly dependent
    pub fn aliased(&self) -> &[bool] {
        &self.aliased
    }

    pub fn aliased_names(&self) -> Vec<&str> {
        self.coefficient_names()
            .iter()
            .zip(&self.aliased)
            .filter(|(_, a)| **a)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_rank_deficient(&self) -> bool {
        self.aliased.iter().any(|a| *a)
    }

    /// `(X'WX)^-1` over the non-aliased columns, in design order
    pub fn unscaled_covariance(&self) -> &Matrix {
        &self.unscaled_covariance
    }

    /// Coefficient covariance over the non-aliased columns
    pub fn covariance(&self) -> Matrix {
        &self.unscaled_covariance * self.dispersion
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Observations used in the fit
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    pub fn df_residual(&self) -> usize {
        self.df_residual
    }

    /// Residual deviance, the residual sum of squares for Gaussian fits
    pub fn deviance(&self) -> f64 {
        self.deviance
    }

    pub fn null_deviance(&self) -> f64 {
        self.null_deviance
    }

    pub fn dispersion(&self) -> f64 {
        self.dispersion
    }

    /// Residual standard error, `sqrt(dispersion)`
    pub fn residual_std_error(&self) -> f64 {
        self.dispersion.sqrt()
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Number of estimated parameters, the Gaussian variance included
    pub fn n_parameters(&self) -> usize {
        self.rank + usize::from(self.family.estimates_dispersion())
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.n_parameters() as f64
    }

    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood + (self.n_obs as f64).ln() * self.n_parameters() as f64
    }

    /// IRLS iterations, zero for Gaussian fits
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Five-number summary of the deviance residuals
    pub fn residual_summary(&self) -> &ResidualStatistics {
        &self.residual_summary
    }

    /// Fitted means of the rows used in the fit
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted_values
    }

    /// Response residuals `y - mu` of the rows used in the fit
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Input rows dropped for missing values
    pub fn omitted_rows(&self) -> &[usize] {
        &self.omitted_rows
    }
}

/// serde_json writes non-finite floats as `null`; read them back as NaN
mod nan_as_null {
    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| v.is_finite().then_some(*v)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
            Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
    }

    pub mod scalar {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            match value.is_finite() {
                true => serializer.serialize_some(value),
                false => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
        }
    }
}
