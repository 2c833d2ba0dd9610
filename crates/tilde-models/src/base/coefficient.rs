//! Coefficient definition

use serde::{Deserialize, Serialize};

/// Coefficient estimate with statistics
///
/// Aliased coefficients carry a NaN estimate and no statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// Design column name
    pub name: String,
    /// Coefficient estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: Option<f64>,
    /// t statistic (Gaussian) or z statistic (other families)
    pub statistic: Option<f64>,
    /// Two-sided p-value
    pub p_value: Option<f64>,
    /// Lower bound of confidence interval
    pub ci_lower: Option<f64>,
    /// Upper bound of confidence interval
    pub ci_upper: Option<f64>,
    /// Degrees of freedom of the reference t distribution
    pub df: Option<f64>,
    /// Is this the intercept?
    pub is_intercept: bool,
    /// Dropped as linearly dependent on columns to its left
    pub aliased: bool,
}

impl Coefficient {
    /// Create a new coefficient
    pub fn new(name: impl Into<String>, estimate: f64) -> Self {
        Self {
            name: name.into(),
            estimate,
            std_error: None,
            statistic: None,
            p_value: None,
            ci_lower: None,
            ci_upper: None,
            df: None,
            is_intercept: false,
            aliased: false,
        }
    }

    /// Coefficient of a column dropped for rank deficiency
    pub fn aliased(name: impl Into<String>) -> Self {
        Self {
            aliased: true,
            ..Self::new(name, f64::NAN)
        }
    }

    /// Set standard error
    pub fn with_std_error(mut self, se: f64) -> Self {
        self.std_error = Some(se);
        self
    }

    /// Set test statistic
    pub fn with_statistic(mut self, statistic: f64) -> Self {
        self.statistic = Some(statistic);
        self
    }

    /// Set p-value
    pub fn with_p_value(mut self, p: f64) -> Self {
        self.p_value = Some(p);
        self
    }

    /// Set confidence interval
    pub fn with_ci(mut self, lower: f64, upper: f64) -> Self {
        self.ci_lower = Some(lower);
        self.ci_upper = Some(upper);
        self
    }

    /// Set degrees of freedom
    pub fn with_df(mut self, df: f64) -> Self {
        self.df = Some(df);
        self
    }

    /// Mark as intercept
    pub fn as_intercept(mut self) -> Self {
        self.is_intercept = true;
        self
    }
}
