//! Predictions on new data
//!
//! New data flows through the design recipe frozen in the [`FittedModel`];
//! factor levels and transform parameters are never re-derived from it. The
//! result always has one row per input row, in input order, with `None` as
//! the missing marker.


use indexmap::IndexMap;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tilde_core::data::{DataFrame, Matrix};
use tilde_core::design::UnseenLevels;
use tilde_core::formula::FormulaError;

use crate::base::{ModelError, Result};
use crate::fit::Family;
use crate::model::{missing_data_error, FittedModel};

/// Handling of rows with missing predictor values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Raise a missing-data error before computing anything
    Fail,
    /// Rows with missing inputs get `None`
    #[default]
    Propagate,
    /// Predict only complete rows, then restore the other rows as `None`;
    /// same output as `Propagate`
    Exclude,
}

/// Scale of the predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionKind {
    /// Mean of the response; class probabilities for binomial fits
    #[default]
    Response,
    /// Linear predictor
    Link,
}

/// Interval around Gaussian predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    None,
    /// Interval for the mean response
    Confidence,
    /// Interval for a new observation
    Prediction,
}

/// Prediction settings independent of the data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictOptions {
    pub missing: MissingPolicy,
    pub unseen: UnseenLevels,
    pub kind: PredictionKind,
    pub interval: Interval,
    /// Confidence level of the interval
    pub level: f64,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            missing: MissingPolicy::Propagate,
            unseen: UnseenLevels::Error,
            kind: PredictionKind::Response,
            interval: Interval::None,
            level: 0.95,
        }
    }
}

/// New data plus prediction settings
#[derive(Debug, Clone, Copy)]
pub struct PredictionRequest<'a> {
    pub data: &'a DataFrame,
    pub options: PredictOptions,
}

impl<'a> PredictionRequest<'a> {
    pub fn new(data: &'a DataFrame) -> Self {
        Self {
            data,
            options: PredictOptions::default(),
        }
    }

    pub fn options(mut self, options: PredictOptions) -> Self {
        self.options = options;
        self
    }

    pub fn missing(mut self, missing: MissingPolicy) -> Self {
        self.options.missing = missing;
        self
    }

    pub fn unseen(mut self, unseen: UnseenLevels) -> Self {
        self.options.unseen = unseen;
        self
    }

    pub fn kind(mut self, kind: PredictionKind) -> Self {
        self.options.kind = kind;
        self
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.options.interval = interval;
        self
    }

    pub fn level(mut self, level: f64) -> Self {
        self.options.level = level;
        self
    }
}

/// Prediction table: one row per input row, `None` for missing predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    columns: IndexMap<String, Vec<Option<f64>>>,
    nrows: usize,
}

impl PredictionResult {
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn columns(&self) -> &IndexMap<String, Vec<Option<f64>>> {
        &self.columns
    }

    /// The `fit` column, absent for binomial response-scale predictions
    pub fn fit(&self) -> Option<&[Option<f64>]> {
        self.column("fit")
    }

    /// Number of rows with a missing prediction
    pub fn missing_count(&self) -> usize {
        self.columns
            .values()
            .next()
            .map_or(0, |c| c.iter().filter(|v| v.is_none()).count())
    }
}

/// Predict with default settings and the given missing-data policy
pub fn predict(
    model: &FittedModel,
    data: &DataFrame,
    missing: MissingPolicy,
) -> Result<PredictionResult> {
    model.predict(&PredictionRequest::new(data).missing(missing))
}

impl FittedModel {
    /// Predict for every row of the request's data
    pub fn predict(&self, request: &PredictionRequest<'_>) -> Result<PredictionResult> {
        let options = request.options;
        let data = request.data;
        self.check_request(&options)?;

        let variables = self.formula().variables();
        for var in &variables {
            if !data.has_column(var) {
                return Err(FormulaError::missing_column(var).into());
            }
        }

        let complete = data.complete_rows(&variables)?;
        if options.missing == MissingPolicy::Fail {
            if let Some(row) = complete.iter().position(|keep| !keep) {
                return Err(missing_data_error(data, &variables, row));
            }
        }

        // incomplete rows never reach the design, whatever the policy
        let rows: Vec<usize> = (0..data.nrows()).filter(|&i| complete[i]).collect();
        let x = self
            .design()
            .build(&data.filter(&complete)?, options.unseen)?;

        if self.is_rank_deficient() {
            log::warn!(
                "prediction from a rank-deficient fit; aliased coefficients ({}) count as zero",
                self.aliased_names().join(", ")
            );
        }

        let names = self.output_columns(&options);
        let mut columns: IndexMap<String, Vec<Option<f64>>> = names
            .iter()
            .map(|name| (name.clone(), vec![None; data.nrows()]))
            .collect();

        let kept: Vec<usize> = (0..self.aliased().len()).filter(|&j| !self.aliased()[j]).collect();
        let critical = self.critical_value(&options)?;

        for (r, &row) in rows.iter().enumerate() {
            let Some(values) = self.predict_row(x.matrix.row(r), &kept, &options, critical) else {
                continue;
            };
            for (name, value) in names.iter().zip(values) {
                if let Some(column) = columns.get_mut(name) {
                    column[row] = Some(value);
                }
            }
        }

        let result = PredictionResult {
            columns,
            nrows: data.nrows(),
        };
        log::debug!(
            "predicted {} row(s), {} missing",
            result.nrows(),
            result.missing_count()
        );
        Ok(result)
    }

    fn check_request(&self, options: &PredictOptions) -> Result<()> {
        if options.interval == Interval::None {
            return Ok(());
        }
        if self.family() != Family::Gaussian {
            return Err(ModelError::invalid_config(format!(
                "prediction intervals are only available for gaussian fits, not {}",
                self.family()
            )));
        }
        if !(options.level > 0.0 && options.level < 1.0) {
            return Err(ModelError::invalid_config(format!(
                "confidence level must lie in (0, 1), got {}",
                options.level
            )));
        }
        Ok(())
    }

    fn output_columns(&self, options: &PredictOptions) -> Vec<String> {
        match (self.family(), options.kind, &self.response().classes) {
            (Family::Binomial, PredictionKind::Response, Some(classes)) => classes
                .iter()
                .map(|class| format!("prob[{}]", class))
                .collect(),
            _ if options.interval != Interval::None => {
                vec!["fit".to_string(), "lwr".to_string(), "upr".to_string()]
            }
            _ => vec!["fit".to_string()],
        }
    }

    fn critical_value(&self, options: &PredictOptions) -> Result<f64> {
        if options.interval == Interval::None {
            return Ok(f64::NAN);
        }
        let t_dist = StudentsT::new(0.0, 1.0, self.df_residual() as f64).map_err(|e| {
            ModelError::numerical(format!("Failed to create t-distribution: {}", e), "predict")
        })?;
        Ok(t_dist.inverse_cdf(0.5 + options.level / 2.0))
    }

    /// Output values of one design row, `None` if any input is missing
    fn predict_row(
        &self,
        x: ArrayView1<f64>,
        kept: &[usize],
        options: &PredictOptions,
        critical: f64,
    ) -> Option<Vec<f64>> {
        if x.iter().any(|v| v.is_nan()) {
            return None;
        }

        let estimates = self.estimates();
        let mut eta = 0.0;
        for &j in kept {
            eta += x[j] * estimates[j];
        }

        if options.kind == PredictionKind::Response && self.family() == Family::Binomial {
            let p = self.family().inverse_link(eta);
            return Some(vec![1.0 - p, p]);
        }

        let fit = match options.kind {
            PredictionKind::Response => self.family().inverse_link(eta),
            PredictionKind::Link => eta,
        };
        if options.interval == Interval::None {
            return Some(vec![fit]);
        }

        let variance = quadratic_form(self.unscaled_covariance(), x, kept) * self.dispersion();
        let half_width = match options.interval {
            Interval::Prediction => critical * (variance + self.dispersion()).sqrt(),
            _ => critical * variance.sqrt(),
        };
        Some(vec![fit, fit - half_width, fit + half_width])
    }
}

/// `x_k' V x_k` over the kept columns
fn quadratic_form(v: &Matrix, x: ArrayView1<f64>, kept: &[usize]) -> f64 {
    let mut total = 0.0;
    for (a, &i) in kept.iter().enumerate() {
        for (b, &j) in kept.iter().enumerate() {
            total += x[i] * v[[a, b]] * x[j];
        }
    }
    total
}
