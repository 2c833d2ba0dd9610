//! Model specification and the fit pipeline
//!
//! A [`Model`] pairs a formula string with fit options and per-variable level
//! policies. Fitting binds the formula to the data schema, drops incomplete
//! rows, learns the design recipe, solves the fit and packages everything
//! into an immutable [`FittedModel`].

mod fitted;
mod response;
mod summary;

#[cfg(test)]
mod tests;

pub use fitted::FittedModel;
pub use response::ResponseSpec;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tilde_core::data::DataFrame;
use tilde_core::design::{DesignSpec, LevelPolicy, UnseenLevels};
use tilde_core::formula::{Formula, FormulaError};

use crate::base::{ModelError, Result};
use crate::fit::{Family, FitOptions, ModelFitter, NaAction};

/// Unfitted model: formula, options and level policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    formula: String,
    options: FitOptions,
    levels: IndexMap<String, LevelPolicy>,
}

impl Model {
    /// Create a Gaussian model with default options
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            options: FitOptions::default(),
            levels: IndexMap::new(),
        }
    }

    /// Set the response family
    pub fn family(mut self, family: Family) -> Self {
        self.options.family = family;
        self
    }

    /// Replace all fit options
    pub fn options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the level policy of a categorical variable
    pub fn levels(mut self, variable: impl Into<String>, policy: LevelPolicy) -> Self {
        self.levels.insert(variable.into(), policy);
        self
    }

    /// Set the reference level of a categorical variable
    pub fn reference(mut self, variable: impl Into<String>, level: impl Into<String>) -> Self {
        self.levels.entry(variable.into()).or_default().reference = Some(level.into());
        self
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn fit_options(&self) -> &FitOptions {
        &self.options
    }

    pub fn level_policies(&self) -> &IndexMap<String, LevelPolicy> {
        &self.levels
    }

    /// Fit the model to `data`
    pub fn fit(&self, data: &DataFrame) -> Result<FittedModel> {
        self.options.validate()?;

        let formula = Formula::parse(&self.formula, &data.schema())?;
        log::debug!("fitting '{}' ({}) to {}", formula, self.options.family, data);

        let mut columns = vec![formula.response.as_str()];
        columns.extend(formula.variables());

        let complete = data.complete_rows(&columns)?;
        let omitted: Vec<usize> = (0..complete.len()).filter(|&i| !complete[i]).collect();
        if let Some(&first) = omitted.first() {
            match self.options.na_action {
                NaAction::Fail => return Err(missing_data_error(data, &columns, first)),
                NaAction::Omit => log::info!(
                    "omitting {} of {} row(s) with missing values",
                    omitted.len(),
                    data.nrows()
                ),
            }
        }
        let fit_data = data.filter(&complete)?;

        let design = DesignSpec::fit(&formula, &fit_data, &self.levels)?;
        let x = design.build(&fit_data, UnseenLevels::Error)?;

        let series = fit_data
            .get_column(&formula.response)
            .ok_or_else(|| FormulaError::missing_column(&formula.response))?;
        let (response, y) = ResponseSpec::extract(&formula.response, series, self.options.family)?;

        let solution = ModelFitter::new(self.options).fit(&x, y.view())?;

        Ok(FittedModel::new(
            self.options.family,
            design,
            response,
            &y,
            solution,
            omitted,
        ))
    }
}

/// Fit a Gaussian linear model
pub fn lm(formula: &str, data: &DataFrame) -> Result<FittedModel> {
    Model::new(formula).fit(data)
}

/// Fit a generalized linear model
pub fn glm(formula: &str, family: Family, data: &DataFrame) -> Result<FittedModel> {
    Model::new(formula).family(family).fit(data)
}

/// Missing-data error naming the first of `columns` missing at `row`
pub(crate) fn missing_data_error(data: &DataFrame, columns: &[&str], row: usize) -> ModelError {
    let column = columns
        .iter()
        .find(|name| data.get_column(name).is_some_and(|s| s.is_missing(row)))
        .unwrap_or(&"<unknown>");

    ModelError::MissingData {
        column: column.to_string(),
        row,
    }
}
