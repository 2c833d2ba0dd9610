//! Design matrix construction from a bound formula

use super::encoder::{CategoricalEncoder, Factor, LevelPolicy, UnseenLevels};
use super::transform::{FittedTransform, TransformKind};
use super::DesignMatrix;
use crate::data::{DataFrame, Matrix};
use crate::formula::{Formula, FormulaError, FormulaResult, Term};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the intercept column
pub const INTERCEPT: &str = "(Intercept)";

/// Frozen recipe turning a data frame into a design matrix
///
/// Built once from the fitting data; factor levels, transform parameters and
/// column names are never re-derived from data passed to [`DesignSpec::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSpec {
    formula: Formula,
    factors: IndexMap<String, Factor>,
    transforms: IndexMap<String, FittedTransform>,
    columns: Vec<String>,
    assign: Vec<usize>,
}

impl DesignSpec {
    /// Learn factors and transform parameters from `data`
    pub fn fit(
        formula: &Formula,
        data: &DataFrame,
        policies: &IndexMap<String, LevelPolicy>,
    ) -> FormulaResult<Self> {
        let mut factors = IndexMap::new();
        for term in &formula.terms {
            let Some(vars) = term.factors() else { continue };
            for var in vars {
                if factors.contains_key(var) {
                    continue;
                }
                let series = data
                    .get_column(var)
                    .ok_or_else(|| FormulaError::missing_column(var))?;
                if series.is_categorical() {
                    let policy = policies.get(var).cloned().unwrap_or_default();
                    factors.insert(var.to_string(), CategoricalEncoder::fit(var, series, &policy)?);
                }
            }
        }

        for name in policies.keys() {
            if !factors.contains_key(name) {
                if formula.variables().contains(&name.as_str()) {
                    return Err(FormulaError::LevelPolicy {
                        variable: name.clone(),
                        message: "level policy given for a variable not used as a factor"
                            .to_string(),
                    });
                }
                log::debug!("ignoring level policy for unused variable '{}'", name);
            }
        }

        let mut transforms = IndexMap::new();
        for term in &formula.terms {
            if let Term::Transformed(call) = term {
                let label = term.to_string();
                let values = call.input.evaluate(data)?;
                let fitted = TransformKind::from_call(call)?.fit(&values, &label)?;
                transforms.insert(label, fitted);
            }
        }

        let mut spec = Self {
            formula: formula.clone(),
            factors,
            transforms,
            columns: Vec::new(),
            assign: Vec::new(),
        };

        if formula.has_intercept {
            spec.columns.push(INTERCEPT.to_string());
            spec.assign.push(0);
        }
        for (i, term) in formula.terms.iter().enumerate() {
            for name in spec.term_columns(term) {
                spec.columns.push(name);
                spec.assign.push(i + 1);
            }
        }

        log::debug!(
            "design for '{}': {} columns from {} terms",
            formula,
            spec.columns.len(),
            formula.terms.len()
        );

        Ok(spec)
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Frozen factor metadata by variable name
    pub fn factors(&self) -> &IndexMap<String, Factor> {
        &self.factors
    }

    pub fn factor(&self, variable: &str) -> Option<&Factor> {
        self.factors.get(variable)
    }

    /// Fitted transforms by term label
    pub fn transforms(&self) -> &IndexMap<String, FittedTransform> {
        &self.transforms
    }

    /// Design column names in order
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Term index per column: 0 for the intercept, `i + 1` for `terms[i]`
    pub fn assign(&self) -> &[usize] {
        &self.assign
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    fn term_columns(&self, term: &Term) -> Vec<String> {
        match term {
            Term::MainEffect(var) => self.variable_columns(var),
            Term::Transformed(_) => {
                let label = term.to_string();
                match self.transforms.get(&label) {
                    Some(fitted) => fitted.column_names(&label),
                    None => vec![label],
                }
            }
            Term::Identity(_) => vec![term.to_string()],
            Term::Interaction(vars) => {
                let blocks: Vec<Vec<String>> =
                    vars.iter().map(|v| self.variable_columns(v)).collect();
                cross_indices(&blocks.iter().map(|b| b.len()).collect::<Vec<_>>())
                    .into_iter()
                    .map(|combo| {
                        combo
                            .iter()
                            .zip(&blocks)
                            .map(|(&j, block)| block[j].as_str())
                            .collect::<Vec<_>>()
                            .join(":")
                    })
                    .collect()
            }
        }
    }

    fn variable_columns(&self, var: &str) -> Vec<String> {
        match self.factors.get(var) {
            Some(factor) => factor.column_names(),
            None => vec![var.to_string()],
        }
    }

    /// Build a design matrix for `data` with the frozen encoding
    ///
    /// Rows with missing inputs come out as NaN in every dependent column.
    pub fn build(&self, data: &DataFrame, unseen: UnseenLevels) -> FormulaResult<DesignMatrix> {
        for var in self.formula.variables() {
            if !data.has_column(var) {
                return Err(FormulaError::missing_column(var));
            }
        }

        let n = data.nrows();
        let mut blocks: HashMap<&str, Matrix> = HashMap::new();
        for term in &self.formula.terms {
            let Some(vars) = term.factors() else { continue };
            for var in vars {
                if blocks.contains_key(var) {
                    continue;
                }
                let series = data
                    .get_column(var)
                    .ok_or_else(|| FormulaError::missing_column(var))?;
                let block = match self.factors.get(var) {
                    Some(factor) => factor.encode(series, unseen)?,
                    None => {
                        let values =
                            series.to_float().ok_or_else(|| FormulaError::TypeMismatch {
                                variable: var.to_string(),
                                expected_type: "numeric",
                                actual_type: series.dtype().to_string(),
                            })?;
                        values.insert_axis(ndarray::Axis(1))
                    }
                };
                blocks.insert(var, block);
            }
        }

        let mut matrix = Matrix::zeros((n, self.columns.len()));
        let mut col = 0;

        if self.formula.has_intercept {
            matrix.column_mut(col).fill(1.0);
            col += 1;
        }

        for term in &self.formula.terms {
            let part = match term {
                Term::MainEffect(var) => blocks[var.as_str()].clone(),
                Term::Transformed(call) => {
                    let label = term.to_string();
                    let fitted = self.transforms.get(&label).ok_or_else(|| {
                        FormulaError::function(&call.function, format!("'{}' was never fitted", label))
                    })?;
                    fitted.apply(&call.input.evaluate(data)?, &label)?
                }
                Term::Identity(expr) => expr.evaluate(data)?.insert_axis(ndarray::Axis(1)),
                Term::Interaction(vars) => {
                    let parts: Vec<&Matrix> = vars.iter().map(|v| &blocks[v.as_str()]).collect();
                    let sizes: Vec<usize> = parts.iter().map(|m| m.ncols()).collect();
                    let combos = cross_indices(&sizes);
                    let mut out = Matrix::ones((n, combos.len()));
                    for (c, combo) in combos.iter().enumerate() {
                        for (&j, part) in combo.iter().zip(&parts) {
                            let mut target = out.column_mut(c);
                            target *= &part.column(j);
                        }
                    }
                    out
                }
            };

            let width = part.ncols();
            if col + width > self.columns.len() {
                return Err(FormulaError::DimensionMismatch {
                    message: format!("term '{}' produced too many columns", term),
                    expected: format!("{} design columns", self.columns.len()),
                    actual: format!("at least {}", col + width),
                });
            }
            matrix
                .slice_mut(ndarray::s![.., col..col + width])
                .assign(&part);
            col += width;
        }

        if col != self.columns.len() {
            return Err(FormulaError::DimensionMismatch {
                message: "design columns do not match the frozen design".to_string(),
                expected: format!("{} columns", self.columns.len()),
                actual: format!("{} columns", col),
            });
        }

        Ok(DesignMatrix {
            names: self.columns.clone(),
            matrix,
            assign: self.assign.clone(),
        })
    }
}

/// Index tuples of a cross product, first position varying fastest
fn cross_indices(sizes: &[usize]) -> Vec<Vec<usize>> {
    let total: usize = sizes.iter().product();
    (0..total)
        .map(|mut c| {
            sizes
                .iter()
                .map(|&size| {
                    let j = c % size;
                    c /= size;
                    j
                })
                .collect()
        })
        .collect()
}
