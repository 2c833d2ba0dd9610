//! Treatment (dummy) coding of categorical variables

use crate::data::{Matrix, Series};
use crate::formula::{FormulaError, FormulaResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Level order and reference level requested for a categorical variable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPolicy {
    /// Explicit level order, overriding the column's own order
    pub levels: Option<Vec<String>>,
    /// Reference level, defaults to the first observed level
    pub reference: Option<String>,
}

impl LevelPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit level order
    pub fn levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.levels = Some(levels.into_iter().map(Into::into).collect());
        self
    }

    /// Set the reference level
    pub fn reference(mut self, level: impl Into<String>) -> Self {
        self.reference = Some(level.into());
        self
    }
}

/// What to do with a categorical value not seen at fit time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnseenLevels {
    /// Raise an unseen-level error
    #[default]
    Error,
    /// Encode the row as all zeros, like the reference level
    AllZero,
}

/// Frozen metadata of a categorical variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    variable: String,
    levels: Vec<String>,
    reference: usize,
}

impl Factor {
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// All levels, reference included
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn reference_level(&self) -> &str {
        &self.levels[self.reference]
    }

    /// Levels that get an indicator column, in level order
    pub fn non_reference_levels(&self) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.reference)
            .map(|(_, level)| level.as_str())
    }

    /// Number of indicator columns, one less than the number of levels
    pub fn ncols(&self) -> usize {
        self.levels.len() - 1
    }

    /// Indicator column names, `variable[level]`
    pub fn column_names(&self) -> Vec<String> {
        self.non_reference_levels()
            .map(|level| format!("{}[{}]", self.variable, level))
            .collect()
    }

    /// Encode a column with the frozen levels
    ///
    /// Missing values give NaN rows. Values outside the frozen levels are an
    /// error unless `unseen` is [`UnseenLevels::AllZero`].
    pub fn encode(&self, series: &Series, unseen: UnseenLevels) -> FormulaResult<Matrix> {
        let labels = series.labels().ok_or_else(|| FormulaError::TypeMismatch {
            variable: self.variable.clone(),
            expected_type: "categorical",
            actual_type: series.dtype().to_string(),
        })?;

        let lookup: HashMap<&str, usize> = self
            .levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), i))
            .collect();

        let mut matrix = Matrix::zeros((labels.len(), self.ncols()));
        for (i, label) in labels.iter().enumerate() {
            let Some(label) = label else {
                matrix.row_mut(i).fill(f64::NAN);
                continue;
            };
            match lookup.get(label) {
                Some(&idx) if idx == self.reference => {}
                Some(&idx) => {
                    let col = if idx > self.reference { idx - 1 } else { idx };
                    matrix[[i, col]] = 1.0;
                }
                None if unseen == UnseenLevels::AllZero => {
                    log::debug!(
                        "encoding unseen level '{}' of '{}' as all zeros",
                        label,
                        self.variable
                    );
                }
                None => {
                    return Err(FormulaError::UnseenLevel {
                        variable: self.variable.clone(),
                        level: label.to_string(),
                        levels: self.levels.clone(),
                    });
                }
            }
        }

        Ok(matrix)
    }
}

/// Learns [`Factor`]s from categorical columns
pub struct CategoricalEncoder;

impl CategoricalEncoder {
    /// Record the level set and reference level of a column
    ///
    /// Levels that never occur in `series` are dropped.
    pub fn fit(variable: &str, series: &Series, policy: &LevelPolicy) -> FormulaResult<Factor> {
        let (labels, own_levels) = match (series.labels(), series.levels()) {
            (Some(labels), Some(levels)) => (labels, levels),
            _ => {
                return Err(FormulaError::TypeMismatch {
                    variable: variable.to_string(),
                    expected_type: "categorical",
                    actual_type: series.dtype().to_string(),
                })
            }
        };

        let policy_error = |message: String| FormulaError::LevelPolicy {
            variable: variable.to_string(),
            message,
        };

        let order: Vec<String> = match &policy.levels {
            Some(levels) => {
                for (i, level) in levels.iter().enumerate() {
                    if levels[..i].contains(level) {
                        return Err(policy_error(format!("level '{}' listed twice", level)));
                    }
                }
                if let Some(stray) = labels.iter().flatten().find(|l| !levels.iter().any(|v| v == *l)) {
                    return Err(policy_error(format!(
                        "value '{}' is not among the declared levels {:?}",
                        stray, levels
                    )));
                }
                levels.clone()
            }
            None => own_levels.to_vec(),
        };

        let levels: Vec<String> = order
            .into_iter()
            .filter(|level| labels.iter().any(|l| *l == Some(level.as_str())))
            .collect();

        if levels.is_empty() {
            return Err(policy_error("no observed levels".to_string()));
        }

        let reference = match &policy.reference {
            Some(reference) => levels.iter().position(|l| l == reference).ok_or_else(|| {
                policy_error(format!(
                    "reference level '{}' is not an observed level {:?}",
                    reference, levels
                ))
            })?,
            None => 0,
        };

        log::debug!(
            "factor '{}': {} levels, reference '{}'",
            variable,
            levels.len(),
            levels[reference]
        );

        Ok(Factor {
            variable: variable.to_string(),
            levels,
            reference,
        })
    }
}
