//! Reading the response column for a fit family

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tilde_core::data::Series;

use crate::base::{ModelError, Result};
use crate::fit::Family;

/// How the response column was read at fit time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Response column name
    pub name: String,
    /// Failure and success labels of a binomial response
    pub classes: Option<[String; 2]>,
}

impl ResponseSpec {
    /// Validate a complete response column and convert it to numbers
    ///
    /// Binomial responses are either numeric in [0, 1] or categorical with
    /// exactly two observed levels, the second of which counts as success.
    pub(crate) fn extract(name: &str, series: &Series, family: Family) -> Result<(Self, Array1<f64>)> {
        let invalid = |message: String| ModelError::InvalidResponse {
            column: name.to_string(),
            message,
        };

        if let (Some(labels), Some(levels)) = (series.labels(), series.levels()) {
            if family != Family::Binomial {
                return Err(invalid(format!(
                    "a categorical response needs the binomial family, not {}",
                    family
                )));
            }

            let observed: Vec<&String> = levels
                .iter()
                .filter(|level| labels.iter().any(|l| *l == Some(level.as_str())))
                .collect();
            let [failure, success] = observed.as_slice() else {
                return Err(invalid(format!(
                    "a binomial response needs exactly two observed levels, found {}",
                    observed.len()
                )));
            };

            let y = labels
                .iter()
                .map(|l| if *l == Some(success.as_str()) { 1.0 } else { 0.0 })
                .collect();
            let spec = Self {
                name: name.to_string(),
                classes: Some([failure.to_string(), success.to_string()]),
            };
            return Ok((spec, y));
        }

        let y = series
            .to_float()
            .ok_or_else(|| invalid(format!("unsupported column type {}", series.dtype())))?;

        let classes = match family {
            Family::Gaussian => None,
            Family::Binomial => {
                if let Some(v) = y.iter().find(|v| !(0.0..=1.0).contains(*v)) {
                    return Err(invalid(format!(
                        "binomial responses must lie in [0, 1], found {}",
                        v
                    )));
                }
                Some(["0".to_string(), "1".to_string()])
            }
            Family::Poisson => {
                if let Some(v) = y.iter().find(|v| **v < 0.0) {
                    return Err(invalid(format!(
                        "poisson responses must be non-negative, found {}",
                        v
                    )));
                }
                None
            }
        };

        Ok((
            Self {
                name: name.to_string(),
                classes,
            },
            y,
        ))
    }
}
