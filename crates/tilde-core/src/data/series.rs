//! Series data structure for holding homogeneous data
//!
//! A Series is a one-dimensional array that can hold data of a specific type.
//! It's the building block of DataFrames.

use super::*;

use std::collections::HashMap;

/// A Series is a typed, one-dimensional array of data
#[derive(Clone, Debug, PartialEq)]
pub enum Series {
    /// Floating point numbers (f64), NaN marks a missing value
    Float(FloatArray),
    /// Integer numbers (i64)
    Int(IntArray),
    /// Boolean values
    Bool(BoolArray),
    /// Categorical data: per-row level codes (`None` is missing) and the level dictionary
    Categorical(Vec<Option<u32>>, Vec<String>),
}

impl Series {
    /// Create a new Float series
    pub fn float(data: impl Into<FloatArray>) -> Self {
        Series::Float(data.into())
    }

    /// Create a Float series where `None` marks a missing value
    pub fn float_opt(data: &[Option<f64>]) -> Self {
        Series::Float(data.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    /// Create a new Int series
    pub fn int(data: impl Into<IntArray>) -> Self {
        Series::Int(data.into())
    }

    /// Create a new Bool series
    pub fn bool(data: impl Into<BoolArray>) -> Self {
        Series::Bool(data.into())
    }

    /// Create a new Categorical series, levels ordered by first appearance
    pub fn categorical<T: AsRef<str>>(data: &[T]) -> Self {
        let values: Vec<Option<&str>> = data.iter().map(|s| Some(s.as_ref())).collect();
        Self::categorical_opt(&values)
    }

    /// Create a Categorical series with missing values, levels ordered by first appearance
    pub fn categorical_opt<T: AsRef<str>>(data: &[Option<T>]) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let mut lookup: HashMap<String, u32> = HashMap::new();

        let codes = data
            .iter()
            .map(|value| {
                value.as_ref().map(|s| {
                    let s = s.as_ref();
                    match lookup.get(s) {
                        Some(&code) => code,
                        None => {
                            let code = levels.len() as u32;
                            levels.push(s.to_string());
                            lookup.insert(s.to_string(), code);
                            code
                        }
                    }
                })
            })
            .collect();

        Series::Categorical(codes, levels)
    }

    /// Create a Categorical series with an explicit level order
    pub fn factor<T: AsRef<str>, L: AsRef<str>>(data: &[Option<T>], levels: &[L]) -> Result<Self> {
        let levels: Vec<String> = levels.iter().map(|l| l.as_ref().to_string()).collect();
        let lookup: HashMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, level)| (level.as_str(), i as u32))
            .collect();

        if lookup.len() != levels.len() {
            return Err(DataError::InvalidParameter(format!(
                "factor levels must be distinct, got {:?}",
                levels
            )));
        }

        let mut codes = Vec::with_capacity(data.len());
        for value in data {
            match value {
                Some(s) => {
                    let code = lookup.get(s.as_ref()).copied().ok_or_else(|| {
                        DataError::UnknownLevel {
                            value: s.as_ref().to_string(),
                            levels: levels.clone(),
                        }
                    })?;
                    codes.push(Some(code));
                }
                None => codes.push(None),
            }
        }

        Ok(Series::Categorical(codes, levels))
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        match self {
            Series::Float(arr) => arr.len(),
            Series::Int(arr) => arr.len(),
            Series::Bool(arr) => arr.len(),
            Series::Categorical(codes, _) => codes.len(),
        }
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the type name of the series
    pub fn dtype(&self) -> &'static str {
        match self {
            Series::Float(_) => "float64",
            Series::Int(_) => "int64",
            Series::Bool(_) => "bool",
            Series::Categorical(_, _) => "categorical",
        }
    }

    /// Get the modelling kind of the series
    pub fn kind(&self) -> ColumnKind {
        match self {
            Series::Categorical(_, _) => ColumnKind::Categorical,
            _ => ColumnKind::Numeric,
        }
    }

    /// Check if the series holds a categorical variable
    pub fn is_categorical(&self) -> bool {
        matches!(self, Series::Categorical(_, _))
    }

    /// Check whether the value at `idx` is missing
    pub fn is_missing(&self, idx: usize) -> bool {
        match self {
            Series::Float(arr) => arr.get(idx).is_some_and(|v| v.is_nan()),
            Series::Categorical(codes, _) => codes.get(idx).is_some_and(|c| c.is_none()),
            Series::Int(_) | Series::Bool(_) => false,
        }
    }

    /// Count missing values
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Level dictionary of a categorical series
    pub fn levels(&self) -> Option<&[String]> {
        match self {
            Series::Categorical(_, levels) => Some(levels),
            _ => None,
        }
    }

    /// Per-row level labels of a categorical series (`None` is missing)
    pub fn labels(&self) -> Option<Vec<Option<&str>>> {
        match self {
            Series::Categorical(codes, levels) => Some(
                codes
                    .iter()
                    .map(|code| code.and_then(|c| levels.get(c as usize)).map(|s| s.as_str()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Numeric values as floats (NaN for missing), `None` for categorical data
    pub fn to_float(&self) -> Option<FloatArray> {
        match self {
            Series::Float(arr) => Some(arr.clone()),
            Series::Int(arr) => Some(arr.mapv(|v| v as f64)),
            Series::Bool(arr) => Some(arr.mapv(|v| if v { 1.0 } else { 0.0 })),
            Series::Categorical(_, _) => None,
        }
    }

    /// Filter the series with a boolean mask
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(DataError::DimensionMismatch {
                expected: format!("mask length {}", self.len()),
                actual: format!("mask length {}", mask.len()),
            });
        }

        match self {
            Series::Float(arr) => Ok(Series::Float(
                arr.iter()
                    .zip(mask.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(&val, _)| val)
                    .collect(),
            )),
            Series::Int(arr) => Ok(Series::Int(
                arr.iter()
                    .zip(mask.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(&val, _)| val)
                    .collect(),
            )),
            Series::Bool(arr) => Ok(Series::Bool(
                arr.iter()
                    .zip(mask.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(&val, _)| val)
                    .collect(),
            )),
            Series::Categorical(codes, levels) => Ok(Series::Categorical(
                codes
                    .iter()
                    .zip(mask.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(&code, _)| code)
                    .collect(),
                levels.clone(),
            )),
        }
    }
}

/// Type-7 sample quantile of the finite values in `values`
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let index = (n as f64 - 1.0) * q;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        Some(sorted[lower])
    } else {
        let weight = index - lower as f64;
        Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
    }
}
