//! DataFrame implementation for tabular data
//!
//! A DataFrame is a 2-dimensional labeled data structure with columns of
//! potentially different types. It's optimized for statistical operations.

use super::*;

use indexmap::IndexMap;

/// Main DataFrame structure
#[derive(Clone, Debug, Default)]
pub struct DataFrame {
    pub(crate) columns: IndexMap<String, Series>,
    pub(crate) nrows: usize,
}

impl DataFrame {
    /// Create an empty DataFrame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create DataFrame from columns
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Series)>,
        S: Into<String>,
    {
        let mut builder = DataFrameBuilder::new();

        for (name, series) in columns.into_iter() {
            builder = builder.with_column(name, series)?;
        }

        builder.build()
    }

    /// Get the shape of the DataFrame (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.columns.len())
    }

    /// Get the number of rows
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Get the number of columns
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|k| k.as_str()).collect()
    }

    /// Get a reference to a column
    pub fn get_column(&self, name: &str) -> Option<&Series> {
        self.columns.get(name)
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Schema of the frame: column names with their modelling kind
    pub fn schema(&self) -> Schema {
        self.columns
            .iter()
            .map(|(name, series)| (name.clone(), series.kind()))
            .collect()
    }

    /// Select specific columns
    pub fn select<I, S>(&self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = DataFrameBuilder::new();

        for name in names.into_iter() {
            let name = name.as_ref();
            match self.columns.get(name) {
                Some(series) => {
                    builder = builder.with_column(name, series.clone())?;
                }
                None => {
                    return Err(DataError::ColumnNotFound(name.to_string()));
                }
            }
        }

        builder.build()
    }

    /// Filter rows with a boolean mask
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("mask length {}", self.nrows),
                actual: format!("mask length {}", mask.len()),
            });
        }

        let mut columns = IndexMap::with_capacity(self.columns.len());
        for (name, series) in &self.columns {
            columns.insert(name.clone(), series.filter(mask)?);
        }

        Ok(DataFrame {
            columns,
            nrows: mask.iter().filter(|keep| **keep).count(),
        })
    }

    /// Add a new column
    pub fn with_column<S: Into<String>>(mut self, name: S, series: Series) -> Result<Self> {
        let name = name.into();

        if self.columns.contains_key(&name) {
            return Err(DataError::DuplicateColumn(name));
        }

        if !self.columns.is_empty() && series.len() != self.nrows {
            return Err(DataError::DimensionMismatch {
                expected: format!("{} rows", self.nrows),
                actual: format!("{} rows", series.len()),
            });
        }

        if self.columns.is_empty() {
            self.nrows = series.len();
        }

        self.columns.insert(name, series);
        Ok(self)
    }

    /// Mask of rows with no missing value in any of `names`
    pub fn complete_rows<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<bool>> {
        let mut mask = vec![true; self.nrows];

        for name in names {
            let name = name.as_ref();
            let series = self
                .columns
                .get(name)
                .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?;

            for (i, keep) in mask.iter_mut().enumerate() {
                if *keep && series.is_missing(i) {
                    *keep = false;
                }
            }
        }

        Ok(mask)
    }

    /// Split rows by the levels of a categorical column
    ///
    /// Partitions come back in level order, empty levels are skipped and rows
    /// with a missing key are dropped. The key column itself is not part of
    /// the partitions.
    pub fn partition_by(&self, name: &str) -> Result<IndexMap<String, DataFrame>> {
        let series = self
            .columns
            .get(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))?;

        let Series::Categorical(codes, levels) = series else {
            return Err(DataError::TypeMismatch {
                column: name.to_string(),
                expected: "categorical",
                actual: series.dtype(),
            });
        };

        let mut rest = self.clone();
        rest.columns.shift_remove(name);

        let mut partitions = IndexMap::new();
        for (code, level) in levels.iter().enumerate() {
            let mask: Vec<bool> = codes.iter().map(|c| *c == Some(code as u32)).collect();
            if mask.iter().any(|keep| *keep) {
                partitions.insert(level.clone(), rest.filter(&mask)?);
            }
        }

        Ok(partitions)
    }
}

impl std::fmt::Display for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataFrame({} rows × {} cols)", self.nrows, self.ncols())
    }
}
