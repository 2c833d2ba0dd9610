//! One model per level of a grouping column, fit in parallel


use indexmap::IndexMap;
use rayon::prelude::*;
use tilde_core::data::DataFrame;

use crate::base::Result;
use crate::model::{FittedModel, Model};

/// Per-level fits; each level keeps its own outcome
#[derive(Debug)]
pub struct GroupedFit {
    /// Grouping column
    pub by: String,
    /// Fit outcome per level, in level order
    pub fits: IndexMap<String, Result<FittedModel>>,
}

impl GroupedFit {
    pub fn get(&self, level: &str) -> Option<&Result<FittedModel>> {
        self.fits.get(level)
    }

    pub fn levels(&self) -> Vec<&str> {
        self.fits.keys().map(|k| k.as_str()).collect()
    }

    /// Levels whose fit succeeded
    pub fn successes(&self) -> impl Iterator<Item = (&str, &FittedModel)> {
        self.fits
            .iter()
            .filter_map(|(level, fit)| fit.as_ref().ok().map(|m| (level.as_str(), m)))
    }

    /// Levels whose fit failed
    pub fn failures(&self) -> impl Iterator<Item = (&str, &crate::base::ModelError)> {
        self.fits
            .iter()
            .filter_map(|(level, fit)| fit.as_ref().err().map(|e| (level.as_str(), e)))
    }
}

/// Fit `model` separately on each level of the categorical column `by`
///
/// Partitions are fit on the rayon thread pool. Rows with a missing key are
/// ignored, and the key column is not visible to the per-level fits.
pub fn fit_grouped(model: &Model, data: &DataFrame, by: &str) -> Result<GroupedFit> {
    let partitions: Vec<(String, DataFrame)> = data.partition_by(by)?.into_iter().collect();
    log::debug!(
        "fitting '{}' on {} partition(s) of '{}'",
        model.formula(),
        partitions.len(),
        by
    );

    let outcomes: Vec<(String, Result<FittedModel>)> = partitions
        .into_par_iter()
        .map(|(level, part)| {
            let fit = model.fit(&part);
            if let Err(e) = &fit {
                log::warn!("fit for {} = '{}' failed: {}", by, level, e);
            }
            (level, fit)
        })
        .collect();

    Ok(GroupedFit {
        by: by.to_string(),
        fits: outcomes.into_iter().collect(),
    })
}
