//! Coefficient tables and model statistics derived from stored fit statistics

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use tilde_core::design::INTERCEPT;

use super::FittedModel;
use crate::base::{Coefficient, ModelError, ModelStatistics, ModelSummary, Result};

/// Reference distribution of the coefficient test statistics
enum Reference {
    T(StudentsT),
    Z(Normal),
}

impl Reference {
    fn for_model(model: &FittedModel) -> Result<Self> {
        let failed = |e: String| {
            ModelError::numerical(
                format!("Failed to create reference distribution: {}", e),
                "summary",
            )
        };
        if model.family().estimates_dispersion() {
            StudentsT::new(0.0, 1.0, model.df_residual() as f64)
                .map(Reference::T)
                .map_err(|e| failed(e.to_string()))
        } else {
            Normal::new(0.0, 1.0)
                .map(Reference::Z)
                .map_err(|e| failed(e.to_string()))
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        match self {
            Reference::T(d) => d.cdf(x),
            Reference::Z(d) => d.cdf(x),
        }
    }

    fn inverse_cdf(&self, p: f64) -> f64 {
        match self {
            Reference::T(d) => d.inverse_cdf(p),
            Reference::Z(d) => d.inverse_cdf(p),
        }
    }
}

impl FittedModel {
    /// Coefficient table and model statistics with `level` confidence intervals
    pub fn summary(&self, level: f64) -> Result<ModelSummary> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ModelError::invalid_config(format!(
                "confidence level must lie in (0, 1), got {}",
                level
            )));
        }

        let reference = Reference::for_model(self)?;
        let critical = reference.inverse_cdf(0.5 + level / 2.0);
        let t_df = self
            .family()
            .estimates_dispersion()
            .then_some(self.df_residual() as f64);

        let mut coefficients = Vec::with_capacity(self.estimates().len());
        let mut k = 0;
        for ((name, &estimate), &aliased) in self
            .coefficient_names()
            .iter()
            .zip(self.estimates())
            .zip(self.aliased())
        {
            if aliased {
                coefficients.push(Coefficient::aliased(name.as_str()));
                continue;
            }

            let se = (self.dispersion() * self.unscaled_covariance()[[k, k]]).sqrt();
            k += 1;
            let statistic = estimate / se;
            let p_value = (2.0 * (1.0 - reference.cdf(statistic.abs()))).clamp(0.0, 1.0);

            let mut coefficient = Coefficient::new(name.as_str(), estimate)
                .with_std_error(se)
                .with_statistic(statistic)
                .with_p_value(p_value)
                .with_ci(estimate - critical * se, estimate + critical * se);
            if let Some(df) = t_df {
                coefficient = coefficient.with_df(df);
            }
            if name == INTERCEPT {
                coefficient = coefficient.as_intercept();
            }
            coefficients.push(coefficient);
        }

        Ok(ModelSummary {
            family: self.family(),
            formula: self.formula().to_string(),
            n_obs: self.n_obs(),
            n_omitted: self.omitted_rows().len(),
            rank: self.rank(),
            level,
            coefficients,
            model_statistics: self.model_statistics()?,
            residual_statistics: *self.residual_summary(),
        })
    }

    /// Coefficient table with 95% confidence intervals
    pub fn tidy(&self) -> Result<Vec<Coefficient>> {
        Ok(self.summary(0.95)?.coefficients)
    }

    /// Goodness-of-fit statistics against the null model
    pub fn model_statistics(&self) -> Result<ModelStatistics> {
        let n = self.n_obs();
        let df_intercept = usize::from(self.has_intercept());
        let df_model = self.rank().saturating_sub(df_intercept);
        let df_residual = self.df_residual();

        let mut stats = ModelStatistics {
            log_likelihood: Some(self.log_likelihood()),
            aic: Some(self.aic()),
            bic: Some(self.bic()),
            null_deviance: Some(self.null_deviance()),
            residual_deviance: Some(self.deviance()),
            dispersion: Some(self.dispersion()),
            df_residual: Some(df_residual),
            df_model: Some(df_model),
            df_null: Some(n - df_intercept),
            ..ModelStatistics::default()
        };

        if self.family().estimates_dispersion() {
            let rss = self.deviance();
            let tss = self.null_deviance();
            stats.residual_std_error = Some(self.residual_std_error());

            if tss > 0.0 {
                let r_squared = 1.0 - rss / tss;
                stats.r_squared = Some(r_squared);
                stats.adj_r_squared = Some(
                    1.0 - (1.0 - r_squared) * ((n - df_intercept) as f64 / df_residual as f64),
                );
            }

            if df_model > 0 {
                let f_statistic = ((tss - rss) / df_model as f64) / (rss / df_residual as f64);
                let f_dist =
                    FisherSnedecor::new(df_model as f64, df_residual as f64).map_err(|e| {
                        ModelError::numerical(
                            format!("Failed to create F-distribution: {}", e),
                            "model_statistics",
                        )
                    })?;
                stats.f_statistic = Some(f_statistic);
                stats.f_p_value = Some(1.0 - f_dist.cdf(f_statistic));
            }
        } else {
            stats.iterations = Some(self.iterations());

            if df_model > 0 {
                let chi_squared = (self.null_deviance() - self.deviance()).max(0.0);
                let chi_dist = ChiSquared::new(df_model as f64).map_err(|e| {
                    ModelError::numerical(
                        format!("Failed to create chi-squared distribution: {}", e),
                        "model_statistics",
                    )
                })?;
                stats.chi_squared = Some(chi_squared);
                stats.chi_squared_p_value = Some(1.0 - chi_dist.cdf(chi_squared));
            }
        }

        Ok(stats)
    }
}
