use super::*;
use crate::fixtures::{counts, crickets, logistic, noisy_linear, normal_equations};
use approx::assert_abs_diff_eq;
use tilde_core::data::{Matrix, Series};

/// Cricket data with `temp` missing at the given rows
fn crickets_missing_temp(rows: &[usize]) -> DataFrame {
    let data = crickets();
    let temp: Vec<Option<f64>> = data
        .get_column("temp")
        .and_then(|s| s.to_float())
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, &t)| (!rows.contains(&i)).then_some(t))
        .collect();

    DataFrame::from_columns(vec![
        ("species", data.get_column("species").unwrap().clone()),
        ("temp", Series::float_opt(&temp)),
        ("rate", data.get_column("rate").unwrap().clone()),
    ])
    .unwrap()
}

/// `[1, temp, species == niveus]` built by hand
fn main_effects_matrix(data: &DataFrame) -> Matrix {
    let temp = data.get_column("temp").and_then(|s| s.to_float()).unwrap();
    let species = data.get_column("species").and_then(|s| s.labels()).unwrap();
    let mut x = Matrix::zeros((data.nrows(), 3));
    for i in 0..data.nrows() {
        x[[i, 0]] = 1.0;
        x[[i, 1]] = temp[i];
        x[[i, 2]] = if species[i] == Some("niveus") { 1.0 } else { 0.0 };
    }
    x
}

fn rate(data: &DataFrame) -> Vec<f64> {
    data.get_column("rate")
        .and_then(|s| s.to_float())
        .unwrap()
        .to_vec()
}

#[test]
fn test_main_effects_fit() {
    let data = crickets();
    let fit = Model::new("rate ~ temp + species")
        .reference("species", "exclamationis")
        .fit(&data)
        .unwrap();

    assert_eq!(
        fit.coefficient_names(),
        ["(Intercept)", "temp", "species[niveus]"]
    );
    assert_eq!(fit.n_obs(), 31);
    assert_eq!(fit.rank(), 3);
    assert_eq!(fit.df_residual(), 28);
    assert!(fit.omitted_rows().is_empty());
    assert!(!fit.is_rank_deficient());

    let (beta, rss) = normal_equations(&main_effects_matrix(&data), &rate(&data));
    let coefficients = fit.coefficients();
    assert_eq!(coefficients.len(), 3);
    assert_abs_diff_eq!(coefficients["(Intercept)"], beta[0], epsilon = 1e-8);
    assert_abs_diff_eq!(coefficients["temp"], beta[1], epsilon = 1e-8);
    assert_abs_diff_eq!(coefficients["species[niveus]"], beta[2], epsilon = 1e-8);
    assert_abs_diff_eq!(fit.deviance(), rss, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.dispersion(), rss / 28.0, epsilon = 1e-8);

    assert!(coefficients["temp"] > 3.0 && coefficients["temp"] < 4.0);
    assert!(coefficients["species[niveus]"] < 0.0);
}

#[test]
fn test_reference_level_changes_indicator() {
    let data = crickets();
    let default = lm("rate ~ temp + species", &data).unwrap();
    let flipped = Model::new("rate ~ temp + species")
        .reference("species", "niveus")
        .fit(&data)
        .unwrap();

    assert_eq!(
        flipped.coefficient_names(),
        ["(Intercept)", "temp", "species[exclamationis]"]
    );
    assert_abs_diff_eq!(
        flipped.coefficient("species[exclamationis]").unwrap(),
        -default.coefficient("species[niveus]").unwrap(),
        epsilon = 1e-8
    );
    assert_abs_diff_eq!(flipped.deviance(), default.deviance(), epsilon = 1e-8);
}

#[test]
fn test_summary_table() {
    let data = crickets();
    let fit = lm("rate ~ temp + species", &data).unwrap();
    let summary = fit.summary(0.95).unwrap();

    assert_eq!(summary.coefficients.len(), 3);
    assert_eq!(summary.n_obs, 31);
    assert!(summary.coefficients[0].is_intercept);

    let temp = summary.coefficient("temp").unwrap();
    let se = temp.std_error.unwrap();
    assert_abs_diff_eq!(temp.statistic.unwrap(), temp.estimate / se, epsilon = 1e-10);
    assert_eq!(temp.df, Some(28.0));
    assert!(temp.p_value.unwrap() < 1e-10);
    assert!(temp.ci_lower.unwrap() < temp.estimate && temp.estimate < temp.ci_upper.unwrap());

    // wider at a higher level
    let wide = fit.summary(0.99).unwrap();
    let wide_temp = wide.coefficient("temp").unwrap();
    let width = |c: &crate::Coefficient| c.ci_upper.unwrap() - c.ci_lower.unwrap();
    assert!(width(wide_temp) > width(temp));

    let y = rate(&data);
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let tss: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let stats = summary.model_statistics;
    assert_abs_diff_eq!(stats.r_squared.unwrap(), 1.0 - fit.deviance() / tss, epsilon = 1e-10);
    assert_abs_diff_eq!(
        stats.adj_r_squared.unwrap(),
        1.0 - (1.0 - stats.r_squared.unwrap()) * 30.0 / 28.0,
        epsilon = 1e-10
    );
    assert_abs_diff_eq!(
        stats.f_statistic.unwrap(),
        ((tss - fit.deviance()) / 2.0) / (fit.deviance() / 28.0),
        epsilon = 1e-8
    );
    assert_eq!(stats.df_model, Some(2));
    assert!(stats.iterations.is_none());

    let tidy = fit.tidy().unwrap();
    assert_eq!(tidy, summary.coefficients);

    let text = summary.to_string();
    assert!(text.contains("species[niveus]"));
    assert!(text.contains("t value"));

    assert!(matches!(
        fit.summary(1.0),
        Err(ModelError::InvalidConfig { .. })
    ));
}

#[test]
fn test_information_criteria() {
    let data = noisy_linear(60, 11);
    let fit = lm("y ~ x1 + x2 + g", &data).unwrap();

    let n = 60.0;
    let rss = fit.deviance();
    let log_lik = -0.5 * n * ((2.0 * std::f64::consts::PI * rss / n).ln() + 1.0);
    assert_abs_diff_eq!(fit.log_likelihood(), log_lik, epsilon = 1e-8);
    assert_eq!(fit.n_parameters(), 6);
    assert_abs_diff_eq!(fit.aic(), -2.0 * log_lik + 12.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.bic(), -2.0 * log_lik + n.ln() * 6.0, epsilon = 1e-8);

    assert_abs_diff_eq!(fit.coefficient("x1").unwrap(), 2.0, epsilon = 0.1);
    assert_abs_diff_eq!(fit.coefficient("x2").unwrap(), -0.5, epsilon = 0.1);
}

#[test]
fn test_rank_deficient_model() {
    let data = crickets();
    let temp = data.get_column("temp").and_then(|s| s.to_float()).unwrap();
    let data = data
        .with_column("temp2", Series::float(temp.mapv(|t| 2.0 * t)))
        .unwrap();

    let fit = lm("rate ~ temp + temp2 + species", &data).unwrap();
    assert_eq!(fit.rank(), 3);
    assert_eq!(fit.aliased_names(), vec!["temp2"]);
    assert!(fit.coefficient("temp2").unwrap().is_nan());

    let full_rank = lm("rate ~ temp + species", &data).unwrap();
    assert_abs_diff_eq!(fit.deviance(), full_rank.deviance(), epsilon = 1e-8);
    assert_abs_diff_eq!(
        fit.coefficient("temp").unwrap(),
        full_rank.coefficient("temp").unwrap(),
        epsilon = 1e-8
    );

    let summary = fit.summary(0.95).unwrap();
    let aliased = summary.coefficient("temp2").unwrap();
    assert!(aliased.aliased);
    assert!(aliased.std_error.is_none());
    assert!(summary.to_string().contains("(1 not defined because of singularities)"));
}

#[test]
fn test_missing_rows_are_omitted() {
    let data = crickets_missing_temp(&[2, 20]);
    let fit = lm("rate ~ temp + species", &data).unwrap();

    assert_eq!(fit.n_obs(), 29);
    assert_eq!(fit.omitted_rows(), [2, 20]);
    assert_eq!(fit.fitted_values().len(), 29);
    assert_eq!(fit.summary(0.95).unwrap().n_omitted, 2);

    let complete = data.complete_rows(&["temp"]).unwrap();
    let kept = data.filter(&complete).unwrap();
    let (beta, _) = normal_equations(&main_effects_matrix(&kept), &rate(&kept));
    assert_abs_diff_eq!(fit.coefficient("temp").unwrap(), beta[1], epsilon = 1e-8);
}

#[test]
fn test_missing_rows_fail() {
    let data = crickets_missing_temp(&[4]);
    let model = Model::new("rate ~ temp + species")
        .options(FitOptions::new().na_action(NaAction::Fail));

    match model.fit(&data) {
        Err(ModelError::MissingData { column, row }) => {
            assert_eq!(column, "temp");
            assert_eq!(row, 4);
        }
        other => panic!("expected missing data error, got {:?}", other),
    }
}

#[test]
fn test_unknown_column() {
    let data = crickets();
    assert!(lm("rate ~ humidity", &data).is_err());
}

#[test]
fn test_invalid_responses() {
    let data = crickets();
    assert!(matches!(
        lm("species ~ temp", &data),
        Err(ModelError::InvalidResponse { .. })
    ));

    let data = DataFrame::from_columns(vec![
        ("y", Series::float(vec![1.0, -2.0, 3.0, 4.0])),
        ("x", Series::float(vec![1.0, 2.0, 3.0, 4.0])),
    ])
    .unwrap();
    assert!(matches!(
        glm("y ~ x", Family::Poisson, &data),
        Err(ModelError::InvalidResponse { .. })
    ));
    assert!(matches!(
        glm("y ~ x", Family::Binomial, &data),
        Err(ModelError::InvalidResponse { .. })
    ));

    let three_levels = DataFrame::from_columns(vec![
        ("y", Series::categorical(&["a", "b", "c", "a"])),
        ("x", Series::float(vec![1.0, 2.0, 3.0, 4.0])),
    ])
    .unwrap();
    assert!(matches!(
        glm("y ~ x", Family::Binomial, &three_levels),
        Err(ModelError::InvalidResponse { .. })
    ));
}

#[test]
fn test_logistic_fit() {
    let data = logistic(400, 3);
    let fit = glm("outcome ~ x", Family::Binomial, &data).unwrap();

    assert_eq!(
        fit.response().classes,
        Some(["no".to_string(), "yes".to_string()])
    );
    assert!(fit.iterations() > 0);
    assert_eq!(fit.dispersion(), 1.0);

    // score equations X'(y - mu) = 0 at the MLE
    let x = data.get_column("x").and_then(|s| s.to_float()).unwrap();
    let residuals = fit.residuals();
    let score_intercept: f64 = residuals.iter().sum();
    let score_x: f64 = residuals.iter().zip(x.iter()).map(|(r, x)| r * x).sum();
    assert_abs_diff_eq!(score_intercept, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(score_x, 0.0, epsilon = 1e-6);

    assert_abs_diff_eq!(fit.coefficient("x").unwrap(), 0.8, epsilon = 0.4);

    let summary = fit.summary(0.95).unwrap();
    assert!(summary.coefficient("x").unwrap().df.is_none());
    assert!(summary.to_string().contains("z value"));
    let stats = summary.model_statistics;
    assert!(stats.r_squared.is_none());
    assert!(stats.chi_squared.unwrap() > 0.0);
    assert_eq!(stats.iterations, Some(fit.iterations()));
}

#[test]
fn test_poisson_fit() {
    let data = counts(300, 5);
    let fit = glm("y ~ x", Family::Poisson, &data).unwrap();

    let x = data.get_column("x").and_then(|s| s.to_float()).unwrap();
    let residuals = fit.residuals();
    assert_abs_diff_eq!(residuals.iter().sum::<f64>(), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(
        residuals.iter().zip(x.iter()).map(|(r, x)| r * x).sum::<f64>(),
        0.0,
        epsilon = 1e-6
    );

    assert_abs_diff_eq!(fit.coefficient("x").unwrap(), 0.3, epsilon = 0.15);
    assert_eq!(fit.n_parameters(), 2);
    assert!(fit.deviance() < fit.null_deviance());
    assert_abs_diff_eq!(
        fit.aic(),
        -2.0 * fit.log_likelihood() + 4.0,
        epsilon = 1e-10
    );
}

#[test]
fn test_invalid_options() {
    let data = crickets();
    let model = Model::new("rate ~ temp").options(FitOptions::new().max_iter(0));
    assert!(matches!(
        model.fit(&data),
        Err(ModelError::InvalidConfig { .. })
    ));
}

#[test]
fn test_model_spec_serde() {
    let model = Model::new("rate ~ temp * species")
        .family(Family::Gaussian)
        .reference("species", "niveus");

    let json = serde_json::to_string(&model).unwrap();
    let restored: Model = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, model);
    assert_eq!(
        restored.level_policies()["species"].reference.as_deref(),
        Some("niveus")
    );
}

#[test]
fn test_fitted_model_persistence() {
    let data = crickets();
    let fit = Model::new("rate ~ poly(temp, 2) + species")
        .reference("species", "niveus")
        .fit(&data)
        .unwrap();

    let json = serde_json::to_string(&fit).unwrap();
    let restored: FittedModel = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.coefficient_names(), fit.coefficient_names());
    assert_eq!(restored.family(), fit.family());
    assert_eq!(restored.n_obs(), fit.n_obs());
    for (a, b) in restored.estimates().iter().zip(fit.estimates()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }

    let before = crate::predict(&fit, &data, crate::MissingPolicy::Propagate).unwrap();
    let after = crate::predict(&restored, &data, crate::MissingPolicy::Propagate).unwrap();
    for (a, b) in before.fit().unwrap().iter().zip(after.fit().unwrap()) {
        assert_abs_diff_eq!(a.unwrap(), b.unwrap(), epsilon = 1e-8);
    }
}

#[test]
fn test_aliased_estimates_survive_serialization() {
    let data = crickets();
    let temp = data.get_column("temp").and_then(|s| s.to_float()).unwrap();
    let data = data
        .with_column("temp2", Series::float(temp.mapv(|t| 2.0 * t)))
        .unwrap();
    let fit = lm("rate ~ temp + temp2", &data).unwrap();

    let json = serde_json::to_string(&fit).unwrap();
    let restored: FittedModel = serde_json::from_str(&json).unwrap();
    assert!(restored.coefficient("temp2").unwrap().is_nan());
    assert_eq!(restored.aliased_names(), vec!["temp2"]);
}
