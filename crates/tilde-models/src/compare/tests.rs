use super::*;
use crate::fixtures::{counts, crickets, normal_equations};
use crate::model::{glm, lm};
use approx::assert_abs_diff_eq;
use tilde_core::data::{DataFrame, Matrix, Series};

/// `[1, temp, niveus, temp * niveus]`, optionally without the interaction
fn cricket_matrix(data: &DataFrame, interaction: bool) -> Matrix {
    let temp = data.get_column("temp").and_then(|s| s.to_float()).unwrap();
    let species = data.get_column("species").and_then(|s| s.labels()).unwrap();
    let p = if interaction { 4 } else { 3 };
    let mut x = Matrix::zeros((data.nrows(), p));
    for i in 0..data.nrows() {
        let niveus = if species[i] == Some("niveus") { 1.0 } else { 0.0 };
        x[[i, 0]] = 1.0;
        x[[i, 1]] = temp[i];
        x[[i, 2]] = niveus;
        if interaction {
            x[[i, 3]] = temp[i] * niveus;
        }
    }
    x
}

#[test]
fn test_interaction_f_test() {
    let data = crickets();
    let reduced = lm("rate ~ temp + species", &data).unwrap();
    let full = lm("rate ~ (temp + species)^2", &data).unwrap();

    assert_eq!(
        full.coefficient_names(),
        ["(Intercept)", "temp", "species[niveus]", "temp:species[niveus]"]
    );

    let table = compare(&reduced, &full).unwrap();

    let y: Vec<f64> = data
        .get_column("rate")
        .and_then(|s| s.to_float())
        .unwrap()
        .to_vec();
    let (_, rss_reduced) = normal_equations(&cricket_matrix(&data, false), &y);
    let (_, rss_full) = normal_equations(&cricket_matrix(&data, true), &y);
    let f = (rss_reduced - rss_full) / (rss_full / 27.0);
    let p = 1.0 - FisherSnedecor::new(1.0, 27.0).unwrap().cdf(f);

    assert_eq!(table.test, ComparisonTest::F);
    assert_eq!(table.df, 1);
    assert_eq!(table.reduced.df_residual, 28);
    assert_eq!(table.full.df_residual, 27);
    assert_abs_diff_eq!(table.reduced.rss, rss_reduced, epsilon = 1e-8);
    assert_abs_diff_eq!(table.full.rss, rss_full, epsilon = 1e-8);
    assert_abs_diff_eq!(table.sum_of_squares, rss_reduced - rss_full, epsilon = 1e-8);
    assert_abs_diff_eq!(table.statistic, f, epsilon = 1e-6);
    assert_abs_diff_eq!(table.p_value, p, epsilon = 1e-8);
    assert!(table.p_value > 0.0 && table.p_value <= 1.0);

    let text = table.to_string();
    assert!(text.contains("Model 1: rate ~ temp + species"));
    assert!(text.contains("Res.Df"));
}

#[test]
fn test_self_comparison() {
    let data = crickets();
    let model = lm("rate ~ temp + species", &data).unwrap();

    let table = compare(&model, &model).unwrap();
    assert_eq!(table.df, 0);
    assert_eq!(table.statistic, 0.0);
    assert_eq!(table.p_value, 1.0);
}

#[test]
fn test_not_nested() {
    let data = crickets();
    let with_species = lm("rate ~ temp + species", &data).unwrap();
    let temp_only = lm("rate ~ temp", &data).unwrap();

    match compare(&with_species, &temp_only) {
        Err(ModelError::NotNested { term }) => assert_eq!(term, "species"),
        other => panic!("expected a nesting error, got {:?}", other),
    }

    let no_intercept = lm("rate ~ temp + species - 1", &data).unwrap();
    match compare(&temp_only, &no_intercept) {
        Err(ModelError::NotNested { term }) => assert_eq!(term, "(Intercept)"),
        other => panic!("expected a nesting error, got {:?}", other),
    }
}

#[test]
fn test_mismatched_models() {
    let data = crickets();
    let reduced = lm("rate ~ temp", &data).unwrap();

    let rate = data.get_column("rate").and_then(|s| s.to_float()).unwrap();
    let mut with_gap: Vec<Option<f64>> = rate.iter().map(|&r| Some(r)).collect();
    with_gap[3] = None;
    let gapped = DataFrame::from_columns(vec![
        ("species", data.get_column("species").unwrap().clone()),
        ("temp", data.get_column("temp").unwrap().clone()),
        ("rate", Series::float_opt(&with_gap)),
    ])
    .unwrap();
    let fewer_rows = lm("rate ~ temp + species", &gapped).unwrap();
    assert!(matches!(
        compare(&reduced, &fewer_rows),
        Err(ModelError::MismatchedData { .. })
    ));

    let poisson = glm("rate ~ temp + species", Family::Poisson, &data).unwrap();
    assert!(matches!(
        compare(&reduced, &poisson),
        Err(ModelError::MismatchedData { .. })
    ));

    let temp_response = lm("temp ~ species", &data).unwrap();
    let other_response = lm("rate ~ species", &data).unwrap();
    assert!(matches!(
        compare(&temp_response, &other_response),
        Err(ModelError::MismatchedData { .. })
    ));
}

#[test]
fn test_deviance_test_for_counts() {
    let data = counts(250, 8);
    let null = glm("y ~ 1", Family::Poisson, &data).unwrap();
    let slope = glm("y ~ x", Family::Poisson, &data).unwrap();

    let table = compare(&null, &slope).unwrap();
    assert_eq!(table.test, ComparisonTest::ChiSquared);
    assert_eq!(table.df, 1);
    assert_abs_diff_eq!(
        table.statistic,
        null.deviance() - slope.deviance(),
        epsilon = 1e-10
    );
    assert_abs_diff_eq!(null.deviance(), slope.null_deviance(), epsilon = 1e-6);
    assert!(table.p_value < 1e-6);
    assert!(table.to_string().contains("Chisq"));
}
