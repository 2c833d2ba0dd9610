use super::*;
use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};

fn design(names: &[&str], matrix: Array2<f64>) -> DesignMatrix {
    DesignMatrix {
        names: names.iter().map(|n| n.to_string()).collect(),
        assign: (0..names.len()).collect(),
        matrix,
    }
}

/// Intercept plus a 0/1 group indicator, `n0` rows in the first group
fn two_groups(n0: usize, n1: usize) -> DesignMatrix {
    let mut matrix = Array2::zeros((n0 + n1, 2));
    for i in 0..n0 + n1 {
        matrix[[i, 0]] = 1.0;
        matrix[[i, 1]] = if i < n0 { 0.0 } else { 1.0 };
    }
    design(&["(Intercept)", "g[b]"], matrix)
}

#[test]
fn test_options_validation() {
    assert!(FitOptions::default().validate().is_ok());

    let cases = [
        FitOptions::new().max_iter(0),
        FitOptions::new().tolerance(-1.0),
        FitOptions::new().tolerance(f64::NAN),
        FitOptions::new().rank_tolerance(1.5),
    ];
    for options in cases {
        assert!(matches!(
            options.validate(),
            Err(ModelError::InvalidConfig { .. })
        ));
    }
}

#[test]
fn test_least_squares_line() {
    let x = design(
        &["(Intercept)", "x"],
        array![[1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0], [1.0, 5.0]],
    );
    let y = array![5.0, 6.0, 8.0, 9.0, 11.0];

    let fit = ModelFitter::default().fit(&x, y.view()).unwrap();

    assert_eq!(fit.rank, 2);
    assert_eq!(fit.iterations, 0);
    assert_eq!(fit.df_residual(), 3);
    assert_abs_diff_eq!(fit.coefficients, array![3.3, 1.5], epsilon = 1e-10);
    assert_abs_diff_eq!(fit.fitted, array![4.8, 6.3, 7.8, 9.3, 10.8], epsilon = 1e-10);
    assert_abs_diff_eq!(fit.deviance, 0.30, epsilon = 1e-10);
    assert_abs_diff_eq!(
        fit.unscaled_covariance,
        array![[1.1, -0.3], [-0.3, 0.1]],
        epsilon = 1e-10
    );
}

#[test]
fn test_aliased_column_is_dropped() {
    let x = design(
        &["(Intercept)", "x", "twice_x"],
        array![
            [1.0, 1.0, 2.0],
            [1.0, 2.0, 4.0],
            [1.0, 3.0, 6.0],
            [1.0, 4.0, 8.0],
            [1.0, 5.0, 10.0]
        ],
    );
    let y = array![5.0, 6.0, 8.0, 9.0, 11.0];

    let fit = ModelFitter::default().fit(&x, y.view()).unwrap();

    assert_eq!(fit.rank, 2);
    assert_eq!(fit.aliased, vec![false, false, true]);
    assert_eq!(fit.kept(), vec![0, 1]);
    assert!(fit.coefficients[2].is_nan());
    assert_abs_diff_eq!(fit.coefficients[1], 1.5, epsilon = 1e-10);
    assert_abs_diff_eq!(fit.deviance, 0.30, epsilon = 1e-10);
    assert_eq!(fit.unscaled_covariance.dim(), (2, 2));
}

#[test]
fn test_poisson_group_means() {
    let x = two_groups(3, 3);
    let y = array![2.0, 3.0, 4.0, 5.0, 7.0, 9.0];

    let fitter = ModelFitter::new(FitOptions::new().family(Family::Poisson));
    let fit = fitter.fit(&x, y.view()).unwrap();

    assert!(fit.iterations > 1);
    assert_abs_diff_eq!(fit.coefficients[0], 3.0_f64.ln(), epsilon = 1e-7);
    assert_abs_diff_eq!(fit.coefficients[1], (7.0_f64 / 3.0).ln(), epsilon = 1e-7);
    assert_abs_diff_eq!(fit.fitted, array![3.0, 3.0, 3.0, 7.0, 7.0, 7.0], epsilon = 1e-6);

    // Fisher information diag(n_g * mu_g) on the group parametrization
    assert_abs_diff_eq!(fit.unscaled_covariance[[0, 0]], 1.0 / 9.0, epsilon = 1e-6);
    assert_abs_diff_eq!(
        fit.unscaled_covariance[[1, 1]],
        1.0 / 9.0 + 1.0 / 21.0,
        epsilon = 1e-6
    );
}

#[test]
fn test_binomial_group_proportions() {
    let x = two_groups(4, 4);
    let y = array![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];

    let fitter = ModelFitter::new(FitOptions::new().family(Family::Binomial));
    let fit = fitter.fit(&x, y.view()).unwrap();

    assert_abs_diff_eq!(fit.coefficients[0], 3.0_f64.ln(), epsilon = 1e-7);
    assert_abs_diff_eq!(fit.coefficients[1], -2.0 * 3.0_f64.ln(), epsilon = 1e-7);
    assert_abs_diff_eq!(fit.fitted[0], 0.75, epsilon = 1e-7);
    assert_abs_diff_eq!(fit.fitted[7], 0.25, epsilon = 1e-7);
    assert_abs_diff_eq!(
        fit.linear_predictor[0],
        Family::Binomial.link(0.75),
        epsilon = 1e-7
    );
}

#[test]
fn test_iteration_cap_reports_non_convergence() {
    let x = two_groups(3, 3);
    let y = array![2.0, 3.0, 4.0, 5.0, 7.0, 9.0];

    let fitter = ModelFitter::new(FitOptions::new().family(Family::Poisson).max_iter(1));
    match fitter.fit(&x, y.view()) {
        Err(ModelError::NonConvergence {
            iterations,
            coefficients,
            last_change,
        }) => {
            assert_eq!(iterations, 1);
            assert_eq!(coefficients.len(), 2);
            assert!(last_change > 1e-8);
        }
        other => panic!("expected non-convergence, got {:?}", other),
    }
}

#[test]
fn test_singular_fits() {
    // as many coefficients as observations
    let x = design(&["(Intercept)", "x"], array![[1.0, 1.0], [1.0, 2.0]]);
    let y = array![1.0, 2.0];
    assert!(matches!(
        ModelFitter::default().fit(&x, y.view()),
        Err(ModelError::SingularFit { rank: 2, n_obs: 2, .. })
    ));

    let x = design(&["zero"], Array2::zeros((3, 1)));
    let y = array![1.0, 2.0, 3.0];
    assert!(matches!(
        ModelFitter::default().fit(&x, y.view()),
        Err(ModelError::SingularFit { rank: 0, .. })
    ));
}

#[test]
fn test_rejects_bad_input() {
    let x = design(&["(Intercept)"], Array2::ones((3, 1)));

    let short = array![1.0, 2.0];
    assert!(matches!(
        ModelFitter::default().fit(&x, short.view()),
        Err(ModelError::Formula(_))
    ));

    let with_nan = array![1.0, f64::NAN, 3.0];
    assert!(matches!(
        ModelFitter::default().fit(&x, with_nan.view()),
        Err(ModelError::NumericalError { .. })
    ));
}

#[test]
fn test_family_functions() {
    for family in [Family::Gaussian, Family::Binomial, Family::Poisson] {
        let mu = 0.3;
        assert_abs_diff_eq!(family.inverse_link(family.link(mu)), mu, epsilon = 1e-12);
    }

    assert_eq!(Family::Binomial.link_name(), "logit");
    assert_eq!(Family::Poisson.to_string(), "poisson");
    assert!(Family::Gaussian.estimates_dispersion());
    assert!(!Family::Poisson.estimates_dispersion());

    assert_abs_diff_eq!(
        Family::Gaussian.deviance(&[1.0, 2.0], &[0.5, 2.5]),
        0.5,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        Family::Binomial.unit_deviance(0.0, 0.2),
        -2.0 * 0.8_f64.ln(),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(Family::Poisson.unit_deviance(0.0, 1.5), 3.0, epsilon = 1e-12);

    // saturated fits sit at zero deviance
    assert_abs_diff_eq!(Family::Poisson.unit_deviance(4.0, 4.0), 0.0, epsilon = 1e-12);
    assert!(Family::Binomial.inverse_link(100.0) < 1.0);
}
