//! Iteratively reweighted least squares for non-Gaussian families

use ndarray::{Array1, ArrayView1};
use tilde_core::data::Matrix;
use tilde_core::design::DesignMatrix;
use tilde_core::linalg::QrDecomposition;

use super::{select_columns, FitOptions, FitSolution};
use crate::base::{ModelError, Result};

pub(super) fn fit(x: &DesignMatrix, y: ArrayView1<f64>, options: &FitOptions) -> Result<FitSolution> {
    let family = options.family;
    let n = y.len();
    let p = x.ncols();

    // aliasing is decided once, on the unweighted design
    let aliased = QrDecomposition::new(&x.matrix, options.rank_tolerance).aliased();
    let kept: Vec<usize> = (0..p).filter(|&j| !aliased[j]).collect();
    let rank = kept.len();
    let xk = select_columns(&x.matrix, &kept);

    let y: Vec<f64> = y.to_vec();
    let mut mu: Vec<f64> = y.iter().map(|&v| family.initial_mu(v)).collect();
    let mut eta: Vec<f64> = mu.iter().map(|&m| family.link(m)).collect();

    let mut beta = Array1::<f64>::zeros(rank);
    let mut covariance = Matrix::zeros((rank, rank));
    let mut last_change = f64::INFINITY;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iter {
        iterations += 1;

        let mut xw = xk.clone();
        let mut zw = Array1::<f64>::zeros(n);
        for i in 0..n {
            let d = family.mu_eta(eta[i]);
            let sqrt_w = (d * d / family.variance(mu[i])).sqrt();
            zw[i] = sqrt_w * (eta[i] + (y[i] - mu[i]) / d);
            xw.row_mut(i).mapv_inplace(|v| v * sqrt_w);
        }

        let qr = QrDecomposition::new(&xw, options.rank_tolerance);
        if qr.rank() < rank {
            return Err(ModelError::numerical(
                format!(
                    "weighted design lost rank at iteration {} ({} of {} columns)",
                    iterations,
                    qr.rank(),
                    rank
                ),
                "irls",
            ));
        }

        let next = qr.coefficients(zw.view());
        if next.iter().any(|b| !b.is_finite()) {
            return Err(ModelError::numerical(
                format!("non-finite coefficient at iteration {}", iterations),
                "irls",
            ));
        }

        last_change = next
            .iter()
            .zip(beta.iter())
            .map(|(b, old)| (b - old).abs() / (b.abs() + 0.1))
            .fold(0.0, f64::max);

        covariance = qr.unscaled_covariance();
        beta = next;
        eta = xk.dot(&beta).to_vec();
        mu = eta.iter().map(|&e| family.inverse_link(e)).collect();

        log::debug!(
            "irls iteration {}: deviance {:.6}, max relative change {:.3e}",
            iterations,
            family.deviance(&y, &mu),
            last_change
        );

        if last_change < options.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!(
            "{} fit did not converge in {} iterations (last change {:.3e})",
            family,
            iterations,
            last_change
        );
        return Err(ModelError::NonConvergence {
            iterations,
            last_change,
            coefficients: beta.to_vec(),
        });
    }

    let boundary = mu.iter().filter(|&&m| family.is_boundary(m)).count();
    if boundary > 0 {
        log::warn!(
            "{} fitted value(s) numerically at the boundary of the {} family",
            boundary,
            family
        );
    }

    let mut coefficients = Array1::from_elem(p, f64::NAN);
    for (k, &j) in kept.iter().enumerate() {
        coefficients[j] = beta[k];
    }

    Ok(FitSolution {
        coefficients,
        aliased,
        rank,
        unscaled_covariance: covariance,
        deviance: family.deviance(&y, &mu),
        fitted: Array1::from(mu),
        linear_predictor: Array1::from(eta),
        iterations,
    })
}
