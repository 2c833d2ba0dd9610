//! Ordinary least squares on a rank-revealing QR decomposition

use ndarray::ArrayView1;
use tilde_core::design::DesignMatrix;
use tilde_core::linalg::QrDecomposition;

use super::{linear_predictor, Family, FitOptions, FitSolution};
use crate::base::Result;

pub(super) fn fit(x: &DesignMatrix, y: ArrayView1<f64>, options: &FitOptions) -> Result<FitSolution> {
    let qr = QrDecomposition::new(&x.matrix, options.rank_tolerance);
    let coefficients = qr.coefficients(y);
    let fitted = linear_predictor(&x.matrix, &coefficients);

    let deviance = Family::Gaussian.deviance(&y.to_vec(), &fitted.to_vec());

    log::debug!(
        "least squares: {} x {} design, rank {}, RSS {:.6}",
        x.nrows(),
        x.ncols(),
        qr.rank(),
        deviance
    );

    Ok(FitSolution {
        aliased: qr.aliased(),
        rank: qr.rank(),
        unscaled_covariance: qr.unscaled_covariance(),
        linear_predictor: fitted.clone(),
        fitted,
        coefficients,
        deviance,
        iterations: 0,
    })
}
