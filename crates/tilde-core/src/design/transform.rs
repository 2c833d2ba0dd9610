//! Transform bases for `log(x)`, `center(x)`, `poly(x, d)`, `bs(x, df)` and friends
//!
//! Stateful transforms learn their parameters (means, recurrence
//! coefficients, knots) once from the fitting data. The fitted parameters are
//! replayed unchanged on new data.

use crate::data::{quantile, FloatArray, Matrix};
use crate::formula::{ArgValue, ElementwiseFn, FormulaError, FormulaResult, TransformCall};
use serde::{Deserialize, Serialize};

/// Transform named by a call, with its literal arguments validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Elementwise(ElementwiseFn),
    Center,
    Scale,
    Poly { degree: usize, raw: bool },
    BSpline { df: usize, degree: usize },
}

impl TransformKind {
    /// Resolve a call's function name and arguments
    pub fn from_call(call: &TransformCall) -> FormulaResult<Self> {
        let function = call.function.as_str();

        if let Some(f) = ElementwiseFn::from_name(function) {
            check_args(call, &[])?;
            return Ok(TransformKind::Elementwise(f));
        }

        match function {
            "center" => {
                check_args(call, &[])?;
                Ok(TransformKind::Center)
            }
            "scale" => {
                check_args(call, &[])?;
                Ok(TransformKind::Scale)
            }
            "poly" => {
                check_args(call, &["degree", "raw"])?;
                let degree = integer_arg(call, "degree", 0)?.unwrap_or(1);
                let raw = bool_arg(call, "raw", 1)?.unwrap_or(false);
                Ok(TransformKind::Poly { degree, raw })
            }
            "bs" => {
                check_args(call, &["df", "degree"])?;
                let degree = integer_arg(call, "degree", 1)?.unwrap_or(3);
                let df = integer_arg(call, "df", 0)?.unwrap_or(degree);
                if df < degree {
                    return Err(FormulaError::function_with_arg(
                        function,
                        "df",
                        format!("df = {} must be at least degree = {}", df, degree),
                    ));
                }
                Ok(TransformKind::BSpline { df, degree })
            }
            _ => Err(FormulaError::function(
                function,
                "unknown transform; expected one of log, log2, log10, exp, sqrt, abs, center, scale, poly, bs",
            )),
        }
    }

    /// Learn the transform's parameters from the observed values
    pub fn fit(&self, values: &FloatArray, term: &str) -> FormulaResult<FittedTransform> {
        let xs: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if xs.is_empty() {
            return Err(FormulaError::domain(term, "no observed values to fit"));
        }
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;

        match *self {
            TransformKind::Elementwise(f) => Ok(FittedTransform::Elementwise(f)),
            TransformKind::Center => Ok(FittedTransform::Center { mean }),
            TransformKind::Scale => {
                let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
                let sd = var.sqrt();
                if !sd.is_finite() || sd == 0.0 {
                    return Err(FormulaError::domain(term, "cannot scale a constant input"));
                }
                Ok(FittedTransform::Scale { mean, sd })
            }
            TransformKind::Poly { degree, raw: true } => Ok(FittedTransform::RawPoly { degree }),
            TransformKind::Poly { degree, raw: false } => {
                let mut distinct = xs.clone();
                distinct.sort_by(|a, b| a.total_cmp(b));
                distinct.dedup();
                if degree >= distinct.len() {
                    return Err(FormulaError::domain(
                        term,
                        format!(
                            "degree {} must be less than the number of unique points ({})",
                            degree,
                            distinct.len()
                        ),
                    ));
                }
                Ok(fit_orthogonal_poly(&xs, degree))
            }
            TransformKind::BSpline { df, degree } => {
                let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if lo == hi {
                    return Err(FormulaError::domain(term, "cannot place knots on a constant input"));
                }

                let n_interior = df - degree;
                let mut knots = vec![lo; degree + 1];
                for i in 1..=n_interior {
                    let q = quantile(&xs, i as f64 / (n_interior + 1) as f64).unwrap_or(lo);
                    knots.push(q);
                }
                knots.extend(std::iter::repeat(hi).take(degree + 1));

                Ok(FittedTransform::BSpline { degree, knots })
            }
        }
    }
}

/// Transform with frozen parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedTransform {
    Elementwise(ElementwiseFn),
    Center { mean: f64 },
    Scale { mean: f64, sd: f64 },
    /// Three-term recurrence coefficients; `norm2` starts with `1, n`
    OrthoPoly { alpha: Vec<f64>, norm2: Vec<f64> },
    RawPoly { degree: usize },
    /// Clamped knot vector including boundary knots
    BSpline { degree: usize, knots: Vec<f64> },
}

impl FittedTransform {
    /// Number of design columns produced
    pub fn ncols(&self) -> usize {
        match self {
            FittedTransform::Elementwise(_)
            | FittedTransform::Center { .. }
            | FittedTransform::Scale { .. } => 1,
            FittedTransform::OrthoPoly { alpha, .. } => alpha.len(),
            FittedTransform::RawPoly { degree } => *degree,
            // first basis function is dropped
            FittedTransform::BSpline { degree, knots } => knots.len() - degree - 2,
        }
    }

    /// Column names, the term label with a 1-based suffix for bases
    pub fn column_names(&self, label: &str) -> Vec<String> {
        match self.ncols() {
            1 if !self.is_basis() => vec![label.to_string()],
            k => (1..=k).map(|j| format!("{}{}", label, j)).collect(),
        }
    }

    fn is_basis(&self) -> bool {
        matches!(
            self,
            FittedTransform::OrthoPoly { .. }
                | FittedTransform::RawPoly { .. }
                | FittedTransform::BSpline { .. }
        )
    }

    /// Apply to new values; NaN inputs give NaN rows
    pub fn apply(&self, values: &FloatArray, term: &str) -> FormulaResult<Matrix> {
        let n = values.len();
        let k = self.ncols();
        let mut out = Matrix::from_elem((n, k), f64::NAN);

        if let FittedTransform::Elementwise(f) = self {
            out.column_mut(0).assign(&f.apply_array(values, term)?);
            return Ok(out);
        }

        for (i, &x) in values.iter().enumerate() {
            if x.is_nan() {
                continue;
            }
            let mut row = out.row_mut(i);
            match self {
                FittedTransform::Elementwise(_) => {}
                FittedTransform::Center { mean } => row[0] = x - mean,
                FittedTransform::Scale { mean, sd } => row[0] = (x - mean) / sd,
                FittedTransform::RawPoly { degree } => {
                    for j in 0..*degree {
                        row[j] = x.powi(j as i32 + 1);
                    }
                }
                FittedTransform::OrthoPoly { alpha, norm2 } => {
                    let mut prev = 0.0;
                    let mut cur = 1.0;
                    for (j, a) in alpha.iter().enumerate() {
                        let next = (x - a) * cur - (norm2[j + 1] / norm2[j]) * prev;
                        row[j] = next / norm2[j + 2].sqrt();
                        prev = cur;
                        cur = next;
                    }
                }
                FittedTransform::BSpline { degree, knots } => {
                    let lo = knots[0];
                    let hi = knots[knots.len() - 1];
                    let basis = bspline_basis(knots, *degree, x.clamp(lo, hi));
                    for (j, b) in basis.iter().skip(1).enumerate() {
                        row[j] = *b;
                    }
                }
            }
        }

        Ok(out)
    }
}

/// Stieltjes recurrence for polynomials orthogonal over the fitting points
fn fit_orthogonal_poly(xs: &[f64], degree: usize) -> FittedTransform {
    let n = xs.len();
    let mut alpha = Vec::with_capacity(degree);
    let mut norm2 = vec![1.0, n as f64];

    let mut prev = vec![0.0; n];
    let mut cur = vec![1.0; n];

    for k in 0..degree {
        let weight: f64 = cur.iter().map(|p| p * p).sum();
        let a = xs.iter().zip(&cur).map(|(x, p)| x * p * p).sum::<f64>() / weight;
        alpha.push(a);

        let ratio = norm2[k + 1] / norm2[k];
        let next: Vec<f64> = xs
            .iter()
            .zip(cur.iter().zip(&prev))
            .map(|(x, (c, p))| (x - a) * c - ratio * p)
            .collect();
        norm2.push(next.iter().map(|p| p * p).sum());

        prev = cur;
        cur = next;
    }

    FittedTransform::OrthoPoly { alpha, norm2 }
}

/// All B-spline basis values at `x` (Cox-de Boor, clamped knots)
fn bspline_basis(knots: &[f64], degree: usize, x: f64) -> Vec<f64> {
    let n_basis = knots.len() - degree - 1;
    let mut out = vec![0.0; n_basis];

    let span = if x >= knots[n_basis] {
        // right boundary belongs to the last non-empty span
        let mut span = n_basis - 1;
        while span > degree && knots[span] >= knots[span + 1] {
            span -= 1;
        }
        span
    } else {
        let mut span = degree;
        while span < n_basis - 1 && x >= knots[span + 1] {
            span += 1;
        }
        span
    };

    let mut values = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    values[0] = 1.0;

    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = values[r] / (right[r + 1] + left[j - r]);
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }

    for (i, v) in values.into_iter().enumerate() {
        out[span - degree + i] = v;
    }
    out
}

fn check_args(call: &TransformCall, allowed: &[&str]) -> FormulaResult<()> {
    let positional = call.args.iter().filter(|a| a.name.is_none()).count();
    if positional > allowed.len() {
        return Err(FormulaError::function(
            &call.function,
            format!(
                "takes at most {} extra argument(s), got {}",
                allowed.len(),
                positional
            ),
        ));
    }
    for arg in &call.args {
        if let Some(name) = &arg.name {
            if !allowed.contains(&name.as_str()) {
                return Err(FormulaError::function_with_arg(
                    &call.function,
                    name,
                    "unknown argument",
                ));
            }
        }
    }
    Ok(())
}

fn integer_arg(call: &TransformCall, name: &str, position: usize) -> FormulaResult<Option<usize>> {
    match call.arg(name, position) {
        None => Ok(None),
        Some(ArgValue::Number(v)) if v >= 1.0 && v.fract() == 0.0 => Ok(Some(v as usize)),
        Some(other) => Err(FormulaError::function_with_arg(
            &call.function,
            name,
            format!("expected a positive integer, got {}", other),
        )),
    }
}

fn bool_arg(call: &TransformCall, name: &str, position: usize) -> FormulaResult<Option<bool>> {
    match call.arg(name, position) {
        None => Ok(None),
        Some(ArgValue::Bool(b)) => Ok(Some(b)),
        Some(other) => Err(FormulaError::function_with_arg(
            &call.function,
            name,
            format!("expected TRUE or FALSE, got {}", other),
        )),
    }
}
