//! Response families and their canonical links

use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;
use std::fmt;

/// Fitted probabilities are kept this far from 0 and 1
const PROBABILITY_EPS: f64 = 10.0 * f64::EPSILON;

/// Distribution of the response, each with its canonical link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// Normal errors, identity link, fit by least squares
    #[default]
    Gaussian,
    /// Binary or proportion response, logit link
    Binomial,
    /// Count response, log link
    Poisson,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::Gaussian => "gaussian",
            Family::Binomial => "binomial",
            Family::Poisson => "poisson",
        }
    }

    pub fn link_name(&self) -> &'static str {
        match self {
            Family::Gaussian => "identity",
            Family::Binomial => "logit",
            Family::Poisson => "log",
        }
    }

    /// Whether the dispersion is estimated rather than fixed at one
    pub fn estimates_dispersion(&self) -> bool {
        matches!(self, Family::Gaussian)
    }

    /// Link function `eta = g(mu)`
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Family::Gaussian => mu,
            Family::Binomial => (mu / (1.0 - mu)).ln(),
            Family::Poisson => mu.ln(),
        }
    }

    /// Inverse link `mu = g^-1(eta)`
    pub fn inverse_link(&self, eta: f64) -> f64 {
        match self {
            Family::Gaussian => eta,
            Family::Binomial => {
                let mu = 1.0 / (1.0 + (-eta).exp());
                mu.clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS)
            }
            Family::Poisson => eta.exp().max(f64::EPSILON),
        }
    }

    /// Derivative `d mu / d eta`
    pub fn mu_eta(&self, eta: f64) -> f64 {
        match self {
            Family::Gaussian => 1.0,
            Family::Binomial => {
                let mu = self.inverse_link(eta);
                (mu * (1.0 - mu)).max(f64::EPSILON)
            }
            Family::Poisson => eta.exp().max(f64::EPSILON),
        }
    }

    /// Variance function `V(mu)`
    pub fn variance(&self, mu: f64) -> f64 {
        match self {
            Family::Gaussian => 1.0,
            Family::Binomial => mu * (1.0 - mu),
            Family::Poisson => mu,
        }
    }

    /// Starting mean for iterative fits
    pub fn initial_mu(&self, y: f64) -> f64 {
        match self {
            Family::Gaussian => y,
            Family::Binomial => (y + 0.5) / 2.0,
            Family::Poisson => y + 0.1,
        }
    }

    /// Contribution of one observation to the deviance
    pub fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        match self {
            Family::Gaussian => (y - mu).powi(2),
            Family::Binomial => 2.0 * (y_log_y(y, mu) + y_log_y(1.0 - y, 1.0 - mu)),
            Family::Poisson => 2.0 * (y_log_y(y, mu) - (y - mu)),
        }
    }

    /// Total deviance
    pub fn deviance(&self, y: &[f64], mu: &[f64]) -> f64 {
        y.iter()
            .zip(mu)
            .map(|(&y, &mu)| self.unit_deviance(y, mu))
            .sum()
    }

    /// Maximized log-likelihood; the Gaussian variance is profiled out
    pub fn log_likelihood(&self, y: &[f64], mu: &[f64]) -> f64 {
        let n = y.len() as f64;
        match self {
            Family::Gaussian => {
                let rss = self.deviance(y, mu);
                -0.5 * n * ((2.0 * std::f64::consts::PI * rss / n).ln() + 1.0)
            }
            Family::Binomial => y
                .iter()
                .zip(mu)
                .map(|(&y, &mu)| xlogy(y, mu) + xlogy(1.0 - y, 1.0 - mu))
                .sum(),
            Family::Poisson => y
                .iter()
                .zip(mu)
                .map(|(&y, &mu)| xlogy(y, mu) - mu - ln_gamma(y + 1.0))
                .sum(),
        }
    }

    /// Whether a fitted mean sits on the boundary of the parameter space
    pub fn is_boundary(&self, mu: f64) -> bool {
        match self {
            Family::Gaussian => false,
            Family::Binomial => mu <= PROBABILITY_EPS || mu >= 1.0 - PROBABILITY_EPS,
            Family::Poisson => mu <= f64::EPSILON,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `y * ln(y / mu)`, zero when `y` is zero
fn y_log_y(y: f64, mu: f64) -> f64 {
    if y == 0.0 {
        0.0
    } else {
        y * (y / mu).ln()
    }
}

/// `x * ln(y)`, zero when `x` is zero
fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}
