//! Shared test fixtures

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use tilde_core::data::{DataFrame, DataFrameBuilder, Matrix, Series};

/// Chirp rate against temperature for two tree cricket species
pub(crate) fn crickets() -> DataFrame {
    let rows: [(&str, f64, f64); 31] = [
        ("exclamationis", 20.8, 67.9),
        ("exclamationis", 20.8, 65.1),
        ("exclamationis", 24.0, 77.3),
        ("exclamationis", 24.0, 78.7),
        ("exclamationis", 24.0, 79.4),
        ("exclamationis", 24.0, 80.4),
        ("exclamationis", 26.2, 85.8),
        ("exclamationis", 26.2, 86.6),
        ("exclamationis", 26.2, 87.5),
        ("exclamationis", 26.2, 89.1),
        ("exclamationis", 28.4, 98.6),
        ("exclamationis", 29.0, 100.8),
        ("exclamationis", 30.4, 99.3),
        ("exclamationis", 30.4, 101.7),
        ("niveus", 17.2, 44.3),
        ("niveus", 18.3, 47.2),
        ("niveus", 18.3, 47.6),
        ("niveus", 18.3, 49.6),
        ("niveus", 18.9, 50.3),
        ("niveus", 18.9, 51.8),
        ("niveus", 20.4, 60.0),
        ("niveus", 21.0, 58.5),
        ("niveus", 21.0, 58.9),
        ("niveus", 22.1, 60.7),
        ("niveus", 23.5, 69.8),
        ("niveus", 24.2, 70.9),
        ("niveus", 25.9, 76.2),
        ("niveus", 26.5, 76.1),
        ("niveus", 26.5, 77.0),
        ("niveus", 26.5, 77.7),
        ("niveus", 28.6, 84.7),
    ];

    let species: Vec<&str> = rows.iter().map(|r| r.0).collect();
    let temp: Vec<f64> = rows.iter().map(|r| r.1).collect();
    let rate: Vec<f64> = rows.iter().map(|r| r.2).collect();

    DataFrameBuilder::new()
        .categorical("species", &species)
        .unwrap()
        .floats("temp", &temp)
        .unwrap()
        .floats("rate", &rate)
        .unwrap()
        .build()
        .unwrap()
}

/// `y = 1 + 2 x1 - 0.5 x2 + N(0, 0.3)` with a three-level group shift
pub(crate) fn noisy_linear(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.3).unwrap();
    let groups = ["a", "b", "c"];

    let mut x1 = Vec::with_capacity(n);
    let mut x2 = Vec::with_capacity(n);
    let mut g = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let a = rng.random_range(0.0..10.0);
        let b = rng.random_range(-5.0..5.0);
        let level = i % 3;
        x1.push(a);
        x2.push(b);
        g.push(groups[level]);
        y.push(1.0 + 2.0 * a - 0.5 * b + level as f64 + noise.sample(&mut rng));
    }

    DataFrameBuilder::new()
        .floats("y", &y)
        .unwrap()
        .floats("x1", &x1)
        .unwrap()
        .floats("x2", &x2)
        .unwrap()
        .categorical("g", &g)
        .unwrap()
        .build()
        .unwrap()
}

/// Binary outcome with `logit P(yes) = -1 + 0.8 x`
pub(crate) fn logistic(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(n);
    let mut outcome = Vec::with_capacity(n);
    for _ in 0..n {
        let v: f64 = rng.random_range(-3.0..5.0);
        let p = 1.0 / (1.0 + (1.0 - 0.8 * v).exp());
        x.push(v);
        outcome.push(Some(if rng.random::<f64>() < p { "yes" } else { "no" }));
    }

    DataFrame::from_columns(vec![
        ("outcome", Series::factor(&outcome, &["no", "yes"]).unwrap()),
        ("x", Series::float(x)),
    ])
    .unwrap()
}

/// Counts with `log E[y] = 0.5 + 0.3 x`
pub(crate) fn counts(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let v: f64 = rng.random_range(0.0..4.0);
        let rate = (0.5 + 0.3 * v).exp();
        x.push(v);
        y.push(Poisson::new(rate).unwrap().sample(&mut rng));
    }

    DataFrame::from_columns(vec![("y", Series::float(y)), ("x", Series::float(x))]).unwrap()
}

/// Least squares through the normal equations, returning estimates and RSS
pub(crate) fn normal_equations(x: &Matrix, y: &[f64]) -> (Vec<f64>, f64) {
    let p = x.ncols();
    let mut a = vec![vec![0.0; p + 1]; p];
    for i in 0..p {
        for j in 0..p {
            a[i][j] = x.column(i).dot(&x.column(j));
        }
        a[i][p] = x.column(i).iter().zip(y).map(|(u, v)| u * v).sum();
    }

    // Gauss-Jordan with partial pivoting
    for col in 0..p {
        let pivot = (col..p)
            .max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))
            .unwrap();
        a.swap(col, pivot);
        for row in 0..p {
            if row != col {
                let factor = a[row][col] / a[col][col];
                for k in col..=p {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
    }

    let beta: Vec<f64> = (0..p).map(|i| a[i][p] / a[i][i]).collect();
    let rss = (0..x.nrows())
        .map(|i| {
            let fit: f64 = (0..p).map(|j| x[[i, j]] * beta[j]).sum();
            (y[i] - fit).powi(2)
        })
        .sum();
    (beta, rss)
}
