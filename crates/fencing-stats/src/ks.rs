//! Two-sample Kolmogorov-Smirnov test.
//!
//! The statistic is the largest vertical distance between the right-continuous
//! empirical CDFs of the two samples, evaluated at every pooled value:
//!
//! ```text
//! D = max_v | F_a(v) - F_b(v) |
//! ```
//!
//! The two-sided p-value `P(D' >= D)` under the null hypothesis that both samples
//! come from the same continuous distribution is computed
//!
//! - **exactly** when `max(n_a, n_b) <= EXACT_MAX_SIZE`, as the probability that a
//!   uniformly random interleaving of the two samples (a monotone lattice path from
//!   `(0, 0)` to `(n_a, n_b)`) ever leaves the band `|i/n_a - j/n_b| < D`. The mass
//!   is summed where paths first leave the band, so tiny p-values keep their
//!   precision;
//! - **asymptotically** otherwise, from the Kolmogorov limiting distribution at
//!   `sqrt(n_a n_b / (n_a + n_b)) * D`.
//!
//! Both samples are treated as unordered; ties need no special handling beyond
//! evaluating both CDFs at the tied value.

/// Largest sample size for which the exact p-value is computed.
pub const EXACT_MAX_SIZE: usize = 10_000;

/// How the p-value of a [`KsTest`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KsMethod {
    /// Exact permutation distribution of the statistic.
    Exact,
    /// Kolmogorov limiting distribution.
    Asymptotic,
}

/// Result of a two-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsTest {
    /// The KS statistic `D`, in `[0, 1]`.
    pub statistic: f64,
    /// Two-sided p-value, in `[0, 1]`.
    pub p_value: f64,
    /// Method used for the p-value.
    pub method: KsMethod,
}

impl KsTest {
    /// Runs the two-sided two-sample test.
    ///
    /// Returns `None` if either sample is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fencing_stats::ks::{KsMethod, KsTest};
    /// let a = [1.0, 2.0, 3.0, 4.0];
    /// let b = [5.0, 6.0, 7.0, 8.0];
    /// let test = KsTest::two_sample(&a, &b).unwrap();
    /// assert_eq!(test.statistic, 1.0);
    /// assert_eq!(test.method, KsMethod::Exact);
    /// // only 2 of the C(8, 4) = 70 interleavings separate the samples completely
    /// assert!((test.p_value - 2.0 / 70.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn two_sample(a: &[f64], b: &[f64]) -> Option<Self> {
        if a.is_empty() || b.is_empty() {
            return None;
        }

        let mut a = a.to_vec();
        let mut b = b.to_vec();
        a.sort_by(f64::total_cmp);
        b.sort_by(f64::total_cmp);

        let n_a = a.len();
        let n_b = b.len();
        let max_gap = max_cdf_gap(&a, &b);
        let statistic = max_gap as f64 / (n_a as f64 * n_b as f64);

        let (p_value, method) = if n_a.max(n_b) <= EXACT_MAX_SIZE {
            (exact_p_value(n_a, n_b, max_gap), KsMethod::Exact)
        } else {
            let en = (n_a as f64 * n_b as f64) / (n_a + n_b) as f64;
            (
                kolmogorov_sf(en.sqrt() * statistic),
                KsMethod::Asymptotic,
            )
        };

        Some(Self {
            statistic,
            p_value: p_value.clamp(0.0, 1.0),
            method,
        })
    }
}

/// Largest `|i * n_b - j * n_a|` over all pooled values, where `i` and `j` are the
/// number of values `<= v` in `a` and `b`.
///
/// Working in integers keeps the statistic exact, which the exact p-value relies on.
fn max_cdf_gap(sorted_a: &[f64], sorted_b: &[f64]) -> usize {
    let n_a = sorted_a.len();
    let n_b = sorted_b.len();
    sorted_a
        .iter()
        .chain(sorted_b)
        .map(|&v| {
            let i = sorted_a.partition_point(|&x| x <= v);
            let j = sorted_b.partition_point(|&x| x <= v);
            (i * n_b).abs_diff(j * n_a)
        })
        .max()
        .unwrap_or(0)
}

/// Probability that a uniformly random interleaving reaches a gap of at least `max_gap`.
///
/// Mass is pushed forward through the band and collected on the step that leaves it.
#[expect(clippy::cast_precision_loss)]
fn exact_p_value(n_a: usize, n_b: usize, max_gap: usize) -> f64 {
    if max_gap == 0 {
        return 1.0;
    }
    let inside = |i: usize, j: usize| (i * n_b).abs_diff(j * n_a) < max_gap;

    let mut exited = 0.0;
    let mut row = vec![0.0; n_b + 1];
    row[0] = 1.0;
    for i in 0..=n_a {
        let mut next = vec![0.0; n_b + 1];
        for j in 0..=n_b {
            let mass = row[j];
            if mass <= 0.0 {
                continue;
            }
            let remaining = (n_a - i) + (n_b - j);
            if i < n_a {
                let step = mass * (n_a - i) as f64 / remaining as f64;
                if inside(i + 1, j) {
                    next[j] += step;
                } else {
                    exited += step;
                }
            }
            if j < n_b {
                let step = mass * (n_b - j) as f64 / remaining as f64;
                if inside(i, j + 1) {
                    row[j + 1] += step;
                } else {
                    exited += step;
                }
            }
        }
        row = next;
    }
    exited
}

/// Survival function of the Kolmogorov distribution, `P(K > lambda)`.
fn kolmogorov_sf(lambda: f64) -> f64 {
    const TERMS: i32 = 100;
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // CDF via the Jacobi theta form, which converges fast for small lambda.
        let pi2 = std::f64::consts::PI * std::f64::consts::PI;
        let cdf = (2.0 * std::f64::consts::PI).sqrt() / lambda
            * (1..=TERMS)
                .map(|k| {
                    let odd = f64::from(2 * k - 1);
                    (-odd * odd * pi2 / (8.0 * lambda * lambda)).exp()
                })
                .sum::<f64>();
        return 1.0 - cdf;
    }
    2.0 * (1..=TERMS)
        .map(|k| {
            let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
            let k = f64::from(k);
            sign * (-2.0 * k * k * lambda * lambda).exp()
        })
        .sum::<f64>()
}
