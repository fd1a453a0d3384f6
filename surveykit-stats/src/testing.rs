//! Hypothesis tests built on the exact distributions.
//!
//! Goodness of fit: [`multinomial_exact_test`], [`binomial_test`],
//! [`chi_squared_gof`] and [`g_test_gof`]. Rank association:
//! [`kendall_tau_test`] and [`spearman_exact_test`], which use exact null
//! distributions for small untied samples and fall back to the usual
//! asymptotic approximations otherwise.

use log::debug;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};
use surveykit_core::{Result, Scored, Summarizable, SurveyError};

use crate::combinatorics::{factorial_exact, permutations};
use crate::kendall::{kendall_exact_p, max_concordant, MAX_EXACT_KENDALL_N};
use crate::multinomial::{multinomial_cdf, multinomial_pmf, validate_problem, ExactOptions};
use crate::rank::{cmp_values, has_ties, midranks, tie_groups};

/// Largest sample for which [`spearman_exact_test`] enumerates all `n!`
/// rank permutations.
pub const MAX_EXACT_SPEARMAN_N: usize = 9;

/// Result of a hypothesis test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestResult {
    /// The test statistic (probability of the observed table, chi-square, tau, rho, ...).
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Degrees of freedom, if the reference distribution has any.
    pub degrees_of_freedom: Option<f64>,
    /// Name of the test method.
    pub method: String,
}

impl Scored for TestResult {
    fn score(&self) -> f64 {
        self.p_value
    }
}

impl Summarizable for TestResult {
    fn summary(&self) -> String {
        match self.degrees_of_freedom {
            Some(df) => format!(
                "{}: statistic={:.4}, df={:.1}, p={:.6}",
                self.method, self.statistic, df, self.p_value,
            ),
            None => format!(
                "{}: statistic={:.4}, p={:.6}",
                self.method, self.statistic, self.p_value,
            ),
        }
    }
}

fn distribution_error(e: impl std::fmt::Display) -> SurveyError {
    SurveyError::Distribution(e.to_string())
}

// ── Exact goodness of fit ──────────────────────────────────────────────────

/// Exact multinomial goodness-of-fit test.
///
/// The statistic is the probability of `observed` itself; the p-value is
/// the total probability of every outcome no more likely than it.
///
/// # Errors
///
/// See [`multinomial_cdf`].
pub fn multinomial_exact_test(
    observed: &[u64],
    probs: &[f64],
    options: &ExactOptions,
) -> Result<TestResult> {
    let statistic = multinomial_pmf(observed, probs, options.method)?;
    let p_value = multinomial_cdf(observed, probs, options)?;
    Ok(TestResult {
        statistic,
        p_value,
        degrees_of_freedom: None,
        method: "Exact multinomial test".into(),
    })
}

/// Exact two-sided binomial test of `successes` out of `trials` against
/// success probability `p`.
///
/// This is the two-category case of [`multinomial_cdf`]. The statistic is
/// the observed proportion.
///
/// # Errors
///
/// Returns an error if `trials == 0`, `successes > trials`, or `p` is
/// outside `[0, 1]`.
///
/// # Example
///
/// ```
/// use surveykit_stats::testing::binomial_test;
///
/// let result = binomial_test(8, 8, 0.5).unwrap();
/// assert!((result.p_value - 0.0078125).abs() < 1e-12);
/// ```
pub fn binomial_test(successes: u64, trials: u64, p: f64) -> Result<TestResult> {
    if trials == 0 {
        return Err(SurveyError::invalid("binomial_test: trials must be >= 1"));
    }
    if successes > trials {
        return Err(SurveyError::invalid(format!(
            "binomial_test: successes ({successes}) exceed trials ({trials})"
        )));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(SurveyError::invalid(format!(
            "binomial_test: p must be in [0, 1], got {p}"
        )));
    }

    let p_value = multinomial_cdf(
        &[successes, trials - successes],
        &[p, 1.0 - p],
        &ExactOptions::default(),
    )?;
    Ok(TestResult {
        statistic: successes as f64 / trials as f64,
        p_value,
        degrees_of_freedom: None,
        method: "Exact binomial test".into(),
    })
}

// ── Asymptotic goodness of fit ─────────────────────────────────────────────

/// Expected counts for a goodness-of-fit test, after validation.
fn expected_counts(observed: &[u64], probs: &[f64], test: &str) -> Result<Vec<f64>> {
    let n = validate_problem(observed, probs)?;
    if observed.len() < 2 {
        return Err(SurveyError::invalid(format!(
            "{test}: need at least 2 categories"
        )));
    }
    if n == 0 {
        return Err(SurveyError::invalid(format!("{test}: all counts are zero")));
    }
    if probs.iter().any(|&p| p == 0.0) {
        return Err(SurveyError::invalid(format!(
            "{test}: every category needs a positive expected count"
        )));
    }
    Ok(probs.iter().map(|&p| p * n as f64).collect())
}

fn chi_squared_upper_tail(statistic: f64, df: f64) -> Result<f64> {
    let dist = ChiSquared::new(df).map_err(distribution_error)?;
    Ok(dist.sf(statistic))
}

/// Pearson chi-squared goodness-of-fit test against category
/// probabilities `probs`, with `k - 1` degrees of freedom.
///
/// # Errors
///
/// Returns an error on malformed inputs, fewer than two categories, an
/// all-zero sample, or a zero expected count.
pub fn chi_squared_gof(observed: &[u64], probs: &[f64]) -> Result<TestResult> {
    let expected = expected_counts(observed, probs, "chi_squared_gof")?;

    let statistic: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(&o, &e)| (o as f64 - e).powi(2) / e)
        .sum();
    let df = (observed.len() - 1) as f64;

    Ok(TestResult {
        statistic,
        p_value: chi_squared_upper_tail(statistic, df)?,
        degrees_of_freedom: Some(df),
        method: "Chi-squared goodness-of-fit test".into(),
    })
}

/// Likelihood-ratio (G) goodness-of-fit test: `G = 2 * sum(o * ln(o / e))`,
/// referred to chi-squared with `k - 1` degrees of freedom.
///
/// # Errors
///
/// Same conditions as [`chi_squared_gof`].
pub fn g_test_gof(observed: &[u64], probs: &[f64]) -> Result<TestResult> {
    let expected = expected_counts(observed, probs, "g_test_gof")?;

    let statistic = 2.0
        * observed
            .iter()
            .zip(&expected)
            .filter(|(o, _)| **o > 0)
            .map(|(&o, &e)| o as f64 * (o as f64 / e).ln())
            .sum::<f64>();
    let df = (observed.len() - 1) as f64;

    Ok(TestResult {
        statistic: statistic.max(0.0),
        p_value: chi_squared_upper_tail(statistic.max(0.0), df)?,
        degrees_of_freedom: Some(df),
        method: "G-test goodness-of-fit".into(),
    })
}

// ── Rank association ───────────────────────────────────────────────────────

fn validate_paired(x: &[f64], y: &[f64], test: &str) -> Result<()> {
    if x.len() != y.len() {
        return Err(SurveyError::invalid(format!(
            "{test}: x and y must have the same length ({} vs {})",
            x.len(),
            y.len(),
        )));
    }
    if x.len() < 3 {
        return Err(SurveyError::invalid(format!(
            "{test}: need at least 3 observations"
        )));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(SurveyError::invalid(format!(
            "{test}: observations must be finite"
        )));
    }
    Ok(())
}

/// Kendall's rank correlation test.
///
/// Without ties and with `n <= 34` the statistic is tau-a and the p-value is
/// exact, from the concordant-pair distribution in [`crate::kendall`].
/// Otherwise the statistic is tau-b and the p-value uses the normal
/// approximation to `S = C - D` with the tie-corrected variance.
///
/// # Errors
///
/// Returns an error if the lengths differ, `n < 3`, a value is not finite,
/// or either series is constant.
pub fn kendall_tau_test(x: &[f64], y: &[f64]) -> Result<TestResult> {
    validate_paired(x, y, "kendall_tau_test")?;
    let n = x.len();

    let (mut concordant, mut discordant) = (0usize, 0usize);
    for i in 0..n {
        for j in i + 1..n {
            let sx = cmp_values(x[j], x[i]) as i8;
            let sy = cmp_values(y[j], y[i]) as i8;
            match sx * sy {
                1 => concordant += 1,
                -1 => discordant += 1,
                _ => {}
            }
        }
    }
    let s = concordant as f64 - discordant as f64;
    let n0 = max_concordant(n) as f64;

    if !has_ties(x) && !has_ties(y) && n <= MAX_EXACT_KENDALL_N {
        debug!("kendall_tau_test: exact null distribution, n = {n}");
        return Ok(TestResult {
            statistic: s / n0,
            p_value: kendall_exact_p(n, concordant)?,
            degrees_of_freedom: None,
            method: "Kendall's tau (exact)".into(),
        });
    }

    let tx = tie_groups(x);
    let ty = tie_groups(y);
    let pairs = |groups: &[usize]| -> f64 {
        groups.iter().map(|&t| (t * t.saturating_sub(1)) as f64 / 2.0).sum()
    };
    let denom = ((n0 - pairs(&tx)) * (n0 - pairs(&ty))).sqrt();
    if denom == 0.0 {
        return Err(SurveyError::invalid(
            "kendall_tau_test: x or y is constant",
        ));
    }
    let tau_b = s / denom;

    let variance = kendall_s_variance(n, &tx, &ty);
    let z = s / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).map_err(distribution_error)?;
    let p_value = (2.0 * normal.sf(z.abs())).min(1.0);
    debug!("kendall_tau_test: normal approximation, n = {n}, z = {z:.4}");

    Ok(TestResult {
        statistic: tau_b,
        p_value,
        degrees_of_freedom: None,
        method: "Kendall's tau-b (normal approximation)".into(),
    })
}

/// Null variance of `S = C - D` with ties in either ranking.
fn kendall_s_variance(n: usize, tx: &[usize], ty: &[usize]) -> f64 {
    let n = n as f64;
    let sum = |groups: &[usize], f: fn(f64) -> f64| -> f64 {
        groups.iter().map(|&t| f(t as f64)).sum()
    };
    let v0 = n * (n - 1.0) * (2.0 * n + 5.0);
    let vt = sum(tx, |t| t * (t - 1.0) * (2.0 * t + 5.0));
    let vu = sum(ty, |u| u * (u - 1.0) * (2.0 * u + 5.0));
    let t2 = sum(tx, |t| t * (t - 1.0));
    let u2 = sum(ty, |u| u * (u - 1.0));
    let t3 = sum(tx, |t| t * (t - 1.0) * (t - 2.0));
    let u3 = sum(ty, |u| u * (u - 1.0) * (u - 2.0));

    (v0 - vt - vu) / 18.0
        + t3 * u3 / (9.0 * n * (n - 1.0) * (n - 2.0))
        + t2 * u2 / (2.0 * n * (n - 1.0))
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    cov / (var_x * var_y).sqrt()
}

/// Spearman's rank correlation test.
///
/// For untied samples of at most [`MAX_EXACT_SPEARMAN_N`] pairs the p-value
/// is the share of all `n!` rank permutations whose `sum(d^2)` lies at least
/// as far from its null mean `n(n^2 - 1)/6` as the observed one. Otherwise
/// it uses the t approximation with `n - 2` degrees of freedom.
///
/// # Errors
///
/// Returns an error if the lengths differ, `n < 3`, a value is not finite,
/// or either series is constant.
pub fn spearman_exact_test(x: &[f64], y: &[f64]) -> Result<TestResult> {
    validate_paired(x, y, "spearman_exact_test")?;
    let n = x.len();
    let rx = midranks(x);
    let ry = midranks(y);

    let rho = pearson(&rx, &ry);
    if !rho.is_finite() {
        return Err(SurveyError::invalid(
            "spearman_exact_test: x or y is constant",
        ));
    }

    if !has_ties(x) && !has_ties(y) && n <= MAX_EXACT_SPEARMAN_N {
        // Untied ranks are integers, so sum(d^2) is exact in i64.
        let pairs: Vec<(i64, i64)> = rx
            .iter()
            .zip(&ry)
            .map(|(&a, &b)| (a as i64, b as i64))
            .collect();
        let mean_d2 = (n * (n * n - 1)) as f64 / 6.0;
        let observed: i64 = pairs.iter().map(|&(a, b)| (a - b).pow(2)).sum();
        let distance = (observed as f64 - mean_d2).abs();

        let extreme = permutations(n)?
            .filter(|perm| {
                let d2: i64 = perm
                    .iter()
                    .enumerate()
                    .map(|(i, &r)| (i as i64 + 1 - r as i64).pow(2))
                    .sum();
                (d2 as f64 - mean_d2).abs() >= distance
            })
            .count();
        let total = factorial_exact(n as u64).unwrap_or(1) as f64;
        debug!("spearman_exact_test: {extreme} of {total} permutations as extreme");

        return Ok(TestResult {
            statistic: rho,
            p_value: (extreme as f64 / total).min(1.0),
            degrees_of_freedom: None,
            method: "Spearman's rho (exact permutation)".into(),
        });
    }

    let df = (n - 2) as f64;
    let p_value = if rho.abs() >= 1.0 {
        0.0
    } else {
        let t = rho * (df / (1.0 - rho * rho)).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error)?;
        (2.0 * dist.sf(t.abs())).min(1.0)
    };
    debug!("spearman_exact_test: t approximation, n = {n}");

    Ok(TestResult {
        statistic: rho,
        p_value,
        degrees_of_freedom: Some(df),
        method: "Spearman's rho (t approximation)".into(),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn exact_kendall_matches_permutation_count(perm in Just((1..=6).collect::<Vec<usize>>()).prop_shuffle()) {
            let x: Vec<f64> = (1..=6).map(|v| v as f64).collect();
            let y: Vec<f64> = perm.iter().map(|&v| v as f64).collect();
            let r = kendall_tau_test(&x, &y).unwrap();

            let tau = r.statistic;
            let as_extreme = permutations(6)
                .unwrap()
                .filter(|p| {
                    let py: Vec<f64> = p.iter().map(|&v| v as f64).collect();
                    let other = kendall_tau_test(&x, &py).unwrap().statistic;
                    other.abs() >= tau.abs() - 1e-12
                })
                .count();
            // Two tails of a symmetric distribution; the centre caps at 1.
            let expected = (as_extreme as f64 / 720.0).min(1.0);
            let centre = tau.abs() < 1e-12;
            prop_assert!(centre || (r.p_value - expected).abs() < 1e-12,
                "tau = {}, exact = {}, enumerated = {}", tau, r.p_value, expected);
        }
    }
}
