//! Exact multinomial probabilities.
//!
//! [`multinomial_pmf`] evaluates the probability of one count vector under
//! `Multinomial(n, P)`. [`multinomial_cdf`] sums that mass over every
//! composition of `n` that is at least as extreme as the observed vector,
//! which is the p-value of the exact multinomial goodness-of-fit test.

use log::debug;
use statrs::function::{factorial, gamma};
use surveykit_core::{LogProb, Result, SurveyError};

use crate::combinatorics::compositions_bounded;

/// Allowed deviation of `sum(P)` from 1.
pub const PROB_SUM_TOLERANCE: f64 = 1e-9;

/// Relative slack when comparing a composition's mass with the observed
/// mass in [`multinomial_cdf`]. A composition counts as "at least as
/// extreme" when `pmf <= reference * (1 + EXTREME_REL_TOLERANCE)`, so ties
/// computed along different arithmetic paths are always included.
pub const EXTREME_REL_TOLERANCE: f64 = 1e-7;

/// Default cap on the number of compositions [`multinomial_cdf`] will walk.
pub const DEFAULT_MAX_COMPOSITIONS: u64 = 5_000_000;

/// Largest `n` for which `n!` is finite in `f64`.
pub const MAX_DIRECT_FACTORIAL_N: u64 = 170;

/// How the multinomial mass is evaluated.
///
/// All strategies agree to well within `1e-9` relative error on inputs they
/// accept; the non-default ones exist for cross-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PmfMethod {
    /// `ln Γ` for every factorial, summed in log space and exponentiated
    /// once at the end.
    #[default]
    LogGamma,
    /// Direct `f64` factorials. Limited to `n <= 170`.
    Factorial,
    /// Direct `Γ(x + 1)`. Limited to `n <= 170`.
    Gamma,
    /// Chain of conditional binomials:
    /// `P(F; P) = Binom(f1; n, p1) * P(F[1..]; P[1..] / (1 - p1))`.
    Recursive,
}

/// Options for [`multinomial_cdf`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExactOptions {
    /// Strategy used for every mass evaluation.
    pub method: PmfMethod,
    /// Refuse to enumerate more than this many compositions.
    pub max_compositions: u64,
}

impl Default for ExactOptions {
    fn default() -> Self {
        Self {
            method: PmfMethod::LogGamma,
            max_compositions: DEFAULT_MAX_COMPOSITIONS,
        }
    }
}

/// Probability of observing exactly `counts` under `Multinomial(n, probs)`,
/// where `n = sum(counts)`:
///
/// ```text
/// n! / (f1! ... fk!) * p1^f1 ... pk^fk
/// ```
///
/// # Errors
///
/// Returns an invalid-argument error if the vectors are empty or differ in
/// length, if any probability is outside `[0, 1]`, or if `probs` does not
/// sum to 1 within [`PROB_SUM_TOLERANCE`]. The [`PmfMethod::Factorial`] and
/// [`PmfMethod::Gamma`] strategies return
/// [`SurveyError::ResourceLimitExceeded`] for `n > 170`.
///
/// # Example
///
/// ```
/// use surveykit_stats::multinomial::{multinomial_pmf, PmfMethod};
///
/// let p = multinomial_pmf(&[8, 0], &[0.5, 0.5], PmfMethod::LogGamma).unwrap();
/// assert!((p - 0.00390625).abs() < 1e-12);
/// ```
pub fn multinomial_pmf(counts: &[u64], probs: &[f64], method: PmfMethod) -> Result<f64> {
    let n = validate_problem(counts, probs)?;
    check_method(method, n)?;
    Ok(pmf_with(counts, probs, n, method))
}

/// Exact multinomial p-value: the total mass of every composition of
/// `sum(counts)` into `counts.len()` parts whose probability does not
/// exceed that of `counts`.
///
/// This walks all `C(n + k - 1, k - 1)` compositions, so cost grows
/// exponentially in the number of categories. The walk is refused up front
/// when it would exceed `options.max_compositions`.
///
/// # Errors
///
/// Everything [`multinomial_pmf`] rejects, plus
/// [`SurveyError::ResourceLimitExceeded`] for oversized composition sets.
///
/// # Example
///
/// ```
/// use surveykit_stats::multinomial::{multinomial_cdf, ExactOptions};
///
/// let p = multinomial_cdf(&[8, 0], &[0.5, 0.5], &ExactOptions::default()).unwrap();
/// assert!((p - 0.0078125).abs() < 1e-12);
/// ```
pub fn multinomial_cdf(counts: &[u64], probs: &[f64], options: &ExactOptions) -> Result<f64> {
    let n = validate_problem(counts, probs)?;
    check_method(options.method, n)?;
    let space = compositions_bounded(n, counts.len(), options.max_compositions)?;

    let reference = pmf_with(counts, probs, n, options.method);
    let threshold = reference * (1.0 + EXTREME_REL_TOLERANCE);

    let total: f64 = space
        .map(|c| pmf_with(&c, probs, n, options.method))
        .filter(|&p| p <= threshold)
        .sum();

    debug!("multinomial_cdf: reference pmf {reference:.6e}, tail mass {total:.6e}");
    Ok(total.clamp(0.0, 1.0))
}

// ── Validation ─────────────────────────────────────────────────────────────

/// Check shapes and the probability vector; returns `n = sum(counts)`.
pub(crate) fn validate_problem(counts: &[u64], probs: &[f64]) -> Result<u64> {
    if counts.is_empty() {
        return Err(SurveyError::invalid("multinomial: counts must be non-empty"));
    }
    if counts.len() != probs.len() {
        return Err(SurveyError::invalid(format!(
            "multinomial: counts and probs must have the same length ({} vs {})",
            counts.len(),
            probs.len(),
        )));
    }
    if let Some(&p) = probs
        .iter()
        .find(|p| !p.is_finite() || !(0.0..=1.0).contains(*p))
    {
        return Err(SurveyError::invalid(format!(
            "multinomial: probabilities must lie in [0, 1], got {p}"
        )));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROB_SUM_TOLERANCE {
        return Err(SurveyError::invalid(format!(
            "multinomial: probabilities must sum to 1, got {sum}"
        )));
    }
    counts
        .iter()
        .try_fold(0u64, |acc, &c| acc.checked_add(c))
        .ok_or_else(|| SurveyError::invalid("multinomial: total count overflows u64"))
}

fn check_method(method: PmfMethod, n: u64) -> Result<()> {
    match method {
        PmfMethod::Factorial | PmfMethod::Gamma if n > MAX_DIRECT_FACTORIAL_N => {
            Err(SurveyError::ResourceLimitExceeded {
                what: "direct factorial sample size",
                requested: u128::from(n),
                limit: u128::from(MAX_DIRECT_FACTORIAL_N),
            })
        }
        _ => Ok(()),
    }
}

// ── Mass evaluation ────────────────────────────────────────────────────────

/// Evaluate the mass of already-validated inputs.
fn pmf_with(counts: &[u64], probs: &[f64], n: u64, method: PmfMethod) -> f64 {
    match method {
        PmfMethod::LogGamma => {
            let ln_coef = gamma::ln_gamma(n as f64 + 1.0)
                - counts
                    .iter()
                    .map(|&f| gamma::ln_gamma(f as f64 + 1.0))
                    .sum::<f64>();
            let ln_mass = counts
                .iter()
                .zip(probs)
                .fold(LogProb::certain(), |acc, (&f, &p)| {
                    acc.ln_mul(LogProb::from_ln(p.ln()).ln_pow(f))
                });
            (ln_coef + ln_mass.0).exp()
        }
        PmfMethod::Factorial => {
            let coef = counts
                .iter()
                .fold(factorial::factorial(n), |acc, &f| acc / factorial::factorial(f));
            coef * power_product(counts, probs)
        }
        PmfMethod::Gamma => {
            let coef = counts.iter().fold(gamma::gamma(n as f64 + 1.0), |acc, &f| {
                acc / gamma::gamma(f as f64 + 1.0)
            });
            coef * power_product(counts, probs)
        }
        PmfMethod::Recursive => recursive_pmf(counts, probs),
    }
}

/// `prod p_i^f_i` with `0^0 = 1`.
fn power_product(counts: &[u64], probs: &[f64]) -> f64 {
    counts
        .iter()
        .zip(probs)
        .map(|(&f, &p)| if f == 0 { 1.0 } else { p.powf(f as f64) })
        .product()
}

fn recursive_pmf(counts: &[u64], probs: &[f64]) -> f64 {
    let (Some((&f, rest_counts)), Some((&p, rest_probs))) =
        (counts.split_first(), probs.split_first())
    else {
        return 1.0;
    };
    // The last category takes whatever is left with conditional probability 1.
    if rest_counts.is_empty() {
        return 1.0;
    }

    let n: u64 = counts.iter().sum();
    let head = binomial_pmf(f, n, p);
    if head == 0.0 || f == n {
        return head;
    }

    let remaining = 1.0 - p;
    let conditional: Vec<f64> = rest_probs.iter().map(|&q| q / remaining).collect();
    head * recursive_pmf(rest_counts, &conditional)
}

// Summed in log space: C(n, k) alone overflows f64 once n passes ~1030.
fn binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    let ln_mass = LogProb::from_ln(p.ln())
        .ln_pow(k)
        .ln_mul(LogProb::from_ln((1.0 - p).ln()).ln_pow(n - k));
    if ln_mass.is_impossible() {
        return 0.0;
    }
    (factorial::ln_binomial(n, k) + ln_mass.0).exp()
}

// ── Tests ──────────────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::combinatorics::compositions;
    use proptest::prelude::*;

    fn arb_problem() -> impl Strategy<Value = (Vec<u64>, Vec<f64>)> {
        (2usize..5).prop_flat_map(|k| {
            (
                proptest::collection::vec(0u64..8, k),
                proptest::collection::vec(0.05f64..1.0, k),
            )
                .prop_map(|(counts, weights)| {
                    let total: f64 = weights.iter().sum();
                    let probs = weights.iter().map(|w| w / total).collect();
                    (counts, probs)
                })
        })
    }

    proptest! {
        #[test]
        fn methods_agree((counts, probs) in arb_problem()) {
            let reference = multinomial_pmf(&counts, &probs, PmfMethod::LogGamma).unwrap();
            for method in [PmfMethod::Factorial, PmfMethod::Gamma, PmfMethod::Recursive] {
                let p = multinomial_pmf(&counts, &probs, method).unwrap();
                prop_assert!(
                    (p - reference).abs() <= 1e-9 * reference,
                    "{:?}: {} vs {}", method, p, reference
                );
            }
        }

        #[test]
        fn mass_is_normalised((counts, probs) in arb_problem()) {
            let n: u64 = counts.iter().sum();
            let total: f64 = compositions(n, counts.len())
                .unwrap()
                .map(|c| multinomial_pmf(&c, &probs, PmfMethod::LogGamma).unwrap())
                .sum();
            prop_assert!((total - 1.0).abs() < 1e-6);
        }

        #[test]
        fn cdf_is_a_probability((counts, probs) in arb_problem()) {
            let opts = ExactOptions::default();
            let pmf = multinomial_pmf(&counts, &probs, opts.method).unwrap();
            let cdf = multinomial_cdf(&counts, &probs, &opts).unwrap();
            prop_assert!((0.0..=1.0).contains(&cdf));
            prop_assert!(cdf + 1e-12 >= pmf);
        }
    }
}
