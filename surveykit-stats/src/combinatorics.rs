//! Combinatorics utilities.
//!
//! Exact and log-space factorials and binomial coefficients, plus the two
//! lazy enumerators the exact tests are built on: [`compositions`] (all
//! count vectors of length k summing to N) and [`permutations`] (all
//! orderings of `1..=n`).
//!
//! Both enumerators grow combinatorially. They never materialise the full
//! set, but walking it is still `C(N+k-1, k-1)` or `n!` steps, so callers
//! should bound their inputs (see [`compositions_bounded`]).

use core::iter::FusedIterator;

use log::debug;
use statrs::function::factorial;
use surveykit_core::{Result, SurveyError};

/// Exact `n!` as a `u128`. Returns `None` past `34!`.
pub fn factorial_exact(n: u64) -> Option<u128> {
    (2..=n as u128).try_fold(1u128, |acc, i| acc.checked_mul(i))
}

/// `ln(n!)`.
pub fn ln_factorial(n: u64) -> f64 {
    factorial::ln_factorial(n)
}

/// Exact binomial coefficient C(n, k). Returns `None` on `u64` overflow.
pub fn binomial(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut acc = 1u128;
    for i in 0..k as u128 {
        // acc * (n - i) is always divisible by i + 1 at this point.
        acc = acc.checked_mul(n as u128 - i)? / (i + 1);
    }
    u64::try_from(acc).ok()
}

/// Log-space binomial coefficient `ln C(n, k)`.
///
/// # Errors
///
/// Returns an error if `k > n`.
pub fn ln_binomial(n: u64, k: u64) -> Result<f64> {
    if k > n {
        return Err(SurveyError::invalid(format!(
            "ln_binomial: k ({k}) must be <= n ({n})"
        )));
    }
    Ok(factorial::ln_binomial(n, k))
}

/// Number of compositions of `n` into `k` non-negative parts,
/// `C(n + k - 1, k - 1)`. Returns `None` on overflow and `Some(0)` for `k = 0`.
pub fn count_compositions(n: u64, k: usize) -> Option<u64> {
    if k == 0 {
        return Some(0);
    }
    let k = k as u64;
    binomial(n.checked_add(k - 1)?, k - 1)
}

// ── Compositions ───────────────────────────────────────────────────────────

/// Lazily enumerate every count vector of length `k` whose entries sum to
/// `n`.
///
/// Vectors come out in reverse-lexicographic order, starting at
/// `[n, 0, ..., 0]` and ending at `[0, ..., 0, n]`. The iterator is `Clone`,
/// so a saved copy restarts the walk from wherever it was taken.
///
/// # Errors
///
/// Returns an error if `k == 0`.
///
/// # Example
///
/// ```
/// use surveykit_stats::combinatorics::compositions;
///
/// let all: Vec<Vec<u64>> = compositions(2, 2).unwrap().collect();
/// assert_eq!(all, vec![vec![2, 0], vec![1, 1], vec![0, 2]]);
/// ```
pub fn compositions(n: u64, k: usize) -> Result<Compositions> {
    if k == 0 {
        return Err(SurveyError::invalid(
            "compositions: number of categories must be >= 1",
        ));
    }
    debug!(
        "enumerating compositions of {n} into {k} parts ({} vectors)",
        count_compositions(n, k).map_or_else(|| "> u64::MAX".to_string(), |c| c.to_string())
    );
    let mut first = vec![0; k];
    first[0] = n;
    Ok(Compositions {
        current: Some(first),
    })
}

/// Like [`compositions`], but refuses up front when the set would hold more
/// than `limit` vectors.
///
/// # Errors
///
/// Returns [`SurveyError::ResourceLimitExceeded`] when the composition count
/// exceeds `limit` (or overflows `u64`), and an invalid-argument error if
/// `k == 0`.
pub fn compositions_bounded(n: u64, k: usize, limit: u64) -> Result<Compositions> {
    if k == 0 {
        return Err(SurveyError::invalid(
            "compositions: number of categories must be >= 1",
        ));
    }
    let requested = count_compositions(n, k).map_or(u128::MAX, u128::from);
    if requested > u128::from(limit) {
        return Err(SurveyError::ResourceLimitExceeded {
            what: "compositions",
            requested,
            limit: u128::from(limit),
        });
    }
    compositions(n, k)
}

/// Iterator over the compositions of `n` into `k` parts.
#[derive(Debug, Clone)]
pub struct Compositions {
    current: Option<Vec<u64>>,
}

impl Iterator for Compositions {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current.take()?;

        // Move one unit out of the rightmost non-zero part (excluding the
        // last) and put it, together with everything in the last part, into
        // the part just right of it.
        let mut next = result.clone();
        let last = next.len() - 1;
        let tail = next[last];
        next[last] = 0;
        if let Some(i) = (0..last).rev().find(|&i| next[i] > 0) {
            next[i] -= 1;
            next[i + 1] = tail + 1;
            self.current = Some(next);
        }

        Some(result)
    }
}

impl FusedIterator for Compositions {}

// ── Permutations ───────────────────────────────────────────────────────────

/// Lazily enumerate all `n!` permutations of `1..=n` in lexicographic order.
///
/// # Errors
///
/// Returns an error if `n == 0`.
///
/// # Example
///
/// ```
/// use surveykit_stats::combinatorics::permutations;
///
/// let perms: Vec<Vec<usize>> = permutations(3).unwrap().collect();
/// assert_eq!(perms.len(), 6);
/// assert_eq!(perms[0], vec![1, 2, 3]);
/// assert_eq!(perms[5], vec![3, 2, 1]);
/// ```
pub fn permutations(n: usize) -> Result<Permutations> {
    if n == 0 {
        return Err(SurveyError::invalid("permutations: n must be >= 1"));
    }
    debug!(
        "enumerating permutations of 1..={n} ({} sequences)",
        factorial_exact(n as u64).map_or_else(|| "> u128::MAX".to_string(), |c| c.to_string())
    );
    Ok(Permutations {
        current: Some((1..=n).collect()),
    })
}

/// Iterator over the permutations of `1..=n`.
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Option<Vec<usize>>,
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current.take()?;

        let mut next = result.clone();
        // Pivot: rightmost position followed by a larger element.
        if let Some(i) = (0..next.len().saturating_sub(1))
            .rev()
            .find(|&i| next[i] < next[i + 1])
        {
            let j = (i + 1..next.len())
                .rev()
                .find(|&j| next[j] > next[i])
                .unwrap_or(i + 1);
            next.swap(i, j);
            next[i + 1..].reverse();
            self.current = Some(next);
        }

        Some(result)
    }
}

impl FusedIterator for Permutations {}

// ── Tests ──────────────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn compositions_exhaustive_and_unique(n in 0u64..12, k in 1usize..5) {
            let all: Vec<Vec<u64>> = compositions(n, k).unwrap().collect();
            prop_assert_eq!(all.len() as u64, count_compositions(n, k).unwrap());
            for c in &all {
                prop_assert_eq!(c.len(), k);
                prop_assert_eq!(c.iter().sum::<u64>(), n);
            }
            let unique: HashSet<&Vec<u64>> = all.iter().collect();
            prop_assert_eq!(unique.len(), all.len());
        }

        #[test]
        fn permutation_count_is_factorial(n in 1usize..7) {
            let count = permutations(n).unwrap().count() as u128;
            prop_assert_eq!(count, factorial_exact(n as u64).unwrap());
        }
    }
}
