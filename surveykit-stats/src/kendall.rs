//! Exact null distribution of Kendall's tau.
//!
//! Under the null hypothesis of no association every permutation of the
//! ranks is equally likely, so the distribution of the concordant-pair count
//! is the permutation count per concordant total divided by `n!`. The
//! [`ConcordanceTable`] builds those counts without enumerating
//! permutations: inserting the `m`-th element into a permutation of `m - 1`
//! elements adds anywhere from `0` to `m - 1` concordant pairs, one
//! insertion position each.

use log::{debug, trace};
use surveykit_core::{Result, SurveyError};

use crate::combinatorics::factorial_exact;

/// Largest sample size whose permutation counts fit in `u128` (`35!`
/// does not).
pub const MAX_EXACT_KENDALL_N: usize = 34;

/// Number of permutations of `n` elements for each concordant-pair count
/// `0..=n(n-1)/2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcordanceTable {
    n: usize,
    counts: Vec<u128>,
}

impl ConcordanceTable {
    /// Build the table for sample size `n`, growing it one element at a
    /// time from `n = 1`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for `n == 0` and
    /// [`SurveyError::ResourceLimitExceeded`] for `n > 34`.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(SurveyError::invalid(
                "ConcordanceTable: sample size must be >= 1",
            ));
        }
        if n > MAX_EXACT_KENDALL_N {
            return Err(SurveyError::ResourceLimitExceeded {
                what: "exact Kendall sample size",
                requested: n as u128,
                limit: MAX_EXACT_KENDALL_N as u128,
            });
        }
        debug!(
            "building concordance table for n = {n} ({} cells)",
            max_concordant(n) + 1
        );

        let mut row = vec![1u128];
        for m in 2..=n {
            let width = max_concordant(m) + 1;
            let mut next = vec![0u128; width];
            // Running sum of row[c - m + 1 ..= c].
            let mut window = 0u128;
            for (c, cell) in next.iter_mut().enumerate() {
                if let Some(&v) = row.get(c) {
                    window += v;
                }
                if c >= m {
                    window -= row[c - m];
                }
                *cell = window;
            }
            trace!("concordance row {m}: {width} cells");
            row = next;
        }

        Ok(Self { n, counts: row })
    }

    /// Sample size.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Largest achievable concordant-pair count, `n(n-1)/2`.
    pub fn max_concordant(&self) -> usize {
        max_concordant(self.n)
    }

    /// Permutation counts indexed by concordant-pair count.
    pub fn counts(&self) -> &[u128] {
        &self.counts
    }

    /// Sum of all counts. Always `n!`.
    pub fn total(&self) -> u128 {
        self.counts.iter().sum()
    }

    /// Permutations with at least `c` concordant pairs.
    pub fn upper_tail(&self, c: usize) -> u128 {
        self.counts.iter().skip(c).sum()
    }

    /// Permutations with at most `c` concordant pairs.
    pub fn lower_tail(&self, c: usize) -> u128 {
        self.counts.iter().take(c.saturating_add(1)).sum()
    }
}

/// `n(n-1)/2`.
pub fn max_concordant(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Two-tailed exact p-value for observing `concordant` concordant pairs in
/// a sample of `n` untied pairs.
///
/// Takes the smaller of the upper and lower tails, divides by `n!`, doubles
/// and caps at 1. The distribution is symmetric, so `c` and
/// `n(n-1)/2 - c` give the same answer.
///
/// # Errors
///
/// Returns an invalid-argument error if `n == 0` or `concordant` exceeds
/// `n(n-1)/2`, and [`SurveyError::ResourceLimitExceeded`] for `n > 34`.
///
/// # Example
///
/// ```
/// use surveykit_stats::kendall::kendall_exact_p;
///
/// // A perfectly concordant ranking of 4 items: 2 / 4!
/// let p = kendall_exact_p(4, 6).unwrap();
/// assert!((p - 2.0 / 24.0).abs() < 1e-12);
/// ```
pub fn kendall_exact_p(n: usize, concordant: usize) -> Result<f64> {
    if n == 0 {
        return Err(SurveyError::invalid("kendall_exact_p: n must be >= 1"));
    }
    let max_c = max_concordant(n);
    if concordant > max_c {
        return Err(SurveyError::invalid(format!(
            "kendall_exact_p: concordant count {concordant} exceeds n(n-1)/2 = {max_c}"
        )));
    }

    let table = ConcordanceTable::new(n)?;
    let tail = table
        .upper_tail(concordant)
        .min(table.lower_tail(concordant));
    let total = factorial_exact(n as u64).unwrap_or_else(|| table.total());

    Ok((2.0 * tail as f64 / total as f64).min(1.0))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinatorics::permutations;

    fn concordant_pairs(perm: &[usize]) -> usize {
        let mut c = 0;
        for i in 0..perm.len() {
            for j in i + 1..perm.len() {
                if perm[i] < perm[j] {
                    c += 1;
                }
            }
        }
        c
    }

    #[test]
    fn small_tables() {
        assert_eq!(ConcordanceTable::new(1).unwrap().counts(), &[1]);
        assert_eq!(ConcordanceTable::new(2).unwrap().counts(), &[1, 1]);
        assert_eq!(ConcordanceTable::new(3).unwrap().counts(), &[1, 2, 2, 1]);
        assert_eq!(
            ConcordanceTable::new(4).unwrap().counts(),
            &[1, 3, 5, 6, 5, 3, 1]
        );
    }

    #[test]
    fn rows_sum_to_factorial() {
        for n in 1..=MAX_EXACT_KENDALL_N {
            let table = ConcordanceTable::new(n).unwrap();
            assert_eq!(table.total(), factorial_exact(n as u64).unwrap(), "n = {n}");
            assert_eq!(table.counts().len(), table.max_concordant() + 1);
        }
    }

    #[test]
    fn matches_brute_force_enumeration() {
        for n in 1..=6 {
            let mut expected = vec![0u128; max_concordant(n) + 1];
            for perm in permutations(n).unwrap() {
                expected[concordant_pairs(&perm)] += 1;
            }
            assert_eq!(ConcordanceTable::new(n).unwrap().counts(), &expected[..]);
        }
    }

    #[test]
    fn perfect_concordance_n4() {
        let p = kendall_exact_p(4, 6).unwrap();
        assert!((p - 2.0 / 24.0).abs() < 1e-15);
        // Nothing is smaller for n = 4.
        for c in 0..=6 {
            assert!(kendall_exact_p(4, c).unwrap() >= p);
        }
    }

    #[test]
    fn symmetric_in_concordant_count() {
        for n in 2..=12 {
            let max_c = max_concordant(n);
            for c in 0..=max_c {
                let lo = kendall_exact_p(n, c).unwrap();
                let hi = kendall_exact_p(n, max_c - c).unwrap();
                assert!((lo - hi).abs() < 1e-15, "n = {n}, c = {c}");
            }
        }
    }

    #[test]
    fn centre_is_capped_at_one() {
        assert_eq!(kendall_exact_p(1, 0).unwrap(), 1.0);
        assert_eq!(kendall_exact_p(4, 3).unwrap(), 1.0);
    }

    #[test]
    fn known_value_n10() {
        // P(C >= 40) for n = 10: 1 + 9 + 44 + 155 + 440 + 1068 counts of 10!
        let table = ConcordanceTable::new(10).unwrap();
        assert_eq!(table.upper_tail(40), 1 + 9 + 44 + 155 + 440 + 1068);
        let expected = 2.0 * 1717.0 / 3_628_800.0;
        assert!((kendall_exact_p(10, 40).unwrap() - expected).abs() < 1e-15);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            kendall_exact_p(4, 7),
            Err(SurveyError::InvalidArgument(_))
        ));
        assert!(matches!(
            kendall_exact_p(0, 0),
            Err(SurveyError::InvalidArgument(_))
        ));
        assert!(matches!(
            kendall_exact_p(35, 0),
            Err(SurveyError::ResourceLimitExceeded { requested: 35, limit: 34, .. })
        ));
    }
}
