//! Mid-ranking for the rank correlation tests.

use std::cmp::Ordering;

/// Total order on sample values in which `-0.0` and `0.0` are equal.
pub(crate) fn cmp_values(a: f64, b: f64) -> Ordering {
    let zero = |v: f64| if v == 0.0 { 0.0 } else { v };
    zero(a).total_cmp(&zero(b))
}

/// Rank `data` from 1, giving tied values the mean of the ranks they span.
///
/// Empty input produces empty output.
pub fn midranks(data: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| cmp_values(data[a], data[b]));

    let mut ranks = vec![0.0; data.len()];
    let mut start = 0;
    while start < order.len() {
        let value = data[order[start]];
        let end = start
            + order[start..]
                .iter()
                .take_while(|&&i| cmp_values(data[i], value).is_eq())
                .count();
        // Positions start..end hold 1-based ranks start+1..=end.
        let mid = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = mid;
        }
        start = end;
    }
    ranks
}

/// Sizes of the groups of equal values in `data`, in ascending value order.
/// Untied values form groups of size 1.
pub fn tie_groups(data: &[f64]) -> Vec<usize> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|&a, &b| cmp_values(a, b));
    sorted
        .chunk_by(|&a, &b| cmp_values(a, b).is_eq())
        .map(<[f64]>::len)
        .collect()
}

/// Whether any value occurs more than once.
pub fn has_ties(data: &[f64]) -> bool {
    tie_groups(data).iter().any(|&t| t > 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ties() {
        assert_eq!(midranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
        assert!(!has_ties(&[3.0, 1.0, 2.0]));
    }

    #[test]
    fn ties_share_the_mean_rank() {
        assert_eq!(midranks(&[3.0, 1.0, 2.0, 2.0]), vec![4.0, 1.0, 2.5, 2.5]);
        assert!(has_ties(&[3.0, 1.0, 2.0, 2.0]));
    }

    #[test]
    fn tie_group_sizes() {
        assert_eq!(tie_groups(&[2.0, 1.0, 2.0, 3.0, 2.0, 1.0]), vec![2, 3, 1]);
    }

    #[test]
    fn all_equal() {
        assert_eq!(midranks(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn signed_zeros_are_tied() {
        let data = [0.0, -0.0, 1.0];
        assert!(has_ties(&data));
        assert_eq!(tie_groups(&data), vec![2, 1]);
        assert_eq!(midranks(&data), vec![1.5, 1.5, 3.0]);
    }

    #[test]
    fn empty() {
        assert!(midranks(&[]).is_empty());
        assert!(!has_ties(&[]));
    }
}
