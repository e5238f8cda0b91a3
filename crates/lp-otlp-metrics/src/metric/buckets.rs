//! Histogram bucket reconstruction.

/// Converts cumulative bucket counts into per-bucket counts, in place.
///
/// Counts that are not non-decreasing cannot be cumulative; they are assumed to
/// already be per-bucket and are left untouched.
pub fn cumulative_to_per_bucket(counts: &mut [u64]) {
    if counts.windows(2).any(|w| w[0] > w[1]) {
        return;
    }
    for i in (1..counts.len()).rev() {
        counts[i] -= counts[i - 1];
    }
}

/// Running totals of per-bucket counts, the inverse of [`cumulative_to_per_bucket`].
pub fn per_bucket_to_cumulative(counts: &[u64]) -> Vec<u64> {
    counts
        .iter()
        .scan(0u64, |total, c| {
            *total = total.saturating_add(*c);
            Some(*total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_to_per_bucket() {
        let mut counts = vec![24054, 33444, 100392, 129389, 133988, 144320];
        cumulative_to_per_bucket(&mut counts);
        assert_eq!(counts, vec![24054, 9390, 66948, 28997, 4599, 10332]);
    }

    #[test]
    fn test_decreasing_counts_left_as_is() {
        let mut counts = vec![5, 10, 3, 20];
        cumulative_to_per_bucket(&mut counts);
        assert_eq!(counts, vec![5, 10, 3, 20]);
    }

    #[test]
    fn test_flat_and_empty() {
        let mut counts = vec![4, 4, 4];
        cumulative_to_per_bucket(&mut counts);
        assert_eq!(counts, vec![4, 0, 0]);

        let mut empty: Vec<u64> = vec![];
        cumulative_to_per_bucket(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_per_bucket_to_cumulative() {
        assert_eq!(
            per_bucket_to_cumulative(&[24054, 9390, 66948, 28997, 4599, 10332]),
            vec![24054, 33444, 100392, 129389, 133988, 144320]
        );
    }
}
