//! Evenly distributed value samples.

/// Row offsets sampled from a column of `len` values, at most `size` of them.
///
/// Offsets are `round(i * (len - 1) / (size - 1))`, deduplicated, so the first
/// and last rows are always part of a non-empty sample.
pub fn sample_indices(len: usize, size: usize) -> Vec<usize> {
    if len == 0 || size == 0 {
        return Vec::new();
    }
    if len <= size {
        return (0..len).collect();
    }
    if size == 1 {
        return vec![0];
    }
    let step = (len - 1) as f64 / (size - 1) as f64;
    let mut indices: Vec<usize> = (0..size)
        .map(|i| ((i as f64 * step).round() as usize).min(len - 1))
        .collect();
    indices.dedup();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_columns_are_taken_whole() {
        assert_eq!(sample_indices(3, 50), vec![0, 1, 2]);
        assert!(sample_indices(0, 50).is_empty());
    }

    #[test]
    fn long_columns_are_spread() {
        assert_eq!(sample_indices(11, 3), vec![0, 5, 10]);
        assert_eq!(sample_indices(100, 1), vec![0]);
    }

    proptest! {
        #[test]
        fn samples_are_bounded_sorted_and_keep_the_ends(len in 1usize..500, size in 1usize..80) {
            let indices = sample_indices(len, size);
            prop_assert!(!indices.is_empty());
            prop_assert!(indices.len() <= size.min(len));
            prop_assert_eq!(indices[0], 0);
            if size > 1 {
                prop_assert_eq!(*indices.last().unwrap_or(&0), len - 1);
            }
            prop_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }
}
