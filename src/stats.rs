//! stats.rs
//! The three numeric primitives the classifier and aggregator are built on.
//! Kept free of any socket or config concern so they can be unit tested in
//! isolation, the way the teacher splits its `utils` helpers from its
//! component logic.

/// Mean of the last `window` elements of `values`, or the plain mean of all
/// of `values` if there are fewer than `window`.
///
/// Equivalent to the last element of a valid-mode moving-average
/// convolution, but computed directly rather than via [`moving_average`]
/// since only the final value is ever needed on the hot path.
pub fn last_moving_average(values: &[f64], window: usize) -> f64 {
    assert!(!values.is_empty(), "last_moving_average: empty input");
    let window = window.max(1);
    if values.len() < window {
        values.iter().sum::<f64>() / values.len() as f64
    } else {
        let tail = &values[values.len() - window..];
        tail.iter().sum::<f64>() / window as f64
    }
}

/// Full valid-mode moving average, length `values.len() - window + 1`.
/// Used for offline plotting/export only; the live classifier only needs
/// [`last_moving_average`].
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(values.len() - window + 1);
    let mut sum: f64 = values[..window].iter().sum();
    out.push(sum / window as f64);
    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out.push(sum / window as f64);
    }
    out
}

/// Partitions a sorted sequence of ids into maximal runs of consecutive
/// integers. `[1,2,3,7,8,12] -> [[1,2,3],[7,8],[12]]`.
///
/// Input must already be sorted and deduplicated; the aggregator's bucket
/// sets guarantee both.
pub fn get_consecutive(sorted_ids: &[i64]) -> Vec<Vec<i64>> {
    let mut runs: Vec<Vec<i64>> = Vec::new();
    for &id in sorted_ids {
        match runs.last_mut() {
            Some(run) if *run.last().unwrap() + 1 == id => run.push(id),
            _ => runs.push(vec![id]),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_moving_average_falls_back_to_plain_mean_below_window() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(last_moving_average(&values, 500), 2.0);
    }

    #[test]
    fn last_moving_average_uses_only_the_tail_window() {
        let mut values = vec![1000.0; 10];
        values.extend([10.0, 20.0]);
        assert_eq!(last_moving_average(&values, 2), 15.0);
    }

    #[test]
    fn moving_average_has_expected_length_and_first_value() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = moving_average(&values, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 1.5);
        assert_eq!(out[3], 4.5);
    }

    #[test]
    fn moving_average_empty_when_window_exceeds_length() {
        assert!(moving_average(&[1.0, 2.0], 5).is_empty());
    }

    #[test]
    fn get_consecutive_splits_on_gaps() {
        let ids = [1, 2, 3, 7, 8, 12];
        assert_eq!(get_consecutive(&ids), vec![vec![1, 2, 3], vec![7, 8], vec![12]]);
    }

    #[test]
    fn get_consecutive_is_idempotent_on_flattened_runs() {
        let ids = [1, 2, 3, 7, 8, 12];
        let runs = get_consecutive(&ids);
        let flattened: Vec<i64> = runs.iter().flatten().copied().collect();
        assert_eq!(get_consecutive(&flattened), runs);
    }

    #[test]
    fn get_consecutive_single_element() {
        assert_eq!(get_consecutive(&[5]), vec![vec![5]]);
    }

    #[test]
    fn get_consecutive_empty_input() {
        assert!(get_consecutive(&[]).is_empty());
    }
}
