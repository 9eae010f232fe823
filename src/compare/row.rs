// Comparison rows

use crate::Snapshot;
use serde::Serialize;

/// One counter's old and new value with its delta
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub old: i64,
    pub new: i64,
    /// `new - old`
    pub delta: i64,
    /// Delta as a percentage of `old`, rounded to two decimals
    pub delta_pct: f64,
}

impl ComparisonRow {
    pub fn new(name: impl Into<String>, old: i64, new: i64) -> Self {
        let (delta, delta_pct) = diff_and_pct(old, new);
        Self {
            name: name.into(),
            old,
            new,
            delta,
            delta_pct,
        }
    }
}

/// Round a percentage to two decimals, ties to even (`0.125` -> `0.12`)
pub fn round_pct(pct: f64) -> f64 {
    (pct * 100.0).round_ties_even() / 100.0
}

/// Delta and delta percentage between two values
///
/// A zero `old` value has no meaningful ratio: `(0, 0.0)` when `new` is zero
/// as well, otherwise `(new, 100.0)` so an appearing counter reads as a full
/// change.
pub fn diff_and_pct(old: i64, new: i64) -> (i64, f64) {
    if old == 0 {
        if new == 0 {
            return (0, 0.0);
        }
        return (new, 100.0);
    }
    let delta = new.saturating_sub(old);
    let delta_pct = round_pct(delta as f64 / old as f64 * 100.0);
    (delta, delta_pct)
}

/// Compare two snapshots, one row per counter of `old` in name order
///
/// Counters only present in `new` are not reported: the old side defines
/// the tracked set. A counter missing from `new` compares against zero.
pub fn compare(old: &Snapshot, new: &Snapshot) -> Vec<ComparisonRow> {
    old.iter()
        .map(|(name, &old_value)| {
            let new_value = new.get(name).copied().unwrap_or(0);
            ComparisonRow::new(name.clone(), old_value, new_value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, i64)]) -> Snapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_diff_and_pct_zero_symmetry() {
        assert_eq!(diff_and_pct(0, 0), (0, 0.0));
        assert_eq!(diff_and_pct(0, 7), (7, 100.0));
        assert_eq!(diff_and_pct(0, 1_000_000), (1_000_000, 100.0));
    }

    #[test]
    fn test_diff_and_pct_rounds_to_two_decimals() {
        assert_eq!(diff_and_pct(1000, 1200), (200, 20.0));
        assert_eq!(diff_and_pct(3, 4), (1, 33.33));
        assert_eq!(diff_and_pct(3, 2), (-1, -33.33));
        assert_eq!(diff_and_pct(500, 500), (0, 0.0));
    }

    #[test]
    fn test_diff_and_pct_rounds_ties_to_even() {
        assert_eq!(diff_and_pct(800, 801), (1, 0.12));
        assert_eq!(diff_and_pct(800, 799), (-1, -0.12));
        assert_eq!(round_pct(0.375), 0.38);
    }

    #[test]
    fn test_diff_and_pct_saturates() {
        let (delta, pct) = diff_and_pct(-5, i64::MAX);
        assert_eq!(delta, i64::MAX);
        assert!(pct < 0.0);
        assert_eq!(diff_and_pct(1, i64::MIN).0, i64::MIN);
    }

    #[test]
    fn test_diff_and_pct_to_zero() {
        assert_eq!(diff_and_pct(250, 0), (-250, -100.0));
    }

    #[test]
    fn test_compare_uses_old_side_names() {
        let old = snapshot(&[("b", 10), ("a", 4)]);
        let new = snapshot(&[("a", 5), ("c", 99)]);
        let rows = compare(&old, &new);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ComparisonRow::new("a", 4, 5));
        assert_eq!(rows[0].delta_pct, 25.0);
        // missing on the new side compares against zero
        assert_eq!(rows[1].name, "b");
        assert_eq!(rows[1].new, 0);
        assert_eq!(rows[1].delta, -10);
        assert_eq!(rows[1].delta_pct, -100.0);
    }
}
