// Dual-threshold classification of comparison rows

use crate::compare::row::ComparisonRow;
use crate::counter::is_timer;
use serde::{Deserialize, Serialize};

/// Verdict for a single comparison row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    Regressed,
    Improved,
    Unchanged,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Regressed => "Regressed",
            Verdict::Improved => "Improved",
            Verdict::Unchanged => "Unchanged",
        }
    }
}

/// Thresholds a change must exceed to count as a regression or improvement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Absolute delta percentage (strictly greater than)
    pub delta_pct: f64,
    /// Absolute delta in microseconds, timers only (strictly greater than)
    pub delta_usec: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            delta_pct: 0.01,
            delta_usec: 100_000,
        }
    }
}

/// Classify one row
///
/// Counters change when `|delta_pct|` exceeds the percentage threshold.
/// Timers additionally need `|delta|` above the microsecond threshold, so a
/// 1us -> 2us "100% regression" stays unchanged.
pub fn classify(row: &ComparisonRow, thresholds: &Thresholds) -> Verdict {
    let over_pct = row.delta_pct.abs() > thresholds.delta_pct;
    let over = if is_timer(&row.name) {
        over_pct && row.delta.saturating_abs() > thresholds.delta_usec
    } else {
        over_pct
    };

    if !over {
        Verdict::Unchanged
    } else if row.delta > 0 {
        Verdict::Regressed
    } else if row.delta < 0 {
        Verdict::Improved
    } else {
        Verdict::Unchanged
    }
}

/// Rows paired with their verdicts under one set of thresholds
#[derive(Debug, Clone)]
pub struct Classified {
    rows: Vec<(ComparisonRow, Verdict)>,
    thresholds: Thresholds,
}

impl Classified {
    pub fn new(rows: Vec<ComparisonRow>, thresholds: Thresholds) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                let verdict = classify(&row, &thresholds);
                (row, verdict)
            })
            .collect();
        Self { rows, thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn rows(&self) -> &[(ComparisonRow, Verdict)] {
        &self.rows
    }

    /// Rows with the given verdict, in their current order
    pub fn with_verdict(&self, verdict: Verdict) -> Vec<&ComparisonRow> {
        self.rows
            .iter()
            .filter(|(_, v)| *v == verdict)
            .map(|(row, _)| row)
            .collect()
    }

    /// Number of regressed rows; the run fails when this is non-zero
    pub fn regressions(&self) -> usize {
        self.rows
            .iter()
            .filter(|(_, v)| *v == Verdict::Regressed)
            .count()
    }
}
