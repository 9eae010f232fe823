// Snapshot comparison and regression classification
//
// Two aggregate snapshots (old, new) become one row per counter of the old
// side. Each row is classified against fixed thresholds: counters need only
// exceed the percentage threshold, timers must also exceed an absolute
// microsecond threshold so that large relative swings on tiny timings are
// treated as noise.

mod classify;
mod row;

pub use classify::{classify, Classified, Thresholds, Verdict};
pub use row::{compare, diff_and_pct, round_pct, ComparisonRow};
