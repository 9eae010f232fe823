// Epoch-versioned counter baselines
//
// A baseline is a durable, mergeable record of expected counter values.
// Each row carries the epoch at which its value was last deliberately set,
// so independently updated copies can be concatenated (union merge) and
// reconciled on the next read without manual conflict resolution.
//
// - `reconcile`: the per-name (epoch, value) merge rule
// - `store`: reading and writing the tab-separated table

mod reconcile;
mod store;

pub use reconcile::{Baseline, BaselineEntry, ConflictPolicy, Reconciliation};
pub use store::{
    read_baseline, read_baseline_file, update_baseline_file, write_baseline, BaselineError,
    BaselineUpdate, BASELINE_FIELDS,
};
