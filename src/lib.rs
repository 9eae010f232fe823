//! statsdiff - epoch-versioned counter baselines and regression gating for
//! compiler `-stats-output-dir` runs
//!
//! Raw per-job counter files are loaded and merged into one snapshot, which
//! is either folded into a persisted baseline or compared against another
//! snapshot and classified into regressions, improvements and noise.

pub mod baseline;
pub mod cli;
pub mod commands;
pub mod compare;
pub mod config;
pub mod counter;
pub mod expr;
pub mod filter;
pub mod incrementality;
pub mod jobstats;
pub mod lnt_output;
pub mod profiles;
pub mod report;
pub mod trace_output;

/// Counter values keyed by name, iterated in name order
pub type Snapshot = std::collections::BTreeMap<String, i64>;
