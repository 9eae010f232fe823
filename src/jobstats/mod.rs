//! Job statistics from compiler `-stats-output-dir` directories
//!
//! Loading turns every stats file into a `JobStats` (one per compiler job);
//! merging reduces many jobs to the single aggregate snapshot the baseline
//! and comparison code works on.

mod job;
mod loader;
mod merge;

pub use job::{JobKind, JobStats, DRIVER_JOBS_RUN, DRIVER_JOBS_SKIPPED, MERGED};
pub use loader::{list_stats_dir_profiles, load_stats_dir, JobProfiles, JobStatsError, LoadOptions};
pub use merge::{merge_all, MergeBy, MergeOptions};
