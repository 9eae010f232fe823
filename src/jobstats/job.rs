// Per-job counter collections

use crate::compare::round_pct;
use crate::jobstats::merge::MergeBy;
use crate::Snapshot;
use std::fmt;

/// Driver counter: jobs the driver actually ran
pub const DRIVER_JOBS_RUN: &str = "Driver.NumDriverJobsRun";
/// Driver counter: jobs the driver skipped as up to date
pub const DRIVER_JOBS_SKIPPED: &str = "Driver.NumDriverJobsSkipped";

/// Kind of compiler job that emitted a stats file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// Top-level build orchestration job
    Driver,
    /// Per-file compilation job
    Frontend,
    Other(String),
    /// Result of merging jobs of different kinds
    Merged,
}

impl JobKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "driver" => JobKind::Driver,
            "frontend" => JobKind::Frontend,
            other => JobKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobKind::Driver => "driver",
            JobKind::Frontend => "frontend",
            JobKind::Other(kind) => kind,
            JobKind::Merged => MERGED,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder for fields that differ between merged jobs
pub const MERGED: &str = "<merged>";

/// Counters emitted by one compiler job (or a merge of several)
#[derive(Debug, Clone, PartialEq)]
pub struct JobStats {
    pub kind: JobKind,
    /// Random job id from the file name (not a Unix pid)
    pub job_id: u64,
    pub module: String,
    pub start_usec: i64,
    pub dur_usec: i64,
    /// `[input, triple, out, opt]` for jobs loaded from disk
    pub job_args: Vec<String>,
    pub stats: Snapshot,
}

impl JobStats {
    pub fn is_driver_job(&self) -> bool {
        self.kind == JobKind::Driver
    }

    pub fn is_frontend_job(&self) -> bool {
        self.kind == JobKind::Frontend
    }

    pub fn input(&self) -> Option<&str> {
        self.job_args.first().map(String::as_str)
    }

    pub fn triple(&self) -> Option<&str> {
        self.job_args.get(1).map(String::as_str)
    }

    pub fn out(&self) -> Option<&str> {
        self.job_args.get(2).map(String::as_str)
    }

    pub fn opt(&self) -> Option<&str> {
        self.job_args.get(3).map(String::as_str)
    }

    pub fn end_usec(&self) -> i64 {
        self.start_usec + self.dur_usec
    }

    pub fn driver_jobs_ran(&self) -> i64 {
        self.stats.get(DRIVER_JOBS_RUN).copied().unwrap_or(0)
    }

    pub fn driver_jobs_skipped(&self) -> i64 {
        self.stats.get(DRIVER_JOBS_SKIPPED).copied().unwrap_or(0)
    }

    pub fn driver_jobs_total(&self) -> i64 {
        self.driver_jobs_ran()
            .saturating_add(self.driver_jobs_skipped())
    }

    /// Percentage of planned driver jobs that actually ran, two decimals
    ///
    /// A driver that planned no jobs reports 0.0.
    pub fn incrementality_percentage(&self) -> f64 {
        let total = self.driver_jobs_total();
        if total == 0 {
            return 0.0;
        }
        round_pct(self.driver_jobs_ran() as f64 / total as f64 * 100.0)
    }

    /// Combine two jobs counter by counter
    ///
    /// Kind and module survive only when both sides agree; the time span
    /// covers both jobs and the job arguments are concatenated.
    pub fn merged_with(&self, other: &JobStats, merge_by: MergeBy) -> JobStats {
        let mut stats = self.stats.clone();
        for (name, value) in &other.stats {
            stats
                .entry(name.clone())
                .and_modify(|existing| *existing = merge_by.apply(*existing, *value))
                .or_insert(*value);
        }

        let kind = if self.kind == other.kind {
            self.kind.clone()
        } else {
            JobKind::Merged
        };
        let module = if self.module == other.module {
            self.module.clone()
        } else {
            MERGED.to_string()
        };

        let start_usec = self.start_usec.min(other.start_usec);
        let end_usec = self.end_usec().max(other.end_usec());

        let mut job_args = self.job_args.clone();
        job_args.extend(other.job_args.iter().cloned());

        JobStats {
            kind,
            job_id: self.job_id,
            module,
            start_usec,
            dur_usec: end_usec - start_usec,
            job_args,
            stats,
        }
    }

    /// Qualify every counter name with `prefix.`
    pub fn prefixed_by(&self, prefix: &str) -> JobStats {
        let stats = self
            .stats
            .iter()
            .map(|(name, value)| (format!("{}.{}", prefix, name), *value))
            .collect();
        JobStats {
            stats,
            ..self.clone()
        }
    }

    /// Divide every counter by `n` (integer division, e.g. to average runs)
    pub fn divided_by(&self, n: u32) -> JobStats {
        if n <= 1 {
            return self.clone();
        }
        let stats = self
            .stats
            .iter()
            .map(|(name, value)| (name.clone(), value / i64::from(n)))
            .collect();
        JobStats {
            stats,
            ..self.clone()
        }
    }
}
