//! Catapult (chrome://tracing) export of compiler jobs
//!
//! Each job becomes one complete ("X") event whose process id is the job's
//! position in start order.

use crate::jobstats::JobStats;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One complete event in the Trace Event Format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Module the job compiled
    pub name: String,
    /// Job kind
    pub cat: String,
    pub ph: String,
    pub pid: u64,
    pub tid: u64,
    pub ts: i64,
    pub dur: i64,
    /// input, triple, output, optimization level
    pub args: Vec<String>,
}

impl TraceEvent {
    pub fn from_job(job: &JobStats) -> Self {
        Self {
            name: job.module.clone(),
            cat: job.kind.to_string(),
            ph: "X".to_string(),
            pid: job.job_id,
            tid: 1,
            ts: job.start_usec,
            dur: job.dur_usec,
            args: job.job_args.clone(),
        }
    }
}

/// Sort jobs by start time and number them `0..n`
pub fn sequence_jobs(mut jobs: Vec<JobStats>) -> Vec<JobStats> {
    jobs.sort_by_key(|job| job.start_usec);
    for (i, job) in jobs.iter_mut().enumerate() {
        job.job_id = i as u64;
    }
    jobs
}

/// Write all jobs as a catapult trace array
pub fn write_catapult_trace<W: Write>(mut out: W, jobs: Vec<JobStats>) -> anyhow::Result<usize> {
    let events: Vec<TraceEvent> = sequence_jobs(jobs).iter().map(TraceEvent::from_job).collect();
    serde_json::to_writer(&mut out, &events)?;
    out.flush()?;
    Ok(events.len())
}
