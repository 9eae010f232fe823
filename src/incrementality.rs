// Incrementality summaries: the share of planned driver jobs that actually ran

use crate::compare::round_pct;
use crate::jobstats::{merge_all, JobStats, MergeOptions};
use crate::report::format_float;
use anyhow::Result;
use std::io::Write;

pub const INCREMENTALITY_FIELDS: [&str; 2] = ["incrementality", "name"];
pub const PAIRED_FIELDS: [&str; 7] = [
    "old_pct",
    "old_skip",
    "new_pct",
    "new_skip",
    "delta_pct",
    "delta_skip",
    "name",
];

fn tsv_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

/// Incrementality of one build compared to another
#[derive(Debug, Clone, PartialEq)]
pub struct PairedIncrementality {
    pub name: String,
    pub old_pct: f64,
    pub old_skip: i64,
    pub new_pct: f64,
    pub new_skip: i64,
}

impl PairedIncrementality {
    /// Compare the driver jobs of two builds; `None` when either side has none
    pub fn from_jobs(
        name: &str,
        old: Vec<JobStats>,
        new: Vec<JobStats>,
        options: &MergeOptions,
    ) -> Option<Self> {
        let old = merge_all(old.into_iter().filter(JobStats::is_driver_job), options)?;
        let new = merge_all(new.into_iter().filter(JobStats::is_driver_job), options)?;
        Some(Self {
            name: name.to_string(),
            old_pct: old.incrementality_percentage(),
            old_skip: old.driver_jobs_skipped(),
            new_pct: new.incrementality_percentage(),
            new_skip: new.driver_jobs_skipped(),
        })
    }

    pub fn delta_pct(&self) -> f64 {
        round_pct(self.new_pct - self.old_pct)
    }

    pub fn delta_skip(&self) -> i64 {
        self.new_skip.saturating_sub(self.old_skip)
    }
}

/// One `incrementality name` row per driver job of each build
pub fn write_incrementality<W: Write>(out: W, builds: &[(String, Vec<JobStats>)]) -> Result<()> {
    let mut wtr = tsv_writer(out);
    wtr.write_record(INCREMENTALITY_FIELDS)?;
    for (name, jobs) in builds {
        for job in jobs.iter().filter(|job| job.is_driver_job()) {
            wtr.write_record([format_float(job.incrementality_percentage()), name.clone()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_paired_incrementality<W: Write>(out: W, rows: &[PairedIncrementality]) -> Result<()> {
    let mut wtr = tsv_writer(out);
    wtr.write_record(PAIRED_FIELDS)?;
    for row in rows {
        wtr.write_record([
            format_float(row.old_pct),
            row.old_skip.to_string(),
            format_float(row.new_pct),
            row.new_skip.to_string(),
            format_float(row.delta_pct()),
            row.delta_skip().to_string(),
            row.name.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobstats::{JobKind, DRIVER_JOBS_RUN, DRIVER_JOBS_SKIPPED};
    use crate::Snapshot;

    fn driver(ran: i64, skipped: i64) -> JobStats {
        let stats: Snapshot = [
            (DRIVER_JOBS_RUN.to_string(), ran),
            (DRIVER_JOBS_SKIPPED.to_string(), skipped),
        ]
        .into_iter()
        .collect();
        JobStats {
            kind: JobKind::Driver,
            job_id: 1,
            module: "App".to_string(),
            start_usec: 0,
            dur_usec: 1,
            job_args: Vec::new(),
            stats,
        }
    }

    fn frontend() -> JobStats {
        JobStats {
            kind: JobKind::Frontend,
            ..driver(0, 0)
        }
    }

    #[test]
    fn test_write_incrementality_only_driver_jobs() {
        let builds = vec![("build-1".to_string(), vec![driver(1, 3), frontend()])];
        let mut buf = Vec::new();
        write_incrementality(&mut buf, &builds).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "incrementality\tname\n25.0\tbuild-1\n"
        );
    }

    #[test]
    fn test_paired_deltas_round_and_saturate() {
        let row = PairedIncrementality {
            name: "proj".to_string(),
            old_pct: 33.33,
            old_skip: i64::MIN,
            new_pct: 66.67,
            new_skip: i64::MAX,
        };
        assert_eq!(row.delta_pct(), 33.34);
        assert_eq!(row.delta_skip(), i64::MAX);
    }

    #[test]
    fn test_paired_incrementality() {
        let row = PairedIncrementality::from_jobs(
            "proj",
            vec![driver(4, 0)],
            vec![driver(1, 3), frontend()],
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(row.old_pct, 100.0);
        assert_eq!(row.new_pct, 25.0);
        assert_eq!(row.delta_pct(), -75.0);
        assert_eq!(row.delta_skip(), 3);

        let mut buf = Vec::new();
        write_paired_incrementality(&mut buf, &[row]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "old_pct\told_skip\tnew_pct\tnew_skip\tdelta_pct\tdelta_skip\tname\n\
             100.0\t0\t25.0\t3\t-75.0\t3\tproj\n"
        );
    }

    #[test]
    fn test_paired_without_driver_jobs() {
        assert!(PairedIncrementality::from_jobs(
            "proj",
            vec![frontend()],
            vec![driver(1, 1)],
            &MergeOptions::default()
        )
        .is_none());
    }
}
