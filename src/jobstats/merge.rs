// Reduction of many jobs into one aggregate

use crate::filter::ModuleFilter;
use crate::jobstats::job::JobStats;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How identical counters from different jobs are combined
#[derive(ValueEnum, Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergeBy {
    #[default]
    Sum,
    /// Minimum of the non-zero values (zero doubles as "not emitted")
    Min,
    Max,
}

impl MergeBy {
    pub fn apply(&self, a: i64, b: i64) -> i64 {
        match self {
            MergeBy::Sum => a.saturating_add(b),
            MergeBy::Min => {
                if a != 0 && b != 0 {
                    a.min(b)
                } else {
                    a.max(b)
                }
            }
            MergeBy::Max => a.max(b),
        }
    }
}

/// Options for `merge_all`
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub select_module: ModuleFilter,
    /// Merge per module first and qualify counters as `<module>.<name>`
    pub group_by_module: bool,
    pub merge_by: MergeBy,
    /// Divide the aggregate by this, e.g. the number of repeated builds
    pub divide_by: u32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            select_module: ModuleFilter::all(),
            group_by_module: false,
            merge_by: MergeBy::Sum,
            divide_by: 1,
        }
    }
}

fn fold(jobs: impl IntoIterator<Item = JobStats>, merge_by: MergeBy) -> Option<JobStats> {
    jobs.into_iter()
        .reduce(|acc, job| acc.merged_with(&job, merge_by))
}

/// Reduce a set of jobs to one aggregate, or `None` when nothing is left
/// after module selection
pub fn merge_all(
    jobs: impl IntoIterator<Item = JobStats>,
    options: &MergeOptions,
) -> Option<JobStats> {
    let selected = jobs
        .into_iter()
        .filter(|job| options.select_module.matches(&job.module));

    let merged = if options.group_by_module {
        let mut by_module: BTreeMap<String, Vec<JobStats>> = BTreeMap::new();
        for job in selected {
            by_module.entry(job.module.clone()).or_default().push(job);
        }
        let prefixed = by_module.into_iter().filter_map(|(module, group)| {
            fold(group, options.merge_by).map(|job| job.prefixed_by(&module))
        });
        fold(prefixed, options.merge_by)
    } else {
        fold(selected, options.merge_by)
    };

    merged.map(|job| job.divided_by(options.divide_by))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobstats::job::JobKind;

    fn job(module: &str, stats: &[(&str, i64)]) -> JobStats {
        JobStats {
            kind: JobKind::Frontend,
            job_id: 1,
            module: module.to_string(),
            start_usec: 0,
            dur_usec: 1,
            job_args: Vec::new(),
            stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_merge_by_ops() {
        assert_eq!(MergeBy::Sum.apply(2, 3), 5);
        assert_eq!(MergeBy::Min.apply(2, 3), 2);
        assert_eq!(MergeBy::Min.apply(0, 3), 3);
        assert_eq!(MergeBy::Min.apply(3, 0), 3);
        assert_eq!(MergeBy::Max.apply(2, 3), 3);
    }

    #[test]
    fn test_merge_all_empty_is_none() {
        assert!(merge_all(Vec::new(), &MergeOptions::default()).is_none());
    }

    #[test]
    fn test_merge_all_sums_and_divides() {
        let jobs = vec![job("Swift", &[("A", 4)]), job("Swift", &[("A", 6)])];
        let options = MergeOptions {
            divide_by: 2,
            ..MergeOptions::default()
        };
        let merged = merge_all(jobs, &options).unwrap();
        assert_eq!(merged.stats.get("A"), Some(&5));
    }

    #[test]
    fn test_merge_all_select_module() {
        let jobs = vec![job("Swift", &[("A", 4)]), job("Foundation", &[("A", 6)])];
        let options = MergeOptions {
            select_module: ModuleFilter::from_names(["Foundation"]),
            ..MergeOptions::default()
        };
        let merged = merge_all(jobs, &options).unwrap();
        assert_eq!(merged.stats.get("A"), Some(&6));
        assert_eq!(merged.module, "Foundation");
    }

    #[test]
    fn test_merge_all_select_module_no_match() {
        let jobs = vec![job("Swift", &[("A", 4)])];
        let options = MergeOptions {
            select_module: ModuleFilter::from_names(["Nope"]),
            ..MergeOptions::default()
        };
        assert!(merge_all(jobs, &options).is_none());
    }

    #[test]
    fn test_merge_all_group_by_module() {
        let jobs = vec![
            job("Swift", &[("A", 4)]),
            job("Foundation", &[("A", 6)]),
            job("Swift", &[("A", 1)]),
        ];
        let options = MergeOptions {
            group_by_module: true,
            divide_by: 1,
            ..MergeOptions::default()
        };
        let merged = merge_all(jobs, &options).unwrap();
        assert_eq!(merged.stats.get("Swift.A"), Some(&5));
        assert_eq!(merged.stats.get("Foundation.A"), Some(&6));
        assert!(!merged.stats.contains_key("A"));
    }

    #[test]
    fn test_merge_all_group_by_module_divides_once() {
        let jobs = vec![job("Swift", &[("A", 4)]), job("Swift", &[("A", 4)])];
        let options = MergeOptions {
            group_by_module: true,
            divide_by: 2,
            ..MergeOptions::default()
        };
        let merged = merge_all(jobs, &options).unwrap();
        assert_eq!(merged.stats.get("Swift.A"), Some(&4));
    }
}
