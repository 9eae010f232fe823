// Loading `-stats-output-dir` directories
//
// Each compiler job writes one JSON object of counters to a file named
//
//     stats-<start>-swift-<kind>-<module>-<input>-<triple>-<out>-<opt>-<pid>[-...].json
//
// and, when profiling, a directory `profile-<same fields>.dir` holding one
// file per profiled counter (`<counter>.<profiletype>`).

use crate::filter::{ModuleFilter, StatFilter};
use crate::jobstats::job::{JobKind, JobStats};
use crate::Snapshot;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

const AUX_PATTERN: &str =
    r"(?P<module>[^-]+)-(?P<input>[^-]+)-(?P<triple>[^-]+)-(?P<out>[^-]*)-(?P<opt>[^-]+)";

static FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^stats-(?P<start>\d+)-swift-(?P<kind>\w+)-{}-(?P<pid>\d+)(-.*)?\.json$",
        AUX_PATTERN
    ))
    .unwrap()
});

static PROFILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^profile-(?P<start>\d+)-swift-(?P<kind>\w+)-{}-(?P<pid>\d+)(-.*)?\.dir$",
        AUX_PATTERN
    ))
    .unwrap()
});

static TIMER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^time\.swift-(?P<jobkind>\w+)\.{}\.(?P<timerkind>\w+)$",
        AUX_PATTERN
    ))
    .unwrap()
});

/// Errors that can occur while loading a stats directory
#[derive(Error, Debug)]
pub enum JobStatsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid stats JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON object of counters in {0}")]
    NotAnObject(PathBuf),

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Options applied while loading job stats
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub select_module: ModuleFilter,
    pub select_stat: StatFilter,
    /// Drop `time.` counters entirely
    pub exclude_timers: bool,
    /// Collapse per-file timers to `time.swift-<jobkind>.<timerkind>`
    pub merge_timers: bool,
}

/// Fields shared by stats file names and profile directory names
#[derive(Debug, Clone, PartialEq)]
struct JobName {
    kind: JobKind,
    job_id: u64,
    start_usec: i64,
    module: String,
    job_args: Vec<String>,
}

impl JobName {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        Some(Self {
            kind: JobKind::parse(&caps["kind"]),
            job_id: caps["pid"].parse().ok()?,
            start_usec: caps["start"].parse().ok()?,
            module: caps["module"].to_string(),
            job_args: ["input", "triple", "out", "opt"]
                .iter()
                .map(|field| caps[*field].to_string())
                .collect(),
        })
    }
}

fn match_stats_file(file_name: &str) -> Option<JobName> {
    FILE_PATTERN
        .captures(file_name)
        .and_then(|caps| JobName::from_captures(&caps))
}

fn match_profile_dir(dir_name: &str) -> Option<JobName> {
    PROFILE_PATTERN
        .captures(dir_name)
        .and_then(|caps| JobName::from_captures(&caps))
}

/// Timer kind info for a per-file timer key: `(jobkind, timerkind)`
fn match_timer(key: &str) -> Option<(String, String)> {
    TIMER_PATTERN
        .captures(key)
        .map(|caps| (caps["jobkind"].to_string(), caps["timerkind"].to_string()))
}

fn json_integer(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|v| v as i64))
}

/// Parse one stats file's counters
fn parse_stats(
    path: &Path,
    job: &JobName,
    options: &LoadOptions,
) -> Result<(Snapshot, i64), JobStatsError> {
    let content = fs::read_to_string(path).map_err(|source| JobStatsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| JobStatsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    let object = json
        .as_object()
        .ok_or_else(|| JobStatsError::NotAnObject(path.to_path_buf()))?;

    let mut stats = Snapshot::new();
    let mut dur_usec = 1;

    for (key, value) in object {
        if !options.select_stat.matches(key) {
            continue;
        }
        if options.exclude_timers && key.starts_with("time.") {
            continue;
        }

        let mut name = key.clone();
        let value = match match_timer(key) {
            Some((jobkind, timerkind)) => {
                // timers are recorded in seconds
                let Some(seconds) = value.as_f64() else {
                    tracing::debug!("skipping non-numeric timer {} in {}", key, path.display());
                    continue;
                };
                let usec = (seconds * 1_000_000.0) as i64;
                if jobkind == job.kind.as_str() && timerkind == "wall" {
                    dur_usec = usec;
                }
                if options.merge_timers {
                    name = format!("time.swift-{}.{}", jobkind, timerkind);
                }
                usec
            }
            None => match json_integer(value) {
                Some(v) => v,
                None => {
                    tracing::debug!("skipping non-numeric stat {} in {}", key, path.display());
                    continue;
                }
            },
        };
        stats.insert(name, value);
    }

    Ok((stats, dur_usec))
}

/// Load every stats file found under `path` into per-job collections
///
/// Files are visited in path order so the result is deterministic.
pub fn load_stats_dir<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
) -> Result<Vec<JobStats>, JobStatsError> {
    let root = path.as_ref();
    let mut jobs = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| JobStatsError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let Some(job) = match_stats_file(&file_name) else {
            continue;
        };
        if !options.select_module.matches(&job.module) {
            continue;
        }

        tracing::debug!("loading {}", entry.path().display());
        let (stats, dur_usec) = parse_stats(entry.path(), &job, options)?;

        jobs.push(JobStats {
            kind: job.kind,
            job_id: job.job_id,
            module: job.module,
            start_usec: job.start_usec,
            dur_usec,
            job_args: job.job_args,
            stats,
        });
    }

    tracing::debug!("loaded {} jobs from {}", jobs.len(), root.display());
    Ok(jobs)
}

/// Profiles recorded by one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobProfiles {
    pub kind: JobKind,
    pub job_id: u64,
    pub module: String,
    pub start_usec: i64,
    pub job_args: Vec<String>,
    /// profile type -> counter -> profile file
    pub profiles: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl JobProfiles {
    pub fn is_frontend_job(&self) -> bool {
        self.kind == JobKind::Frontend
    }

    pub fn input(&self) -> &str {
        self.job_args.first().map_or("", String::as_str)
    }

    pub fn triple(&self) -> &str {
        self.job_args.get(1).map_or("", String::as_str)
    }

    pub fn opt(&self) -> &str {
        self.job_args.get(3).map_or("", String::as_str)
    }
}

/// Non-empty profile files in a job's profile directory
fn find_profiles_in(
    dir: &Path,
    select_stat: &StatFilter,
) -> Result<BTreeMap<String, BTreeMap<String, PathBuf>>, JobStatsError> {
    let io_err = |source| JobStatsError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut profiles: BTreeMap<String, BTreeMap<String, PathBuf>> = BTreeMap::new();

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();

        if file_name.ends_with(".svg") || !select_stat.matches(&file_name) {
            continue;
        }
        if entry.metadata().map_err(io_err)?.len() == 0 {
            continue;
        }
        let Some((counter, profile_type)) = file_name.rsplit_once('.') else {
            continue;
        };

        profiles
            .entry(profile_type.to_string())
            .or_default()
            .insert(counter.to_string(), path);
    }

    Ok(profiles)
}

/// List the profile directories found under `path`
pub fn list_stats_dir_profiles<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
) -> Result<Vec<JobProfiles>, JobStatsError> {
    let root = path.as_ref();
    let mut jobs = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| JobStatsError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir_name = entry.file_name().to_string_lossy();
        let Some(job) = match_profile_dir(&dir_name) else {
            continue;
        };
        if !options.select_module.matches(&job.module) {
            continue;
        }

        jobs.push(JobProfiles {
            profiles: find_profiles_in(entry.path(), &options.select_stat)?,
            kind: job.kind,
            job_id: job.job_id,
            module: job.module,
            start_usec: job.start_usec,
            job_args: job.job_args,
        });
    }

    Ok(jobs)
}
