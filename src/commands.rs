//! Mode dispatch for the statsdiff binary
//!
//! Every handler returns the process exit code: 0 on success, 1 when a
//! comparison found regressions or an evaluated condition failed.

use crate::baseline::{read_baseline_file, update_baseline_file, BaselineError, ConflictPolicy};
use crate::cli::{Cli, Mode};
use crate::compare::{compare, Classified, Thresholds};
use crate::config::{resolve_machine_name, Config};
use crate::counter::strip_module;
use crate::expr::{delta_environment, evaluate, stats_environment, Environment};
use crate::filter::{ModuleFilter, StatFilter};
use crate::incrementality::{
    write_incrementality, write_paired_incrementality, PairedIncrementality,
};
use crate::jobstats::{
    list_stats_dir_profiles, load_stats_dir, merge_all, JobStats, LoadOptions, MergeOptions,
};
use crate::lnt_output::{submit_lnt_report, write_lnt_report, LntOptions, LntReport};
use crate::profiles::{find_flamegraph_script, render_profiles};
use crate::report::{render, ReportOptions, SortKey};
use crate::trace_output::write_catapult_trace;
use crate::Snapshot;
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything a mode needs, resolved from the command line and the defaults file
#[derive(Debug, Clone)]
pub struct Options {
    pub stats_dirs: Vec<PathBuf>,
    pub output: PathBuf,
    pub paired: bool,
    pub load: LoadOptions,
    pub merge: MergeOptions,
    pub thresholds: Thresholds,
    pub report: ReportOptions,
    pub policy: ConflictPolicy,
    pub epoch: i64,
    pub lnt: LntOptions,
    pub lnt_submit: Option<String>,
    pub flamegraph_script: Option<PathBuf>,
    pub browse_profiles: bool,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Stat selection from the names tracked in a baseline
///
/// Module-qualified names (`Module.Category.Name`) are reduced to
/// `Category.Name` when every name has three segments or when the output is
/// grouped by module anyway.
fn baseline_stat_filter(path: &Path, group_by_module: bool) -> Result<StatFilter> {
    let baseline = read_baseline_file(path, &StatFilter::all(), ConflictPolicy::LastWins)
        .with_context(|| format!("Failed to read baseline {}", path.display()))?;
    let all_triples = baseline.names().all(|name| name.split('.').count() == 3);
    let strip = group_by_module || all_triples;

    let patterns: Vec<String> = baseline
        .names()
        .map(|name| {
            let name = if strip { strip_module(name) } else { name.as_str() };
            regex::escape(name)
        })
        .collect();
    tracing::debug!("selecting {} stats from {}", patterns.len(), path.display());

    if patterns.is_empty() {
        // an empty baseline selects nothing rather than everything
        return StatFilter::from_patterns(["$^"]);
    }
    StatFilter::from_patterns(patterns)
}

impl Options {
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let select_stat = match &cli.select_stats_from_csv_baseline {
            Some(path) => baseline_stat_filter(path, cli.group_by_module)?,
            None => StatFilter::from_patterns(&cli.select_stat)?,
        };
        let select_module = ModuleFilter::from_names(&cli.select_module);

        let thresholds = Thresholds {
            delta_pct: cli.delta_pct_thresh.unwrap_or(config.thresholds.delta_pct),
            delta_usec: cli.delta_usec_thresh.unwrap_or(config.thresholds.delta_usec),
        };

        let lnt = LntOptions {
            machine: resolve_machine_name(
                cli.lnt_machine.as_deref().or(config.lnt_machine.as_deref()),
            ),
            machine_info: cli.lnt_machine_info.iter().cloned().collect(),
            run_info: cli.lnt_run_info.iter().cloned().collect(),
            order: cli
                .lnt_order
                .clone()
                .unwrap_or_else(|| now_secs().to_string()),
            tag: cli.lnt_tag.clone().unwrap_or_else(|| config.lnt_tag.clone()),
        };

        let options = Self {
            stats_dirs: cli.stats_dirs.clone(),
            output: cli.output.clone(),
            paired: cli.paired,
            load: LoadOptions {
                select_module: select_module.clone(),
                select_stat,
                exclude_timers: cli.exclude_timers,
                merge_timers: cli.merge_timers,
            },
            merge: MergeOptions {
                select_module,
                group_by_module: cli.group_by_module,
                merge_by: cli.merge_by.unwrap_or(config.merge_by),
                divide_by: cli.divide_by.unwrap_or(config.divide_by),
            },
            thresholds,
            report: ReportOptions {
                markdown: cli.markdown,
                sort_by: if cli.sort_by_delta_pct {
                    SortKey::DeltaPct
                } else {
                    SortKey::Name
                },
                descending: cli.sort_descending,
                group_by_module: cli.group_by_module,
                close_regressions: cli.close_regressions,
                github_emoji: cli.github_emoji,
                include_unchanged: cli.include_unchanged,
            },
            policy: if cli.strict_conflicts {
                ConflictPolicy::Strict
            } else {
                ConflictPolicy::LastWins
            },
            epoch: cli.epoch.unwrap_or_else(now_secs),
            lnt,
            lnt_submit: cli.lnt_submit.clone(),
            flamegraph_script: cli
                .flamegraph_script
                .clone()
                .or_else(|| config.flamegraph_script.clone()),
            browse_profiles: cli.browse_profiles,
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<()> {
        let config = Config {
            thresholds: self.thresholds,
            merge_by: self.merge.merge_by,
            divide_by: self.merge.divide_by,
            lnt_tag: self.lnt.tag.clone(),
            lnt_machine: None,
            flamegraph_script: None,
        };
        config.validate()?;
        Ok(())
    }

    fn open_output(&self) -> Result<Box<dyn Write>> {
        if self.output.as_os_str() == "-" {
            Ok(Box::new(io::stdout().lock()))
        } else {
            let file = File::create(&self.output)
                .with_context(|| format!("Failed to create {}", self.output.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }

    fn load(&self, dir: &Path) -> Result<Vec<JobStats>> {
        load_stats_dir(dir, &self.load).with_context(|| format!("Failed to load {}", dir.display()))
    }

    fn load_all(&self) -> Result<Vec<JobStats>> {
        let mut jobs = Vec::new();
        for dir in &self.stats_dirs {
            jobs.extend(self.load(dir)?);
        }
        Ok(jobs)
    }

    fn merged(&self, dir: &Path) -> Result<JobStats> {
        merge_all(self.load(dir)?, &self.merge)
            .with_context(|| format!("no stats found in {}", dir.display()))
    }

    fn expect_dirs(&self, n: usize, what: &str) -> Result<()> {
        if self.stats_dirs.len() != n {
            bail!(
                "Expected exactly {} stats-dir{} to {}, got {}",
                n,
                if n == 1 { "" } else { "s" },
                what,
                self.stats_dirs.len()
            );
        }
        Ok(())
    }
}

/// Run the selected mode and return the exit code
pub fn run(cli: &Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let options = Options::resolve(cli, &config)?;

    match cli.mode() {
        Mode::Catapult => catapult(&options),
        Mode::CompareStatsDirs => compare_stats_dirs(&options),
        Mode::SetBaseline(path) => set_baseline(&options, &path),
        Mode::CompareToBaseline(path) => compare_to_baseline(&options, &path),
        Mode::Incrementality if options.paired => paired_incrementality(&options),
        Mode::Incrementality => incrementality(&options),
        Mode::Lnt => lnt(&options),
        Mode::Evaluate(expr) => evaluate_stats(&options, &expr),
        Mode::EvaluateDelta(expr) => evaluate_deltas(&options, &expr),
        Mode::RenderProfiles => profiles(&options),
    }
}

pub fn catapult(options: &Options) -> Result<i32> {
    let jobs = options.load_all()?;
    let count = write_catapult_trace(options.open_output()?, jobs)?;
    tracing::debug!("wrote {} trace events", count);
    Ok(0)
}

fn write_comparison(options: &Options, old: &Snapshot, new: &Snapshot) -> Result<i32> {
    let classified = Classified::new(compare(old, new), options.thresholds);
    let regressions = render(options.open_output()?, &classified, &options.report)?;
    if regressions > 0 {
        tracing::info!("{} regressions", regressions);
        Ok(1)
    } else {
        Ok(0)
    }
}

pub fn compare_stats_dirs(options: &Options) -> Result<i32> {
    options.expect_dirs(2, "compare")?;
    let old = options.merged(&options.stats_dirs[0])?;
    let new = options.merged(&options.stats_dirs[1])?;
    write_comparison(options, &old.stats, &new.stats)
}

pub fn set_baseline(options: &Options, path: &Path) -> Result<i32> {
    let Some(merged) = merge_all(options.load_all()?, &options.merge) else {
        tracing::error!("no stats found");
        return Ok(1);
    };

    match update_baseline_file(path, &merged.stats, options.epoch, options.policy) {
        Ok(update) => {
            tracing::debug!("baseline {} holds {} entries", path.display(), update.entries);
            Ok(0)
        }
        Err(BaselineError::NoStats) => {
            tracing::error!("no stats found");
            Ok(1)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to update baseline {}", path.display())),
    }
}

pub fn compare_to_baseline(options: &Options, path: &Path) -> Result<i32> {
    let baseline = read_baseline_file(path, &options.load.select_stat, options.policy)
        .with_context(|| format!("Failed to read baseline {}", path.display()))?;
    let merged = merge_all(options.load_all()?, &options.merge).context("no stats found")?;
    write_comparison(options, &baseline.values(), &merged.stats)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn incrementality(options: &Options) -> Result<i32> {
    let mut builds = Vec::new();
    for dir in &options.stats_dirs {
        builds.push((dir_name(dir), options.load(dir)?));
    }
    write_incrementality(options.open_output()?, &builds)?;
    Ok(0)
}

/// Subdirectories present in both `old` and `new`, sorted by name
fn common_subdirs(old: &Path, new: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(old).with_context(|| format!("Failed to list {}", old.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if new.join(&name).is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

pub fn paired_incrementality(options: &Options) -> Result<i32> {
    options.expect_dirs(2, "pair")?;
    let (old, new) = (&options.stats_dirs[0], &options.stats_dirs[1]);

    let mut rows = Vec::new();
    for name in common_subdirs(old, new)? {
        let old_jobs = options.load(&old.join(&name))?;
        let new_jobs = options.load(&new.join(&name))?;
        if old_jobs.is_empty() || new_jobs.is_empty() {
            continue;
        }
        if let Some(row) =
            PairedIncrementality::from_jobs(&name, old_jobs, new_jobs, &options.merge)
        {
            rows.push(row);
        }
    }
    write_paired_incrementality(options.open_output()?, &rows)?;
    Ok(0)
}

pub fn lnt(options: &Options) -> Result<i32> {
    let mut out = options.open_output()?;
    for dir in &options.stats_dirs {
        let report = LntReport::from_job(&options.merged(dir)?, &options.lnt)?;
        match &options.lnt_submit {
            Some(url) => {
                submit_lnt_report(url, &report)?;
            }
            None => write_lnt_report(&mut out, &report)?,
        }
    }
    Ok(0)
}

fn check_condition(label: &str, expr: &str, env: &Environment) -> i32 {
    tracing::debug!("evaluating '{}' over {} variables", expr, env.len());
    match evaluate(expr, env) {
        Ok(true) => 0,
        Ok(false) => {
            tracing::error!("{} condition failed: '{}'", label, expr);
            1
        }
        Err(e) => {
            tracing::error!("{}: {}", label, e);
            1
        }
    }
}

pub fn evaluate_stats(options: &Options, expr: &str) -> Result<i32> {
    options.expect_dirs(1, "evaluate against")?;
    let merged = options.merged(&options.stats_dirs[0])?;
    Ok(check_condition("evaluate", expr, &stats_environment(&merged.stats)))
}

pub fn evaluate_deltas(options: &Options, expr: &str) -> Result<i32> {
    options.expect_dirs(2, "evaluate-delta")?;
    let old = options.merged(&options.stats_dirs[0])?;
    let new = options.merged(&options.stats_dirs[1])?;
    let rows = compare(&old.stats, &new.stats);
    Ok(check_condition("evaluate-delta", expr, &delta_environment(&rows)))
}

pub fn profiles(options: &Options) -> Result<i32> {
    let script = find_flamegraph_script(options.flamegraph_script.as_deref());
    if script.is_none() {
        tracing::warn!("Need flamegraph.pl in $PATH, or pass --flamegraph-script");
    }

    for dir in &options.stats_dirs {
        let jobs = list_stats_dir_profiles(dir, &options.load)
            .with_context(|| format!("Failed to list profiles in {}", dir.display()))?;
        let result = render_profiles(dir, &jobs, script.as_deref())?;
        tracing::info!(
            "rendered {} flamegraphs, index at {}",
            result.rendered,
            result.index.display()
        );
        if options.browse_profiles {
            let index = fs::canonicalize(&result.index).unwrap_or(result.index);
            tracing::info!("browse file://{}", index.display());
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("statsdiff").chain(args.iter().copied()))
    }

    #[test]
    fn test_resolve_defaults() {
        let options =
            Options::resolve(&cli(&["--compare-stats-dirs", "a", "b"]), &Config::default())
                .unwrap();
        assert_eq!(options.thresholds, Thresholds::default());
        assert_eq!(options.merge.divide_by, 1);
        assert_eq!(options.policy, ConflictPolicy::LastWins);
        assert_eq!(options.report.sort_by, SortKey::Name);
        assert_eq!(options.lnt.tag, "swift-compile");
        assert!(options.load.select_stat.is_match_all());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config::from_toml_str(concat!(
            "merge_by = \"max\"\n",
            "lnt_tag = \"nightly\"\n",
            "[thresholds]\n",
            "delta_pct = 5.0\n",
            "delta_usec = 10\n",
        ))
        .unwrap();
        let options = Options::resolve(
            &cli(&[
                "--compare-stats-dirs",
                "--delta-pct-thresh",
                "1.5",
                "--strict-conflicts",
                "--epoch",
                "42",
                "a",
                "b",
            ]),
            &config,
        )
        .unwrap();
        assert_eq!(options.thresholds.delta_pct, 1.5);
        assert_eq!(options.thresholds.delta_usec, 10);
        assert_eq!(options.merge.merge_by, crate::jobstats::MergeBy::Max);
        assert_eq!(options.lnt.tag, "nightly");
        assert_eq!(options.policy, ConflictPolicy::Strict);
        assert_eq!(options.epoch, 42);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let result = Options::resolve(
            &cli(&["--compare-stats-dirs", "--delta-usec-thresh=-5", "a", "b"]),
            &Config::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_baseline_stat_filter_strips_modules_of_triples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.csv");
        fs::write(
            &path,
            concat!(
                "epoch\tname\tvalue\n",
                "1\tSwift.AST.NumSourceLines\t10\n",
                "1\tSwift.Sema.NumTypesValidated\t5\n",
            ),
        )
        .unwrap();

        let filter = baseline_stat_filter(&path, false).unwrap();
        assert!(filter.matches("AST.NumSourceLines"));
        assert!(filter.matches("Sema.NumTypesValidated"));
        assert!(!filter.matches("IRGen.NumIRInsts"));
    }

    #[test]
    fn test_baseline_stat_filter_keeps_mixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.csv");
        fs::write(
            &path,
            "epoch\tname\tvalue\n1\tAST.NumSourceLines\t10\n1\ttime.swift-frontend.wall\t5\n",
        )
        .unwrap();

        let filter = baseline_stat_filter(&path, false).unwrap();
        assert!(filter.matches("AST.NumSourceLines"));
        assert!(!filter.matches("Sema.NumTypesValidated"));
        // escaped: the dot does not match any character
        assert!(!filter.matches("ASTxNumSourceLines"));
    }

    #[test]
    fn test_empty_baseline_selects_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.csv");
        fs::write(&path, "epoch\tname\tvalue\n").unwrap();
        let filter = baseline_stat_filter(&path, false).unwrap();
        assert!(!filter.matches("AST.NumSourceLines"));
    }

    #[test]
    fn test_common_subdirs() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        for name in ["b", "a", "only-old"] {
            fs::create_dir(old.path().join(name)).unwrap();
        }
        for name in ["a", "b", "only-new"] {
            fs::create_dir(new.path().join(name)).unwrap();
        }
        fs::write(old.path().join("file"), "").unwrap();
        assert_eq!(common_subdirs(old.path(), new.path()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_expect_dirs() {
        let options =
            Options::resolve(&cli(&["--evaluate", "true", "a", "b"]), &Config::default()).unwrap();
        let err = options.expect_dirs(1, "evaluate against").unwrap_err();
        assert_eq!(err.to_string(), "Expected exactly 1 stats-dir to evaluate against, got 2");
    }
}
