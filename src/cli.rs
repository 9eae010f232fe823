//! CLI argument parsing for statsdiff

use crate::jobstats::MergeBy;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Parse a `key=value` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// What an invocation does
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Catapult,
    Incrementality,
    SetBaseline(PathBuf),
    CompareToBaseline(PathBuf),
    CompareStatsDirs,
    Lnt,
    Evaluate(String),
    EvaluateDelta(String),
    RenderProfiles,
}

#[derive(Parser, Debug)]
#[command(name = "statsdiff")]
#[command(version)]
#[command(
    about = "Merge, baseline and compare compiler -stats-output-dir counters",
    long_about = None
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args([
            "catapult",
            "incrementality",
            "set_csv_baseline",
            "compare_to_csv_baseline",
            "compare_stats_dirs",
            "lnt",
            "evaluate",
            "evaluate_delta",
            "render_profiles",
        ])
))]
pub struct Cli {
    /// Report activity verbosely
    #[arg(long)]
    pub verbose: bool,

    /// Write output to file (`-` for stdout)
    #[arg(long, value_name = "PATH", default_value = "-")]
    pub output: PathBuf,

    /// Defaults file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Process two dirs-of-stats-dirs, pairwise
    #[arg(long)]
    pub paired: bool,

    /// Percentage change required to report [default: 0.01]
    #[arg(long, value_name = "PCT")]
    pub delta_pct_thresh: Option<f64>,

    /// Absolute delta on times required to report [default: 100000]
    #[arg(long, value_name = "USEC")]
    pub delta_usec_thresh: Option<i64>,

    /// Machine name for LNT submission [default: host name]
    #[arg(long, value_name = "NAME")]
    pub lnt_machine: Option<String>,

    /// Extra key=value pairs for LNT run-info
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub lnt_run_info: Vec<(String, String)>,

    /// Extra key=value pairs for LNT machine-info
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub lnt_machine_info: Vec<(String, String)>,

    /// Order for LNT submission [default: current time]
    #[arg(long, value_name = "ORDER")]
    pub lnt_order: Option<String>,

    /// Tag for LNT submission [default: swift-compile]
    #[arg(long, value_name = "TAG")]
    pub lnt_tag: Option<String>,

    /// URL to submit LNT data to (rather than print)
    #[arg(long, value_name = "URL")]
    pub lnt_submit: Option<String>,

    /// Select specific modules
    #[arg(long, value_name = "MODULE")]
    pub select_module: Vec<String>,

    /// Group stats by module
    #[arg(long)]
    pub group_by_module: bool,

    /// Select specific statistics (regex)
    #[arg(long, value_name = "PATTERN")]
    pub select_stat: Vec<String>,

    /// Select statistics present in a CSV baseline
    #[arg(long, value_name = "BASELINE.csv")]
    pub select_stats_from_csv_baseline: Option<PathBuf>,

    /// Only select counters, exclude timers
    #[arg(long)]
    pub exclude_timers: bool,

    /// Sort comparison results by delta-%, not stat
    #[arg(long)]
    pub sort_by_delta_pct: bool,

    /// Sort comparison results in descending order
    #[arg(long)]
    pub sort_descending: bool,

    /// Merge identical metrics by [default: sum]
    #[arg(long, value_enum, value_name = "HOW")]
    pub merge_by: Option<MergeBy>,

    /// Merge timers across modules/targets/etc.
    #[arg(long)]
    pub merge_timers: bool,

    /// Divide stats by D (to take an average) [default: 1]
    #[arg(long, value_name = "D", value_parser = clap::value_parser!(u32).range(1..))]
    pub divide_by: Option<u32>,

    /// Write output in markdown table format
    #[arg(long)]
    pub markdown: bool,

    /// Include unchanged stats values in comparison
    #[arg(long)]
    pub include_unchanged: bool,

    /// Close regression details in markdown
    #[arg(long)]
    pub close_regressions: bool,

    /// Add github-emoji indicators to markdown
    #[arg(long)]
    pub github_emoji: bool,

    /// Fail when a baseline holds two values for a counter at the same epoch
    #[arg(long)]
    pub strict_conflicts: bool,

    /// Epoch stamped on new baseline values [default: now]
    #[arg(long, value_name = "SECONDS")]
    pub epoch: Option<i64>,

    /// Emit a 'catapult'-compatible trace of events
    #[arg(long)]
    pub catapult: bool,

    /// Summarize the 'incrementality' of a build
    #[arg(long)]
    pub incrementality: bool,

    /// Merge stats from a stats-dir into a CSV baseline
    #[arg(long, value_name = "BASELINE.csv")]
    pub set_csv_baseline: Option<PathBuf>,

    /// Compare stats dir to named CSV baseline
    #[arg(long, value_name = "BASELINE.csv")]
    pub compare_to_csv_baseline: Option<PathBuf>,

    /// Compare two stats dirs directly
    #[arg(long)]
    pub compare_stats_dirs: bool,

    /// Emit an LNT-compatible test summary
    #[arg(long)]
    pub lnt: bool,

    /// Evaluate an expression of stat-names
    #[arg(long, value_name = "EXPR")]
    pub evaluate: Option<String>,

    /// Evaluate an expression of stat-deltas
    #[arg(long, value_name = "EXPR")]
    pub evaluate_delta: Option<String>,

    /// Render any profiles to SVG flamegraphs
    #[arg(long)]
    pub render_profiles: bool,

    /// Path to flamegraph.pl
    #[arg(long, value_name = "PATH")]
    pub flamegraph_script: Option<PathBuf>,

    /// Report the rendered profile index for opening in a browser
    #[arg(long)]
    pub browse_profiles: bool,

    /// Stats directories to process
    #[arg(value_name = "STATS_DIR")]
    pub stats_dirs: Vec<PathBuf>,
}

impl Cli {
    /// The selected mode; clap guarantees exactly one is set
    pub fn mode(&self) -> Mode {
        if self.catapult {
            Mode::Catapult
        } else if self.compare_stats_dirs {
            Mode::CompareStatsDirs
        } else if let Some(path) = &self.set_csv_baseline {
            Mode::SetBaseline(path.clone())
        } else if let Some(path) = &self.compare_to_csv_baseline {
            Mode::CompareToBaseline(path.clone())
        } else if self.incrementality {
            Mode::Incrementality
        } else if self.lnt {
            Mode::Lnt
        } else if let Some(expr) = &self.evaluate {
            Mode::Evaluate(expr.clone())
        } else if let Some(expr) = &self.evaluate_delta {
            Mode::EvaluateDelta(expr.clone())
        } else {
            Mode::RenderProfiles
        }
    }
}
