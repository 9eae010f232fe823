//! Comparison reports
//!
//! Two renderings of a classified comparison:
//! - a flat, tab-separated table of the changed rows for machines
//! - a markdown report with collapsible Regressed / Improved / Unchanged
//!   sections for humans (e.g. pull request comments), optionally split
//!   per module

mod format;
mod markdown;
mod table;

pub use format::{format_float, format_pct, format_thousands, format_time};
pub use markdown::write_markdown;
pub use table::write_table;

use crate::compare::{Classified, ComparisonRow};
use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::Write;

/// Field a report is sorted by
#[derive(ValueEnum, Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    DeltaPct,
}

impl SortKey {
    /// Ascending order of two rows under this key
    pub fn compare(&self, a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
        match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::DeltaPct => a.delta_pct.total_cmp(&b.delta_pct),
        }
    }
}

/// Rendering options shared by both report formats
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Markdown report instead of the flat table
    pub markdown: bool,
    pub sort_by: SortKey,
    pub descending: bool,
    /// Split sections per module and strip the module from displayed names
    pub group_by_module: bool,
    /// Collapse the Regressed section even when it has rows
    pub close_regressions: bool,
    /// Append `:no_entry:` / `:white_check_mark:` to changed percentages
    pub github_emoji: bool,
    /// Flat table only: also list unchanged rows
    pub include_unchanged: bool,
}

/// Stable sort honoring the key and direction
pub fn sort_rows(rows: &mut [&ComparisonRow], options: &ReportOptions) {
    rows.sort_by(|a, b| {
        let ord = options.sort_by.compare(a, b);
        if options.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// Render a classified comparison and return its regression count
pub fn render<W: Write>(out: W, classified: &Classified, options: &ReportOptions) -> Result<usize> {
    if options.markdown {
        write_markdown(out, classified, options)?;
    } else {
        write_table(out, classified, options)?;
    }
    Ok(classified.regressions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_rows_by_name() {
        let a = ComparisonRow::new("b", 1, 2);
        let b = ComparisonRow::new("a", 1, 3);
        let mut rows = vec![&a, &b];
        sort_rows(&mut rows, &ReportOptions::default());
        assert_eq!(rows[0].name, "a");
    }

    #[test]
    fn test_sort_rows_by_delta_pct_descending() {
        let a = ComparisonRow::new("a", 100, 110);
        let b = ComparisonRow::new("b", 100, 150);
        let c = ComparisonRow::new("c", 100, 90);
        let mut rows = vec![&a, &b, &c];
        let options = ReportOptions {
            sort_by: SortKey::DeltaPct,
            descending: true,
            ..ReportOptions::default()
        };
        sort_rows(&mut rows, &options);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
