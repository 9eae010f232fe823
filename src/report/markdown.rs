//! Markdown comparison report with collapsible sections
//!
//! ```text
//! <details open>
//! <summary>Regressed (1)</summary>
//!
//! name | old | new | delta | delta_pct
//! ---: | ---: | ---: | ---: | ---:
//! time.frontend | 1.0ms | 1.2ms | 200.0us | 20.0%
//! </details>
//! <details>
//! <summary>Improved (0)</summary>
//! ...
//! ```

use crate::compare::{Classified, ComparisonRow, Verdict};
use crate::counter::{is_timer, module_of, strip_module};
use crate::report::format::{format_float, format_pct, format_thousands, format_time};
use crate::report::table::TABLE_FIELDS;
use crate::report::{sort_rows, ReportOptions};
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;

/// Markdown writer over any output
struct MarkdownReport<'a, W: Write> {
    out: W,
    options: &'a ReportOptions,
}

impl<'a, W: Write> MarkdownReport<'a, W> {
    fn format_value(&self, row: &ComparisonRow, value: i64) -> String {
        if is_timer(&row.name) {
            format_time(value)
        } else {
            format_thousands(value)
        }
    }

    fn format_delta_pct(&self, row: &ComparisonRow, verdict: Verdict) -> String {
        let mut s = format_pct(row.delta_pct);
        if self.options.github_emoji {
            match verdict {
                Verdict::Regressed => s.push_str(" :no_entry:"),
                Verdict::Improved => s.push_str(" :white_check_mark:"),
                Verdict::Unchanged => {}
            }
        }
        s
    }

    fn format_name<'r>(&self, row: &'r ComparisonRow) -> &'r str {
        if self.options.group_by_module {
            strip_module(&row.name)
        } else {
            &row.name
        }
    }

    fn write_table(&mut self, rows: &[&ComparisonRow], verdict: Verdict) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{}", TABLE_FIELDS.join(" | "))?;
        writeln!(self.out, "{}", vec!["---:"; TABLE_FIELDS.len()].join(" | "))?;
        for row in rows {
            writeln!(
                self.out,
                "{} | {} | {} | {} | {}",
                self.format_name(row),
                self.format_value(row, row.old),
                self.format_value(row, row.new),
                self.format_value(row, row.delta),
                self.format_delta_pct(row, verdict),
            )?;
        }
        Ok(())
    }

    fn write_details(
        &mut self,
        label: &str,
        mut rows: Vec<&ComparisonRow>,
        verdict: Verdict,
        closed: bool,
    ) -> Result<()> {
        let details = if closed { "<details>" } else { "<details open>" };
        writeln!(self.out, "{}", details)?;
        writeln!(self.out, "<summary>{} ({})</summary>", label, rows.len())?;

        if self.options.group_by_module {
            let mut by_module: BTreeMap<&str, Vec<&ComparisonRow>> = BTreeMap::new();
            for row in rows {
                by_module
                    .entry(module_of(&row.name).unwrap_or(""))
                    .or_default()
                    .push(row);
            }
            for (module, mut group) in by_module {
                sort_rows(&mut group, self.options);
                writeln!(self.out, "{}", details)?;
                writeln!(
                    self.out,
                    "<summary>{} in {} ({})</summary>",
                    label,
                    module,
                    group.len()
                )?;
                self.write_table(&group, verdict)?;
                writeln!(self.out, "</details>")?;
            }
        } else {
            sort_rows(&mut rows, self.options);
            self.write_table(&rows, verdict)?;
        }

        writeln!(self.out, "</details>")?;
        Ok(())
    }
}

/// Write the three verdict sections of a classified comparison
///
/// Regressed is expanded unless it is empty or `close_regressions` is set;
/// Improved and Unchanged are always collapsed.
pub fn write_markdown<W: Write>(
    out: W,
    classified: &Classified,
    options: &ReportOptions,
) -> Result<()> {
    let mut report = MarkdownReport { out, options };
    let thresholds = classified.thresholds();

    let regressed = classified.with_verdict(Verdict::Regressed);
    let closed_regressions = options.close_regressions || regressed.is_empty();
    report.write_details(
        Verdict::Regressed.label(),
        regressed,
        Verdict::Regressed,
        closed_regressions,
    )?;
    report.write_details(
        Verdict::Improved.label(),
        classified.with_verdict(Verdict::Improved),
        Verdict::Improved,
        true,
    )?;

    let unchanged_label = format!(
        "{} (delta < {}% or delta < {})",
        Verdict::Unchanged.label(),
        format_float(thresholds.delta_pct),
        format_time(thresholds.delta_usec)
    );
    report.write_details(
        &unchanged_label,
        classified.with_verdict(Verdict::Unchanged),
        Verdict::Unchanged,
        true,
    )?;

    report.out.flush()?;
    Ok(())
}
