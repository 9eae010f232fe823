//! Flat tab-separated comparison table

use crate::compare::{Classified, Verdict};
use crate::report::format::format_float;
use crate::report::{sort_rows, ReportOptions};
use anyhow::Result;
use std::io::Write;

/// Column names of the flat table
pub const TABLE_FIELDS: [&str; 5] = ["name", "old", "new", "delta", "delta_pct"];

/// Write changed rows (all rows with `include_unchanged`) as a sorted table
pub fn write_table<W: Write>(
    out: W,
    classified: &Classified,
    options: &ReportOptions,
) -> Result<()> {
    let mut rows: Vec<_> = classified
        .rows()
        .iter()
        .filter(|(_, verdict)| options.include_unchanged || *verdict != Verdict::Unchanged)
        .map(|(row, _)| row)
        .collect();
    sort_rows(&mut rows, options);

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    wtr.write_record(TABLE_FIELDS)?;
    for row in rows {
        wtr.write_record([
            row.name.clone(),
            row.old.to_string(),
            row.new.to_string(),
            row.delta.to_string(),
            format_float(row.delta_pct),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
