// Tab-separated baseline file format
//
//     epoch<TAB>name<TAB>value
//     1712000000<TAB>"AST.NumSourceLines"<TAB>18234
//
// Rows are sorted by name and terminated by '\n', so the file diffs cleanly
// and can be marked `merge=union` in .gitattributes: concatenated copies are
// resolved by the reader, which keeps the newest epoch per name. Repeated
// header lines left behind by such a merge are skipped.

use crate::baseline::reconcile::{Baseline, BaselineEntry, ConflictPolicy};
use crate::filter::StatFilter;
use crate::Snapshot;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Column names of the baseline table
pub const BASELINE_FIELDS: [&str; 3] = ["epoch", "name", "value"];

/// Errors that can occur while reading or writing a baseline
#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed baseline: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed baseline row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("no stats found")]
    NoStats,

    #[error("Conflicting values for {name} at epoch {epoch}: {existing} vs {incoming}")]
    Conflict {
        name: String,
        epoch: i64,
        existing: i64,
        incoming: i64,
    },
}

/// Summary of a baseline file update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineUpdate {
    /// True when no baseline existed and a new one was written
    pub created: bool,
    /// Rows in the written file
    pub entries: usize,
    /// Entries whose value changed
    pub changed: usize,
}

/// Parse an integer cell, accepting the `123.0` form older writers produced
fn parse_integer(field: &str, line: u64, column: &str) -> Result<i64, BaselineError> {
    let field = field.trim();
    if let Ok(v) = field.parse::<i64>() {
        return Ok(v);
    }
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v as i64),
        _ => Err(BaselineError::MalformedRow {
            line,
            reason: format!("{} is not an integer: {:?}", column, field),
        }),
    }
}

/// Read a baseline table, reconciling duplicate names as rows are consumed
///
/// Only names selected by `filter` are kept. Any row without exactly three
/// fields, or with a non-integer epoch or value, fails the whole read.
pub fn read_baseline<R: Read>(
    reader: R,
    filter: &StatFilter,
    policy: ConflictPolicy,
) -> Result<Baseline, BaselineError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut baseline = Baseline::new();
    let mut changed = 0;

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != BASELINE_FIELDS.len() {
            return Err(BaselineError::MalformedRow {
                line,
                reason: format!("expected 3 fields, found {}", record.len()),
            });
        }

        if record.iter().eq(BASELINE_FIELDS) {
            continue;
        }

        let name = &record[1];
        if !filter.matches(name) {
            continue;
        }

        let epoch = parse_integer(&record[0], line, "epoch")?;
        let value = parse_integer(&record[2], line, "value")?;
        changed += baseline
            .reconcile(name, BaselineEntry::new(epoch, value), policy)?
            .changed_count();
    }

    tracing::debug!(
        "read {} baseline entries ({} superseded by later rows)",
        baseline.len(),
        changed
    );

    Ok(baseline)
}

/// Read a baseline file from disk
pub fn read_baseline_file<P: AsRef<Path>>(
    path: P,
    filter: &StatFilter,
    policy: ConflictPolicy,
) -> Result<Baseline, BaselineError> {
    let file = fs::File::open(path.as_ref())?;
    read_baseline(file, filter, policy)
}

/// Write `baseline` as a sorted, tab-separated table with a header row
fn write_rows<W: Write>(writer: W, baseline: &Baseline) -> Result<(), BaselineError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer);

    wtr.write_record(BASELINE_FIELDS)?;
    for (name, entry) in baseline.iter() {
        wtr.write_record([
            entry.epoch.to_string(),
            name.clone(),
            entry.value.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Merge `fresh` into a baseline and write the result
///
/// Without `existing` every fresh value is written at `epoch`. With
/// `existing` only names it already tracks are written: each is reconciled
/// against its fresh value at `epoch`, and names lacking a fresh value keep
/// their row. Returns the number of changed entries.
///
/// An empty `fresh` snapshot is `BaselineError::NoStats` and nothing is
/// written.
pub fn write_baseline<W: Write>(
    writer: W,
    existing: Option<&mut Baseline>,
    fresh: &Snapshot,
    epoch: i64,
    policy: ConflictPolicy,
) -> Result<usize, BaselineError> {
    if fresh.is_empty() {
        return Err(BaselineError::NoStats);
    }

    match existing {
        None => {
            write_rows(writer, &Baseline::from_snapshot(fresh, epoch))?;
            Ok(0)
        }
        Some(baseline) => {
            let mut changed = 0;
            let tracked: Vec<String> = baseline.names().cloned().collect();
            for name in tracked {
                let Some(value) = fresh.get(&name) else {
                    continue;
                };
                changed += baseline
                    .reconcile(&name, BaselineEntry::new(epoch, *value), policy)?
                    .changed_count();
            }
            write_rows(writer, baseline)?;
            Ok(changed)
        }
    }
}

/// Replace `path` with `contents` via a sibling temporary file
fn replace_file(path: &Path, contents: &[u8]) -> Result<(), BaselineError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "baseline".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Set or update the baseline file at `path` from a fresh snapshot
///
/// An existing file is read in full and updated in place: its set of names
/// never grows or shrinks. A missing file becomes a new baseline of every
/// fresh value stamped with `epoch`. The table is rendered in memory first;
/// on any error the file on disk is left untouched.
pub fn update_baseline_file<P: AsRef<Path>>(
    path: P,
    fresh: &Snapshot,
    epoch: i64,
    policy: ConflictPolicy,
) -> Result<BaselineUpdate, BaselineError> {
    let path = path.as_ref();

    let mut existing = if path.exists() {
        let baseline = read_baseline_file(path, &StatFilter::all(), policy)?;
        tracing::info!(
            "updating {} baseline entries in {}",
            baseline.len(),
            path.display()
        );
        Some(baseline)
    } else {
        tracing::info!("making new baseline {}", path.display());
        None
    };

    let created = existing.is_none();
    let mut buf = Vec::new();
    let changed = write_baseline(&mut buf, existing.as_mut(), fresh, epoch, policy)?;
    let entries = existing.as_ref().map_or(fresh.len(), Baseline::len);

    replace_file(path, &buf)?;

    if !created {
        tracing::info!("changed {} entries in baseline", changed);
    }

    Ok(BaselineUpdate {
        created,
        entries,
        changed,
    })
}
