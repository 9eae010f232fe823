// Epoch reconciliation for baseline entries
//
// A baseline maps each counter name to the (epoch, value) pair that was last
// considered authoritative. Rows for the same name may arrive several times,
// e.g. after a line-based union merge of two independently updated copies,
// so every insertion goes through `Baseline::reconcile`.

use crate::baseline::store::BaselineError;
use crate::compare::diff_and_pct;
use crate::Snapshot;
use std::collections::BTreeMap;

/// One (epoch, value) pair of a baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineEntry {
    /// When the value was last deliberately updated (seconds since the Unix epoch)
    pub epoch: i64,
    pub value: i64,
}

impl BaselineEntry {
    pub fn new(epoch: i64, value: i64) -> Self {
        Self { epoch, value }
    }
}

/// How a same-epoch, different-value pair is resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The row seen last wins
    #[default]
    LastWins,
    /// Same epoch with different values is reported as a conflict
    Strict,
}

/// Outcome of reconciling one incoming entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Name was not tracked yet
    Inserted,
    /// Incoming epoch was older; the stored entry stays
    KeptNewer,
    /// Same value; the stored epoch stays
    Unchanged,
    /// Incoming entry replaced the stored one
    Changed { previous: BaselineEntry },
}

impl Reconciliation {
    /// Contribution of this outcome to a baseline's changed count
    pub fn changed_count(&self) -> usize {
        match self {
            Reconciliation::Changed { .. } => 1,
            _ => 0,
        }
    }
}

/// Epoch-stamped counter table, one entry per name, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    entries: BTreeMap<String, BaselineEntry>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh baseline stamping every value of `snapshot` with `epoch`
    pub fn from_snapshot(snapshot: &Snapshot, epoch: i64) -> Self {
        let entries = snapshot
            .iter()
            .map(|(name, value)| (name.clone(), BaselineEntry::new(epoch, *value)))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BaselineEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BaselineEntry)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Values without their epochs, for comparison against a fresh run
    pub fn values(&self) -> Snapshot {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value))
            .collect()
    }

    /// Merge one incoming (epoch, value) pair for `name`
    ///
    /// - unseen name: recorded as is
    /// - incoming epoch older than the stored one: stored entry kept
    /// - same value: stored epoch kept (no churn from duplicate rows)
    /// - otherwise the incoming entry is adopted and counts as a change
    ///
    /// Under `ConflictPolicy::Strict` an incoming entry with the stored epoch
    /// but a different value is an error instead of a change.
    pub fn reconcile(
        &mut self,
        name: &str,
        incoming: BaselineEntry,
        policy: ConflictPolicy,
    ) -> Result<Reconciliation, BaselineError> {
        let Some(existing) = self.entries.get(name).copied() else {
            self.entries.insert(name.to_string(), incoming);
            return Ok(Reconciliation::Inserted);
        };

        if existing.epoch > incoming.epoch {
            tracing::info!(
                "note: keeping newer value {} from epoch {} for {}",
                existing.value,
                existing.epoch,
                name
            );
            return Ok(Reconciliation::KeptNewer);
        }

        if existing.value == incoming.value {
            return Ok(Reconciliation::Unchanged);
        }

        if policy == ConflictPolicy::Strict && existing.epoch == incoming.epoch {
            return Err(BaselineError::Conflict {
                name: name.to_string(),
                epoch: incoming.epoch,
                existing: existing.value,
                incoming: incoming.value,
            });
        }

        let (_, delta_pct) = diff_and_pct(existing.value, incoming.value);
        tracing::info!(
            "note: changing value {} -> {} ({:.2}%) for {}",
            existing.value,
            incoming.value,
            delta_pct,
            name
        );
        self.entries.insert(name.to_string(), incoming);

        Ok(Reconciliation::Changed { previous: existing })
    }
}
