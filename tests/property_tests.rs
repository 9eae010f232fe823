//! Property-based tests for baseline reconciliation and classification
//!
//! Properties covered:
//! 1. Retained epochs never decrease while rows are reconciled
//! 2. Reconciling the same entry twice changes nothing the second time
//! 3. Update-mode writes never grow or shrink the tracked set
//! 4. Fresh baselines read back to the snapshot they were written from
//! 5. Zero-symmetry of diff_and_pct and strict threshold boundaries

use proptest::prelude::*;
use statsdiff::baseline::{
    read_baseline, write_baseline, Baseline, BaselineEntry, ConflictPolicy, Reconciliation,
};
use statsdiff::compare::{classify, diff_and_pct, ComparisonRow, Thresholds, Verdict};
use statsdiff::filter::StatFilter;
use statsdiff::jobstats::MergeBy;
use statsdiff::Snapshot;

fn counter_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z][a-zA-Z]{1,8}\\.Num[A-Z][a-z]{1,8}",
        "time\\.swift-[a-z]{3,8}\\.[a-z]{3,6}",
    ]
}

fn snapshot() -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map(counter_name(), -1_000_000i64..1_000_000, 1..30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retained_epoch_never_decreases(
        rows in prop::collection::vec((0i64..1_000, 0i64..5), 1..40),
    ) {
        let mut baseline = Baseline::new();
        let mut last_epoch = i64::MIN;
        for (epoch, value) in rows {
            let entry = BaselineEntry::new(epoch, value);
            baseline
                .reconcile("Sema.NumTypesValidated", entry, ConflictPolicy::LastWins)
                .unwrap();
            let retained = baseline.get("Sema.NumTypesValidated").unwrap().epoch;
            prop_assert!(retained >= last_epoch);
            last_epoch = retained;
        }
    }

    #[test]
    fn prop_reconcile_is_idempotent(
        existing in prop::option::of((0i64..1_000, -50i64..50)),
        epoch in 0i64..1_000,
        value in -50i64..50,
    ) {
        let mut baseline = Baseline::new();
        if let Some((e, v)) = existing {
            baseline
                .reconcile("IRGen.NumIRInsts", BaselineEntry::new(e, v), ConflictPolicy::LastWins)
                .unwrap();
        }
        let entry = BaselineEntry::new(epoch, value);
        baseline.reconcile("IRGen.NumIRInsts", entry, ConflictPolicy::LastWins).unwrap();
        let once = baseline.clone();

        let second = baseline
            .reconcile("IRGen.NumIRInsts", entry, ConflictPolicy::LastWins)
            .unwrap();
        prop_assert_eq!(second.changed_count(), 0);
        prop_assert!(matches!(second, Reconciliation::Unchanged | Reconciliation::KeptNewer));
        prop_assert_eq!(baseline, once);
    }

    #[test]
    fn prop_update_mode_preserves_tracked_names(
        existing in snapshot(),
        fresh in snapshot(),
        epoch in 1_000i64..2_000,
    ) {
        let mut file = Vec::new();
        write_baseline(&mut file, None, &existing, 500, ConflictPolicy::LastWins).unwrap();
        let mut baseline =
            read_baseline(file.as_slice(), &StatFilter::all(), ConflictPolicy::LastWins).unwrap();

        let mut updated = Vec::new();
        write_baseline(&mut updated, Some(&mut baseline), &fresh, epoch, ConflictPolicy::LastWins)
            .unwrap();
        let reread =
            read_baseline(updated.as_slice(), &StatFilter::all(), ConflictPolicy::LastWins)
                .unwrap();

        let before: Vec<&String> = existing.keys().collect();
        let after: Vec<&String> = reread.names().collect();
        prop_assert_eq!(before, after);

        for (name, entry) in reread.iter() {
            match fresh.get(name) {
                Some(value) => prop_assert_eq!(entry.value, *value),
                None => prop_assert_eq!(entry.value, existing[name]),
            }
        }
    }

    #[test]
    fn prop_fresh_baseline_round_trips(snap in snapshot(), epoch in 0i64..i64::MAX) {
        let mut file = Vec::new();
        write_baseline(&mut file, None, &snap, epoch, ConflictPolicy::LastWins).unwrap();
        let baseline =
            read_baseline(file.as_slice(), &StatFilter::all(), ConflictPolicy::LastWins).unwrap();
        prop_assert_eq!(baseline.values(), snap);
        prop_assert!(baseline.iter().all(|(_, entry)| entry.epoch == epoch));
    }

    #[test]
    fn prop_union_merge_of_copies_is_harmless(snap in snapshot()) {
        let mut file = Vec::new();
        write_baseline(&mut file, None, &snap, 100, ConflictPolicy::Strict).unwrap();
        let mut doubled = file.clone();
        doubled.extend_from_slice(&file);
        let baseline =
            read_baseline(doubled.as_slice(), &StatFilter::all(), ConflictPolicy::Strict).unwrap();
        prop_assert_eq!(baseline.values(), snap);
    }

    #[test]
    fn prop_diff_from_zero(new in 1i64..i64::MAX) {
        prop_assert_eq!(diff_and_pct(0, 0), (0, 0.0));
        prop_assert_eq!(diff_and_pct(0, new), (new, 100.0));
    }

    #[test]
    fn prop_delta_is_exact(old in 1i64..1_000_000_000, new in 0i64..1_000_000_000) {
        let (delta, pct) = diff_and_pct(old, new);
        prop_assert_eq!(delta, new - old);
        if delta > 0 {
            prop_assert!(pct >= 0.0);
        } else if delta < 0 {
            prop_assert!(pct <= 0.0);
        }
    }

    #[test]
    fn prop_threshold_is_strict(pct in 1u32..500) {
        // delta_pct exactly at the threshold never changes a row
        let old = 10_000_000i64;
        let new = old + old * i64::from(pct) / 100;
        let row = ComparisonRow::new("time.swift-frontend.wall", old, new);
        let thresholds = Thresholds { delta_pct: row.delta_pct, delta_usec: 0 };
        prop_assert_eq!(classify(&row, &thresholds), Verdict::Unchanged);

        let lower = Thresholds { delta_pct: row.delta_pct - 0.01, delta_usec: 0 };
        prop_assert_eq!(classify(&row, &lower), Verdict::Regressed);
    }

    #[test]
    fn prop_nonzero_min_ignores_zero(a in 0i64..1_000, b in 0i64..1_000) {
        let merged = MergeBy::Min.apply(a, b);
        if a != 0 && b != 0 {
            prop_assert_eq!(merged, a.min(b));
        } else {
            prop_assert_eq!(merged, a.max(b));
        }
    }
}
