mod common;

use std::collections::BTreeMap;

use common::*;
use payout_export::domain::{
    classify, summarize, Cents, EnrichedRow, EntryKind, ReconciliationWarning,
};
use proptest::prelude::*;

const PROVIDER_TYPES: &[&str] = &[
    "charge",
    "payment",
    "refund",
    "stripe_fee",
    "application_fee",
    "dispute",
    "adjustment",
    "payout",
    "transfer",
    "some_future_type",
];

const CURRENCIES: &[&str] = &["eur", "usd", "jpy"];

fn provider_type() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PROVIDER_TYPES)
}

fn currency() -> impl Strategy<Value = &'static str> {
    prop::sample::select(CURRENCIES)
}

/// A balanced row as the provider reports it: net == gross - fee.
fn balanced_row() -> impl Strategy<Value = EnrichedRow> {
    (
        provider_type(),
        currency(),
        -1_000_000_000i64..1_000_000_000,
        0i64..10_000_000,
        0u32..100_000,
    )
        .prop_map(|(entry_type, currency, gross, fee, n)| {
            let mut raw = entry(&format!("txn_{}", n), entry_type, gross, fee, gross - fee, None);
            raw.currency = currency.into();
            EnrichedRow::degraded(classify(raw, "po_prop"))
        })
}

proptest! {
    #[test]
    fn prop_classified_entry_keeps_reported_amounts(
        entry_type in provider_type(),
        gross in -1_000_000_000i64..1_000_000_000,
        fee in 0i64..10_000_000,
    ) {
        let raw = entry("txn_1", entry_type, gross, fee, gross - fee, Some("ch_1"));
        let classified = classify(raw, "po_prop");

        prop_assert_eq!(classified.net, classified.gross - classified.fee);
        prop_assert!(classified.is_balanced());
        prop_assert_eq!(classified.gross, gross);
        prop_assert_eq!(classified.fee, fee);
        prop_assert_eq!(classified.kind, EntryKind::from_provider_type(entry_type));
    }

    #[test]
    fn prop_summary_totals_match_rows(rows in prop::collection::vec(balanced_row(), 0..60)) {
        let summary = summarize(&rows, 0);

        let mut expected: BTreeMap<String, (Cents, Cents, Cents, usize)> = BTreeMap::new();
        for row in &rows {
            let totals = expected.entry(row.entry.currency.clone()).or_default();
            totals.0 += row.entry.gross;
            totals.1 += row.entry.fee;
            totals.2 += row.entry.net;
            totals.3 += 1;
        }

        prop_assert_eq!(summary.currencies.len(), expected.len());
        for (currency, (gross, fee, net, count)) in &expected {
            let totals = &summary.currencies[currency];
            prop_assert_eq!(totals.gross, *gross);
            prop_assert_eq!(totals.fee, *fee);
            prop_assert_eq!(totals.net, *net);
            prop_assert_eq!(totals.entry_count, *count);
            prop_assert_eq!(totals.net, totals.gross - totals.fee);
        }
        prop_assert_eq!(summary.entry_count(), rows.len());
        let by_kind: usize = EntryKind::ALL.iter().map(|k| summary.count_for(*k)).sum();
        prop_assert_eq!(by_kind, rows.len());
        let has_mismatch = summary.warnings.iter().any(|w| matches!(
            w,
            ReconciliationWarning::NetMismatch { .. } | ReconciliationWarning::EntryImbalance { .. }
        ));
        prop_assert!(!has_mismatch);
    }

    #[test]
    fn prop_imbalance_beyond_tolerance_is_reported(
        gross in -1_000_000i64..1_000_000,
        fee in 0i64..10_000,
        drift in -50i64..50,
        tolerance in 0i64..25,
    ) {
        let raw = entry("txn_1", "charge", gross, fee, gross - fee + drift, None);
        let rows = vec![EnrichedRow::degraded(classify(raw, "po_prop"))];

        let summary = summarize(&rows, tolerance);
        let flagged = summary
            .warnings
            .iter()
            .any(|w| matches!(w, ReconciliationWarning::NetMismatch { .. }));

        prop_assert_eq!(flagged, drift.abs() > tolerance);
    }
}
