use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{is_indirect_source, Cents, EnrichedRow, EntryKind};

/// Totals for one currency within a payout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotals {
    pub gross: Cents,
    pub fee: Cents,
    pub net: Cents,
    pub entry_count: usize,
    /// Gross movement per entry kind
    pub gross_by_kind: BTreeMap<EntryKind, Cents>,
}

impl CurrencyTotals {
    pub fn gross_for(&self, kind: EntryKind) -> Cents {
        self.gross_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// A non-fatal discrepancy surfaced to the accountant alongside the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ReconciliationWarning {
    /// `sum(net) != sum(gross) - sum(fee)` for a currency
    NetMismatch {
        currency: String,
        gross: Cents,
        fee: Cents,
        net: Cents,
        difference: Cents,
    },
    /// A single entry whose net is not `gross - fee`
    EntryImbalance {
        entry_id: String,
        currency: String,
        expected_net: Cents,
        net: Cents,
    },
    /// Entry tied to the payout through an intermediate object (transfer, other payout)
    IndirectSource { entry_id: String, source_id: String },
}

impl std::fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationWarning::NetMismatch {
                currency,
                gross,
                fee,
                net,
                difference,
            } => write!(
                f,
                "{}: net total {} differs from gross {} - fees {} by {} minor units",
                currency, net, gross, fee, difference
            ),
            ReconciliationWarning::EntryImbalance {
                entry_id,
                currency,
                expected_net,
                net,
            } => write!(
                f,
                "{}: entry {} reports net {} but gross - fee is {}",
                currency, entry_id, net, expected_net
            ),
            ReconciliationWarning::IndirectSource {
                entry_id,
                source_id,
            } => write!(
                f,
                "entry {} is associated through {}; verify it belongs to this payout",
                entry_id, source_id
            ),
        }
    }
}

/// Aggregate view of one payout's rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub currencies: BTreeMap<String, CurrencyTotals>,
    pub kind_counts: BTreeMap<EntryKind, usize>,
    /// Distinct disputes touched by the payout
    pub dispute_count: usize,
    pub span: Option<DateSpan>,
    pub warnings: Vec<ReconciliationWarning>,
}

impl Summary {
    pub fn count_for(&self, kind: EntryKind) -> usize {
        self.kind_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn entry_count(&self) -> usize {
        self.kind_counts.values().sum()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Compute per-currency totals and check `net == gross - fee`.
/// Differences larger than `tolerance` minor units become warnings.
pub fn summarize(rows: &[EnrichedRow], tolerance: Cents) -> Summary {
    let mut summary = Summary::default();
    let mut disputes: BTreeSet<&str> = BTreeSet::new();

    for row in rows {
        let entry = &row.entry;

        let totals = summary
            .currencies
            .entry(entry.currency.clone())
            .or_default();
        totals.gross += entry.gross;
        totals.fee += entry.fee;
        totals.net += entry.net;
        totals.entry_count += 1;
        *totals.gross_by_kind.entry(entry.kind).or_insert(0) += entry.gross;

        *summary.kind_counts.entry(entry.kind).or_insert(0) += 1;

        if entry.kind == EntryKind::Dispute {
            disputes.insert(entry.source_id.as_deref().unwrap_or(entry.id.as_str()));
        }

        summary.span = Some(match summary.span {
            Some(span) => DateSpan {
                first: span.first.min(entry.timestamp),
                last: span.last.max(entry.timestamp),
            },
            None => DateSpan {
                first: entry.timestamp,
                last: entry.timestamp,
            },
        });

        if (entry.net - entry.expected_net()).abs() > tolerance {
            summary.warnings.push(ReconciliationWarning::EntryImbalance {
                entry_id: entry.id.clone(),
                currency: entry.currency.clone(),
                expected_net: entry.expected_net(),
                net: entry.net,
            });
        }

        if let Some(source_id) = entry.source_id.as_deref() {
            if is_indirect_source(source_id) && source_id != entry.payout_id {
                summary.warnings.push(ReconciliationWarning::IndirectSource {
                    entry_id: entry.id.clone(),
                    source_id: source_id.to_string(),
                });
            }
        }
    }

    summary.dispute_count = disputes.len();

    for (currency, totals) in &summary.currencies {
        let difference = totals.net - (totals.gross - totals.fee);
        if difference.abs() > tolerance {
            summary.warnings.push(ReconciliationWarning::NetMismatch {
                currency: currency.clone(),
                gross: totals.gross,
                fee: totals.fee,
                net: totals.net,
                difference,
            });
        }
    }

    summary
}
