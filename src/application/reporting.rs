use std::path::PathBuf;

use serde::Serialize;

use crate::domain::{PayoutId, PayoutRecordSet};

/// How one payout of a batch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Exported {
        path: PathBuf,
    },
    ExportedWithWarnings {
        path: PathBuf,
        warnings: Vec<String>,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutOutcome {
    pub payout_id: PayoutId,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// Per-payout outcome report for a batch run, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<PayoutOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written bundle; its summary warnings decide the status.
    pub fn record_export(&mut self, record_set: &PayoutRecordSet, path: PathBuf) {
        let warnings: Vec<String> = record_set
            .summary
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect();
        let status = if warnings.is_empty() {
            OutcomeStatus::Exported { path }
        } else {
            OutcomeStatus::ExportedWithWarnings { path, warnings }
        };
        self.outcomes.push(PayoutOutcome {
            payout_id: record_set.payout_id().to_string(),
            status,
        });
    }

    pub fn record_failure(&mut self, payout_id: impl Into<PayoutId>, reason: impl ToString) {
        self.outcomes.push(PayoutOutcome {
            payout_id: payout_id.into(),
            status: OutcomeStatus::Failed {
                reason: reason.to_string(),
            },
        });
    }

    pub fn exported_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.status, OutcomeStatus::Failed { .. }))
            .count()
    }

    pub fn with_warnings_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::ExportedWithWarnings { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.exported_count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{PayoutInfo, ReconciliationWarning, Summary};

    fn record_set(id: &str, warnings: Vec<ReconciliationWarning>) -> PayoutRecordSet {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        PayoutRecordSet {
            payout: PayoutInfo {
                id: id.into(),
                created: at,
                arrival_date: at,
                amount: 0,
                currency: "EUR".into(),
                status: "paid".into(),
                method: "standard".into(),
                destination: None,
            },
            rows: Vec::new(),
            invoices: Vec::new(),
            summary: Summary {
                warnings,
                ..Summary::default()
            },
        }
    }

    #[test]
    fn test_outcome_counts() {
        let mut report = BatchReport::new();
        report.record_export(&record_set("po_1", vec![]), PathBuf::from("out/payout_1"));
        report.record_export(
            &record_set(
                "po_2",
                vec![ReconciliationWarning::IndirectSource {
                    entry_id: "txn_1".into(),
                    source_id: "tr_1".into(),
                }],
            ),
            PathBuf::from("out/payout_2"),
        );
        report.record_failure("po_3", "transient failure: timeout");

        assert_eq!(report.exported_count(), 2);
        assert_eq!(report.with_warnings_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.has_failures());
        assert!(matches!(
            report.outcomes[1].status,
            OutcomeStatus::ExportedWithWarnings { ref warnings, .. } if warnings.len() == 1
        ));
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let mut report = BatchReport::new();
        report.record_failure("po_3", "boom");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["payout_id"], "po_3");
        assert_eq!(json["outcomes"][0]["status"], "failed");
        assert_eq!(json["outcomes"][0]["reason"], "boom");
    }
}
