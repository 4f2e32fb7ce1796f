use serde::{Deserialize, Serialize};

use super::{Customer, FeeDetail, Invoice, LedgerEntry, OriginatingObject, PayoutInfo, Summary};

/// One ledger entry joined with what caused it and who it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub entry: LedgerEntry,
    /// Absent when the object was deleted or could not be read
    pub origin: Option<OriginatingObject>,
    pub customer: Option<Customer>,
    pub invoice_number: Option<String>,
    pub description: String,
}

impl EnrichedRow {
    /// A row carrying only what the ledger entry itself says.
    pub fn degraded(entry: LedgerEntry) -> Self {
        let description = entry.description.clone().unwrap_or_default();
        Self {
            entry,
            origin: None,
            customer: None,
            invoice_number: None,
            description,
        }
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer.as_ref().map(Customer::display_name)
    }

    pub fn is_degraded(&self) -> bool {
        self.origin.is_none()
    }
}

/// Everything exported for a single payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecordSet {
    pub payout: PayoutInfo,
    /// One row per ledger entry, in provider order
    pub rows: Vec<EnrichedRow>,
    /// Distinct invoices referenced by the rows, first-seen order
    pub invoices: Vec<Invoice>,
    pub summary: Summary,
}

impl PayoutRecordSet {
    pub fn payout_id(&self) -> &str {
        &self.payout.id
    }

    /// Fee components across all rows, paired with their entry id.
    pub fn fee_details(&self) -> impl Iterator<Item = (&str, &FeeDetail)> {
        self.rows.iter().flat_map(|row| {
            row.entry
                .fee_details
                .iter()
                .map(move |fee| (row.entry.id.as_str(), fee))
        })
    }

    /// Directory name for this payout's bundle, e.g. `payout_20240115_po_123`.
    pub fn bundle_name(&self) -> String {
        format!(
            "payout_{}_{}",
            self.payout.created.format("%Y%m%d"),
            self.payout.id
        )
    }
}
