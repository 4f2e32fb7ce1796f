use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_currency, Cents, PayoutId};

/// Fixed classification of ledger movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Payment,
    Refund,
    Fee,
    Dispute,
    Adjustment,
    Other,
}

impl EntryKind {
    pub const ALL: [EntryKind; 6] = [
        EntryKind::Payment,
        EntryKind::Refund,
        EntryKind::Fee,
        EntryKind::Dispute,
        EntryKind::Adjustment,
        EntryKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Payment => "payment",
            EntryKind::Refund => "refund",
            EntryKind::Fee => "fee",
            EntryKind::Dispute => "dispute",
            EntryKind::Adjustment => "adjustment",
            EntryKind::Other => "other",
        }
    }

    /// Map a provider balance-transaction type to its kind.
    /// Unknown types are `Other`, never an error.
    pub fn from_provider_type(provider_type: &str) -> Self {
        match provider_type {
            "charge" | "payment" => EntryKind::Payment,
            "refund" | "payment_refund" | "payment_failure_refund" | "refund_failure" => {
                EntryKind::Refund
            }
            "stripe_fee" | "application_fee" | "application_fee_refund" | "network_cost"
            | "tax_fee" => EntryKind::Fee,
            "dispute" | "dispute_won" | "dispute_lost" | "issuing_dispute" => EntryKind::Dispute,
            "adjustment" | "reserve_transaction" | "reserved_funds" | "contribution" => {
                EntryKind::Adjustment
            }
            _ => EntryKind::Other,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One component of the fee charged on a balance transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDetail {
    pub kind: String,
    pub amount: Cents,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A balance transaction exactly as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub id: String,
    pub created: DateTime<Utc>,
    pub amount: Cents,
    pub fee: Cents,
    pub net: Cents,
    pub currency: String,
    /// Provider vocabulary, e.g. "charge", "stripe_fee", "payout"
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Originating object id (ch_, re_, dp_, in_, ...)
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub fee_details: Vec<FeeDetail>,
}

/// A classified ledger movement belonging to one payout.
///
/// Amounts are kept exactly as reported; `net == gross - fee` is checked
/// during summary computation rather than enforced here, so a provider
/// discrepancy stays visible to the accountant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub gross: Cents,
    pub fee: Cents,
    pub net: Cents,
    pub currency: String,
    pub kind: EntryKind,
    pub provider_type: String,
    pub description: Option<String>,
    pub source_id: Option<String>,
    pub payout_id: PayoutId,
    pub fee_details: Vec<FeeDetail>,
}

impl LedgerEntry {
    /// `gross - fee`, the net this entry should carry.
    pub fn expected_net(&self) -> Cents {
        self.gross - self.fee
    }

    pub fn is_balanced(&self) -> bool {
        self.net == self.expected_net()
    }
}

/// Classify a raw provider entry into the fixed `EntryKind` vocabulary.
pub fn classify(raw: RawEntry, payout_id: &str) -> LedgerEntry {
    LedgerEntry {
        kind: EntryKind::from_provider_type(&raw.entry_type),
        id: raw.id,
        timestamp: raw.created,
        gross: raw.amount,
        fee: raw.fee,
        net: raw.net,
        currency: normalize_currency(&raw.currency),
        provider_type: raw.entry_type,
        description: raw.description.filter(|d| !d.trim().is_empty()),
        source_id: raw.source.filter(|s| !s.is_empty()),
        payout_id: payout_id.to_string(),
        fee_details: raw
            .fee_details
            .into_iter()
            .map(|fee| FeeDetail {
                currency: normalize_currency(&fee.currency),
                ..fee
            })
            .collect(),
    }
}

/// Which lookup endpoint resolves an entry's originating object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginLookup {
    Charge,
    Refund,
    Invoice,
    Dispute,
}

/// Pick the lookup for an entry. The entry kind decides; kinds that carry no
/// object of their own (fees, adjustments, other) fall back to the source id
/// prefix so that e.g. a dispute adjustment still resolves to its dispute.
pub fn origin_lookup(kind: EntryKind, source_id: &str) -> Option<OriginLookup> {
    match kind {
        EntryKind::Payment => Some(OriginLookup::Charge),
        EntryKind::Refund => Some(OriginLookup::Refund),
        EntryKind::Dispute => Some(OriginLookup::Dispute),
        EntryKind::Fee | EntryKind::Adjustment | EntryKind::Other => lookup_by_prefix(source_id),
    }
}

fn lookup_by_prefix(source_id: &str) -> Option<OriginLookup> {
    if source_id.starts_with("ch_") || source_id.starts_with("py_") {
        Some(OriginLookup::Charge)
    } else if source_id.starts_with("re_") || source_id.starts_with("pyr_") {
        Some(OriginLookup::Refund)
    } else if source_id.starts_with("dp_") || source_id.starts_with("du_") {
        Some(OriginLookup::Dispute)
    } else if source_id.starts_with("in_") {
        Some(OriginLookup::Invoice)
    } else {
        None
    }
}

/// Sources that tie an entry to the payout only through an intermediate object.
pub fn is_indirect_source(source_id: &str) -> bool {
    ["tr_", "trr_", "po_"]
        .iter()
        .any(|prefix| source_id.starts_with(prefix))
}
