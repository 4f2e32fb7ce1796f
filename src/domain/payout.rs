use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Processor payout identifier, e.g. `po_1OaBcD`.
pub type PayoutId = String;

pub const PAYOUT_ID_PREFIX: &str = "po_";

/// Returns true if `id` follows the processor's payout id convention:
/// the `po_` prefix followed by a non-empty run of ASCII alphanumerics.
pub fn is_valid_payout_id(id: &str) -> bool {
    match id.strip_prefix(PAYOUT_ID_PREFIX) {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

/// Closed interval of calendar dates, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn is_ordered(&self) -> bool {
        self.from <= self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// First instant of `from`, in UTC.
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Last second of `to`, in UTC.
    pub fn end(&self) -> DateTime<Utc> {
        self.to
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| self.to.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

/// What a run exports: one named payout, or every payout settled within a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutScope {
    Single(PayoutId),
    Range(DateRange),
}

impl PayoutScope {
    pub fn is_single(&self) -> bool {
        matches!(self, PayoutScope::Single(_))
    }
}

impl std::fmt::Display for PayoutScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutScope::Single(id) => write!(f, "payout {}", id),
            PayoutScope::Range(range) => write!(f, "payouts {}..{}", range.from, range.to),
        }
    }
}

/// Header information about a payout as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutInfo {
    pub id: PayoutId,
    pub created: DateTime<Utc>,
    /// Settlement date: when the funds reach the bank account.
    pub arrival_date: DateTime<Utc>,
    pub amount: Cents,
    pub currency: String,
    pub status: String,
    pub method: String,
    /// Masked bank account, e.g. "FR **** 1234 (BNP Paribas)"
    #[serde(default)]
    pub destination: Option<String>,
}

impl PayoutInfo {
    pub fn settlement_date(&self) -> NaiveDate {
        self.arrival_date.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_payout_id_convention() {
        assert!(is_valid_payout_id("po_123"));
        assert!(is_valid_payout_id("po_1OaBcDeFgH"));
        assert!(!is_valid_payout_id(""));
        assert!(!is_valid_payout_id("po_"));
        assert!(!is_valid_payout_id("ch_123"));
        assert!(!is_valid_payout_id("po_12 3"));
        assert!(!is_valid_payout_id("PO_123"));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let range = DateRange::new(date("2024-01-01"), date("2024-01-31"));
        assert!(range.is_ordered());
        assert!(range.contains(date("2024-01-01")));
        assert!(range.contains(date("2024-01-31")));
        assert!(!range.contains(date("2024-02-01")));
        assert_eq!(range.end().date_naive(), date("2024-01-31"));
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date("2024-03-05"), date("2024-03-05"));
        assert!(range.is_ordered());
        assert!(range.contains(date("2024-03-05")));
        assert!(range.start() < range.end());
    }

    #[test]
    fn test_reversed_range_is_not_ordered() {
        let range = DateRange::new(date("2024-02-01"), date("2024-01-01"));
        assert!(!range.is_ordered());
    }
}
