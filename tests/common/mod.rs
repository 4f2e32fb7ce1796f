// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use payout_export::client::{InMemoryLedger, LedgerSnapshot};
use payout_export::domain::{
    Cents, Charge, Customer, Dispute, FeeDetail, Invoice, PayoutInfo, RawEntry, Refund,
};

/// Helper to parse a date string into DateTime<Utc> at midnight
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub fn day(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn payout(id: &str, created: &str, arrival: &str, amount: Cents) -> PayoutInfo {
    PayoutInfo {
        id: id.into(),
        created: parse_date(created),
        arrival_date: parse_date(arrival),
        amount,
        currency: "eur".into(),
        status: "paid".into(),
        method: "standard".into(),
        destination: Some("FR **** 1234 (BNP Paribas)".into()),
    }
}

pub fn entry(
    id: &str,
    entry_type: &str,
    amount: Cents,
    fee: Cents,
    net: Cents,
    source: Option<&str>,
) -> RawEntry {
    RawEntry {
        id: id.into(),
        created: parse_date("2024-02-10"),
        amount,
        fee,
        net,
        currency: "eur".into(),
        entry_type: entry_type.into(),
        description: None,
        source: source.map(String::from),
        fee_details: Vec::new(),
    }
}

pub fn stripe_fee(amount: Cents) -> FeeDetail {
    FeeDetail {
        kind: "stripe_fee".into(),
        amount,
        currency: "eur".into(),
        description: Some("Stripe processing fees".into()),
    }
}

pub fn customer(id: &str, name: Option<&str>, email: Option<&str>) -> Customer {
    Customer {
        id: id.into(),
        name: name.map(String::from),
        email: email.map(String::from),
    }
}

pub fn invoice(id: &str, number: &str, customer: &str, total: Cents) -> Invoice {
    Invoice {
        id: id.into(),
        number: Some(number.into()),
        customer: Some(customer.into()),
        description: None,
        document_url: Some(format!("https://pay.example.com/{}.pdf", id)),
        created: parse_date("2024-02-01"),
        due_date: Some(parse_date("2024-03-01")),
        customer_name: None,
        customer_email: None,
        subtotal: total * 100 / 120,
        tax: total - total * 100 / 120,
        total,
        currency: "eur".into(),
        status: "paid".into(),
    }
}

/// Test fixture: the reference payout `po_123`.
///
/// A 10.00 EUR charge with 0.30 fee, the fee as its own entry tagged to the
/// same charge, and a 5.00 EUR refund. Totals: gross 470, fee 30, net 440.
pub struct ReferenceLedger;

impl ReferenceLedger {
    pub fn snapshot() -> LedgerSnapshot {
        let mut charge_entry = entry("txn_1", "charge", 1000, 30, 970, Some("ch_1"));
        charge_entry.description = Some("Subscription February".into());
        charge_entry.fee_details = vec![stripe_fee(30)];

        let mut snapshot = LedgerSnapshot {
            payouts: vec![payout("po_123", "2024-02-15", "2024-02-17", 44000)],
            charges: vec![Charge {
                id: "ch_1".into(),
                customer: Some("cus_1".into()),
                description: Some("Subscription February".into()),
                invoice: Some("in_1".into()),
            }],
            refunds: vec![Refund {
                id: "re_1".into(),
                charge: Some("ch_1".into()),
                customer: Some("cus_1".into()),
                description: None,
                reason: Some("requested_by_customer".into()),
            }],
            invoices: vec![invoice("in_1", "ACME-0001", "cus_1", 1000)],
            customers: vec![customer("cus_1", Some("Acme SARL"), Some("billing@acme.fr"))],
            ..LedgerSnapshot::default()
        };
        snapshot.balance_transactions.insert(
            "po_123".into(),
            vec![
                charge_entry,
                entry("txn_2", "stripe_fee", -30, 0, -30, Some("ch_1")),
                entry("txn_3", "refund", -500, 0, -500, Some("re_1")),
            ],
        );
        snapshot
    }

    pub fn ledger() -> InMemoryLedger {
        InMemoryLedger::new(Self::snapshot())
    }
}

pub fn charge(id: &str, customer: &str, invoice: Option<&str>) -> Charge {
    Charge {
        id: id.into(),
        customer: Some(customer.into()),
        description: None,
        invoice: invoice.map(String::from),
    }
}

pub fn dispute(id: &str, charge: &str, customer: &str, reason: &str) -> Dispute {
    Dispute {
        id: id.into(),
        charge: Some(charge.into()),
        customer: Some(customer.into()),
        reason: Some(reason.into()),
        status: "lost".into(),
    }
}

/// A payout with `count` plain charges of 1.00 EUR, none of them enrichable.
pub fn many_entries(count: usize) -> Vec<RawEntry> {
    (0..count)
        .map(|i| entry(&format!("txn_{:03}", i), "charge", 100, 3, 97, None))
        .collect()
}
