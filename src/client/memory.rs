use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ClientError, LedgerClient, Page};
use crate::domain::{
    Charge, Customer, DateRange, Dispute, Invoice, PayoutInfo, RawEntry, Refund,
};

const DEFAULT_PAGE_SIZE: usize = 100;

/// A recorded copy of the processor data a run needs, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub payouts: Vec<PayoutInfo>,
    /// Balance transactions keyed by payout id, in provider order
    #[serde(default)]
    pub balance_transactions: BTreeMap<String, Vec<RawEntry>>,
    #[serde(default)]
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub refunds: Vec<Refund>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub disputes: Vec<Dispute>,
    #[serde(default)]
    pub customers: Vec<Customer>,
}

/// `LedgerClient` over a snapshot held in memory.
///
/// Pages are served with the same cursor contract as the live API, so the
/// fetcher and resolver behave identically against either.
pub struct InMemoryLedger {
    snapshot: LedgerSnapshot,
    page_size: usize,
    documents: HashMap<String, Vec<u8>>,
    /// payout id -> zero-based page index whose request fails
    failing_pages: HashMap<String, usize>,
    /// (resource, id) lookups that fail with a non-retryable error
    failing_lookups: HashSet<(&'static str, String)>,
    lookups: Mutex<BTreeMap<&'static str, usize>>,
}

impl InMemoryLedger {
    pub fn new(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot,
            page_size: DEFAULT_PAGE_SIZE,
            documents: HashMap::new(),
            failing_pages: HashMap::new(),
            failing_lookups: HashSet::new(),
            lookups: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Serve `bytes` as the rendered document of `invoice_id`.
    pub fn with_document(mut self, invoice_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.documents.insert(invoice_id.into(), bytes);
        self
    }

    /// Make the `page`-th balance transaction request for `payout_id` fail.
    pub fn with_failing_page(mut self, payout_id: impl Into<String>, page: usize) -> Self {
        self.failing_pages.insert(payout_id.into(), page);
        self
    }

    /// Make every lookup of `resource` `id` fail with `ClientError::Fatal`.
    pub fn with_failing_lookup(mut self, resource: &'static str, id: impl Into<String>) -> Self {
        self.failing_lookups.insert((resource, id.into()));
        self
    }

    /// How many single-object lookups of `resource` were served.
    pub fn lookup_count(&self, resource: &str) -> usize {
        self.lookups
            .lock()
            .map(|lookups| lookups.get(resource).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn record_lookup(&self, resource: &'static str) {
        if let Ok(mut lookups) = self.lookups.lock() {
            *lookups.entry(resource).or_insert(0) += 1;
        }
    }

    fn paginate<T: Clone>(&self, items: &[T], cursor: Option<&str>) -> Result<Page<T>, ClientError> {
        let offset = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| ClientError::Fatal(format!("invalid cursor: {}", cursor)))?,
            None => 0,
        };
        let end = (offset + self.page_size).min(items.len());
        let page = items.get(offset..end).unwrap_or_default().to_vec();
        let has_more = end < items.len();
        Ok(Page {
            items: page,
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    fn find<T: Clone>(
        &self,
        resource: &'static str,
        items: &[T],
        id: &str,
        id_of: impl Fn(&T) -> &str,
    ) -> Result<T, ClientError> {
        self.record_lookup(resource);
        if self.failing_lookups.contains(&(resource, id.to_string())) {
            debug!(resource, id, "injected lookup failure");
            return Err(ClientError::Fatal(format!("{} {} unavailable", resource, id)));
        }
        items
            .iter()
            .find(|item| id_of(item) == id)
            .cloned()
            .ok_or_else(|| ClientError::not_found(resource, id))
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn list_payouts(
        &self,
        range: &DateRange,
        cursor: Option<&str>,
    ) -> Result<Page<PayoutInfo>, ClientError> {
        let matching: Vec<PayoutInfo> = self
            .snapshot
            .payouts
            .iter()
            .filter(|p| p.status == "paid" && range.contains(p.settlement_date()))
            .cloned()
            .collect();
        self.paginate(&matching, cursor)
    }

    async fn get_payout(&self, payout_id: &str) -> Result<PayoutInfo, ClientError> {
        self.find("payout", &self.snapshot.payouts, payout_id, |p| p.id.as_str())
    }

    async fn list_balance_transactions(
        &self,
        payout_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawEntry>, ClientError> {
        if let Some(&failing) = self.failing_pages.get(payout_id) {
            let page_index = match cursor {
                Some(cursor) => cursor.parse::<usize>().unwrap_or(0) / self.page_size,
                None => 0,
            };
            if page_index == failing {
                debug!(payout_id, page_index, "injected balance transaction failure");
                return Err(ClientError::Transient(format!(
                    "page {} of {} unavailable",
                    page_index, payout_id
                )));
            }
        }

        match self.snapshot.balance_transactions.get(payout_id) {
            Some(entries) => self.paginate(entries, cursor),
            None if self.snapshot.payouts.iter().any(|p| p.id == payout_id) => {
                Ok(Page::last(Vec::new()))
            }
            None => Err(ClientError::not_found("payout", payout_id)),
        }
    }

    async fn get_charge(&self, id: &str) -> Result<Charge, ClientError> {
        self.find("charge", &self.snapshot.charges, id, |c| c.id.as_str())
    }

    async fn get_refund(&self, id: &str) -> Result<Refund, ClientError> {
        self.find("refund", &self.snapshot.refunds, id, |r| r.id.as_str())
    }

    async fn get_invoice(&self, id: &str) -> Result<Invoice, ClientError> {
        self.find("invoice", &self.snapshot.invoices, id, |i| i.id.as_str())
    }

    async fn get_dispute(&self, id: &str) -> Result<Dispute, ClientError> {
        self.find("dispute", &self.snapshot.disputes, id, |d| d.id.as_str())
    }

    async fn get_customer(&self, id: &str) -> Result<Customer, ClientError> {
        self.find("customer", &self.snapshot.customers, id, |c| c.id.as_str())
    }

    async fn get_invoice_document(&self, invoice: &Invoice) -> Result<Vec<u8>, ClientError> {
        self.documents
            .get(&invoice.id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("invoice document", invoice.id.clone()))
    }
}
