//! Read access to the payment processor's ledger.
//!
//! `LedgerClient` is the only seam between aggregation and the outside world:
//! `StripeClient` talks to the live API, `InMemoryLedger` replays a recorded
//! snapshot.

mod memory;
mod stripe;

pub use memory::*;
pub use stripe::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Charge, Customer, DateRange, Dispute, Invoice, PayoutInfo, RawEntry, Refund,
};

#[derive(Error, Debug)]
pub enum ClientError {
    /// The object does not exist or this key may not read it
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Retryable failure that persisted after the client's own retries
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("request failed: {0}")]
    Fatal(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        ClientError::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

pub trait ClientResultExt<T> {
    /// Turn `NotFound` into `Ok(None)`, keeping every other failure.
    fn found(self) -> Result<Option<T>, ClientError>;
}

impl<T> ClientResultExt<T> for Result<T, ClientError> {
    fn found(self) -> Result<Option<T>, ClientError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    /// Cursor to pass back for the next page
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
            next_cursor: None,
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Paid payouts whose settlement date falls within `range`.
    async fn list_payouts(
        &self,
        range: &DateRange,
        cursor: Option<&str>,
    ) -> Result<Page<PayoutInfo>, ClientError>;

    async fn get_payout(&self, payout_id: &str) -> Result<PayoutInfo, ClientError>;

    /// Balance transactions settled by `payout_id`, oldest first.
    async fn list_balance_transactions(
        &self,
        payout_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawEntry>, ClientError>;

    async fn get_charge(&self, id: &str) -> Result<Charge, ClientError>;

    async fn get_refund(&self, id: &str) -> Result<Refund, ClientError>;

    async fn get_invoice(&self, id: &str) -> Result<Invoice, ClientError>;

    async fn get_dispute(&self, id: &str) -> Result<Dispute, ClientError>;

    async fn get_customer(&self, id: &str) -> Result<Customer, ClientError>;

    /// Raw bytes of the rendered invoice document.
    async fn get_invoice_document(&self, invoice: &Invoice) -> Result<Vec<u8>, ClientError>;
}
