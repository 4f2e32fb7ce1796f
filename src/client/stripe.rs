use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ClientError, LedgerClient, Page};
use crate::domain::{
    Charge, Customer, DateRange, Dispute, FeeDetail, Invoice, PayoutInfo, RawEntry, Refund,
};

pub const STRIPE_API_BASE: &str = "https://api.stripe.com";
const MAX_PAGE_SIZE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_retries: u32,
    pub page_size: usize,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: STRIPE_API_BASE.to_string(),
            max_retries: 3,
            page_size: MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// `LedgerClient` backed by the Stripe REST API.
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Fatal(format!("failed to build HTTP client: {}", err)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/v1/{path}")
    }

    fn page_limit(&self) -> String {
        self.config.page_size.clamp(1, MAX_PAGE_SIZE).to_string()
    }

    /// Send a request, retrying transient failures with exponential backoff.
    async fn send(
        &self,
        build: impl Fn() -> RequestBuilder + Send + Sync,
        resource: &'static str,
        id: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let mut attempt = 0;
        loop {
            let err = match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let body = response.text().await.unwrap_or_default();
                    debug!(resource, id, %status, "stripe error response: {}", truncate(&body, 512));
                    match classify_status(status) {
                        StatusClass::NotFound => return Err(ClientError::not_found(resource, id)),
                        StatusClass::Transient => ClientError::Transient(format!(
                            "{} {} returned {}",
                            resource, id, status
                        )),
                        StatusClass::Fatal => {
                            return Err(ClientError::Fatal(format!(
                                "{} {} returned {}: {}",
                                resource,
                                id,
                                status,
                                truncate(&body, 256)
                            )));
                        }
                    }
                }
                Err(err) if err.is_timeout() || err.is_connect() || err.is_request() => {
                    ClientError::Transient(format!("{} {}: {}", resource, id, err))
                }
                Err(err) => return Err(ClientError::Fatal(format!("{} {}: {}", resource, id, err))),
            };

            if attempt >= self.config.max_retries {
                return Err(err);
            }
            let delay = RETRY_BASE_DELAY * 2u32.pow(attempt.min(6));
            warn!(resource, id, attempt = attempt + 1, ?delay, "retrying after: {}", err);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &'static str,
        id: &str,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path);
        let response = self
            .send(
                || {
                    self.client
                        .get(&url)
                        .bearer_auth(&self.config.api_key)
                        .query(query)
                },
                resource,
                id,
            )
            .await?;
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::Transient(format!("reading {} {}: {}", resource, id, err)))?;
        serde_json::from_str(&body).map_err(|err| {
            ClientError::Decode(format!(
                "{} {}: {} (body snippet: {})",
                resource,
                id,
                err,
                truncate(&body, 256)
            ))
        })
    }
}

#[async_trait]
impl LedgerClient for StripeClient {
    async fn list_payouts(
        &self,
        range: &DateRange,
        cursor: Option<&str>,
    ) -> Result<Page<PayoutInfo>, ClientError> {
        let mut query = vec![
            ("status", "paid".to_string()),
            ("arrival_date[gte]", range.start().timestamp().to_string()),
            ("arrival_date[lte]", range.end().timestamp().to_string()),
            ("limit", self.page_limit()),
        ];
        if let Some(cursor) = cursor {
            query.push(("starting_after", cursor.to_string()));
        }
        let list: StripeList<StripePayout> = self
            .get_json("payouts", &query, "payout list", "")
            .await?;
        list.into_page(|p| p.id.clone(), StripePayout::into_domain)
    }

    async fn get_payout(&self, payout_id: &str) -> Result<PayoutInfo, ClientError> {
        let payout: StripePayout = self
            .get_json(&format!("payouts/{}", payout_id), &[], "payout", payout_id)
            .await?;
        payout.into_domain()
    }

    async fn list_balance_transactions(
        &self,
        payout_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawEntry>, ClientError> {
        let mut query = vec![
            ("payout", payout_id.to_string()),
            ("limit", self.page_limit()),
        ];
        if let Some(cursor) = cursor {
            query.push(("starting_after", cursor.to_string()));
        }
        let list: StripeList<StripeBalanceTransaction> = self
            .get_json("balance_transactions", &query, "payout", payout_id)
            .await?;
        list.into_page(|t| t.id.clone(), StripeBalanceTransaction::into_domain)
    }

    async fn get_charge(&self, id: &str) -> Result<Charge, ClientError> {
        let charge: StripeCharge = self
            .get_json(&format!("charges/{}", id), &[], "charge", id)
            .await?;
        Ok(Charge {
            id: charge.id,
            customer: charge.customer.map(Expandable::into_id),
            description: charge.description,
            invoice: charge.invoice.map(Expandable::into_id),
        })
    }

    async fn get_refund(&self, id: &str) -> Result<Refund, ClientError> {
        let query = [("expand[]", "charge".to_string())];
        let refund: StripeRefund = self
            .get_json(&format!("refunds/{}", id), &query, "refund", id)
            .await?;
        let (charge, customer) = split_charge_ref(refund.charge);
        Ok(Refund {
            id: refund.id,
            charge,
            customer,
            description: refund.description,
            reason: refund.reason,
        })
    }

    async fn get_invoice(&self, id: &str) -> Result<Invoice, ClientError> {
        let invoice: StripeInvoice = self
            .get_json(&format!("invoices/{}", id), &[], "invoice", id)
            .await?;
        invoice.into_domain()
    }

    async fn get_dispute(&self, id: &str) -> Result<Dispute, ClientError> {
        let query = [("expand[]", "charge".to_string())];
        let dispute: StripeDispute = self
            .get_json(&format!("disputes/{}", id), &query, "dispute", id)
            .await?;
        let (charge, customer) = split_charge_ref(dispute.charge);
        Ok(Dispute {
            id: dispute.id,
            charge,
            customer,
            reason: dispute.reason,
            status: dispute.status,
        })
    }

    async fn get_customer(&self, id: &str) -> Result<Customer, ClientError> {
        let customer: StripeCustomer = self
            .get_json(&format!("customers/{}", id), &[], "customer", id)
            .await?;
        if customer.deleted {
            debug!(customer_id = id, "customer was deleted");
        }
        Ok(Customer {
            id: customer.id,
            name: customer.name,
            email: customer.email,
        })
    }

    async fn get_invoice_document(&self, invoice: &Invoice) -> Result<Vec<u8>, ClientError> {
        let url = invoice
            .document_url
            .as_deref()
            .ok_or_else(|| ClientError::not_found("invoice document", invoice.id.clone()))?;
        let response = self
            .send(|| self.client.get(url), "invoice document", &invoice.id)
            .await?;
        let bytes = response.bytes().await.map_err(|err| {
            ClientError::Transient(format!("reading document {}: {}", invoice.id, err))
        })?;
        Ok(bytes.to_vec())
    }
}

enum StatusClass {
    NotFound,
    Transient,
    Fatal,
}

/// 404 and 403 both mean "this key cannot see the object"; 429 and 5xx are retryable.
fn classify_status(status: StatusCode) -> StatusClass {
    if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
        StatusClass::NotFound
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusClass::Transient
    } else {
        StatusClass::Fatal
    }
}

fn truncate(body: &str, max_len: usize) -> &str {
    if body.len() <= max_len {
        return body;
    }
    let mut end = max_len;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, ClientError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ClientError::Decode(format!("timestamp out of range: {}", secs)))
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
    has_more: bool,
}

impl<T> StripeList<T> {
    /// Stripe pages with `starting_after` = id of the last item returned.
    fn into_page<U>(
        self,
        id_of: impl Fn(&T) -> String,
        convert: impl Fn(T) -> Result<U, ClientError>,
    ) -> Result<Page<U>, ClientError> {
        let next_cursor = if self.has_more {
            self.data.last().map(&id_of)
        } else {
            None
        };
        let items = self
            .data
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            has_more: self.has_more && next_cursor.is_some(),
            next_cursor,
        })
    }
}

/// A field Stripe returns either as an id or, when expanded, as the object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Expandable<T> {
    Id(String),
    Object(T),
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

impl Expandable<ObjectId> {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(object) => object.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeChargeRef {
    id: String,
    #[serde(default)]
    customer: Option<Expandable<ObjectId>>,
}

fn split_charge_ref(charge: Option<Expandable<StripeChargeRef>>) -> (Option<String>, Option<String>) {
    match charge {
        Some(Expandable::Object(charge)) => (Some(charge.id), charge.customer.map(Expandable::into_id)),
        Some(Expandable::Id(id)) => (Some(id), None),
        None => (None, None),
    }
}

#[derive(Debug, Deserialize)]
struct StripeBankAccount {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    last4: Option<String>,
    #[serde(default)]
    bank_name: Option<String>,
}

impl StripeBankAccount {
    fn display(&self) -> String {
        let mut parts = Vec::new();
        if let Some(country) = self.country.as_deref().filter(|s| !s.is_empty()) {
            parts.push(country.to_string());
        }
        if let Some(last4) = self.last4.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("**** {}", last4));
        }
        if let Some(bank) = self.bank_name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("({})", bank));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Deserialize)]
struct StripePayout {
    id: String,
    created: i64,
    arrival_date: i64,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    destination: Option<Expandable<StripeBankAccount>>,
}

impl StripePayout {
    fn into_domain(self) -> Result<PayoutInfo, ClientError> {
        let destination = match self.destination {
            Some(Expandable::Object(account)) => Some(account.display()),
            Some(Expandable::Id(id)) => Some(id),
            None => None,
        };
        Ok(PayoutInfo {
            id: self.id,
            created: timestamp(self.created)?,
            arrival_date: timestamp(self.arrival_date)?,
            amount: self.amount,
            currency: self.currency,
            status: self.status,
            method: self.method.unwrap_or_else(|| "standard".to_string()),
            destination,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeFeeDetail {
    amount: i64,
    currency: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct StripeBalanceTransaction {
    id: String,
    created: i64,
    amount: i64,
    fee: i64,
    net: i64,
    currency: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source: Option<Expandable<ObjectId>>,
    #[serde(default)]
    fee_details: Vec<StripeFeeDetail>,
}

impl StripeBalanceTransaction {
    fn into_domain(self) -> Result<RawEntry, ClientError> {
        Ok(RawEntry {
            id: self.id,
            created: timestamp(self.created)?,
            amount: self.amount,
            fee: self.fee,
            net: self.net,
            currency: self.currency,
            entry_type: self.kind,
            description: self.description,
            source: self.source.map(Expandable::into_id),
            fee_details: self
                .fee_details
                .into_iter()
                .map(|fee| FeeDetail {
                    kind: fee.kind,
                    amount: fee.amount,
                    currency: fee.currency,
                    description: fee.description,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    id: String,
    #[serde(default)]
    customer: Option<Expandable<ObjectId>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    invoice: Option<Expandable<ObjectId>>,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    #[serde(default)]
    charge: Option<Expandable<StripeChargeRef>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeDispute {
    id: String,
    #[serde(default)]
    charge: Option<Expandable<StripeChargeRef>>,
    #[serde(default)]
    reason: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeInvoice {
    id: String,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    customer: Option<Expandable<ObjectId>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    invoice_pdf: Option<String>,
    created: i64,
    #[serde(default)]
    due_date: Option<i64>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    subtotal: i64,
    #[serde(default)]
    tax: Option<i64>,
    #[serde(default)]
    total: i64,
    currency: String,
    #[serde(default)]
    status: Option<String>,
}

impl StripeInvoice {
    fn into_domain(self) -> Result<Invoice, ClientError> {
        let due_date = self.due_date.map(timestamp).transpose()?;
        Ok(Invoice {
            id: self.id,
            number: self.number,
            customer: self.customer.map(Expandable::into_id),
            description: self.description,
            document_url: self.invoice_pdf,
            created: timestamp(self.created)?,
            due_date,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            subtotal: self.subtotal,
            tax: self.tax.unwrap_or(self.total - self.subtotal),
            total: self.total,
            currency: self.currency,
            status: self.status.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_transaction_list_into_page() {
        let body = r#"{
            "object": "list",
            "has_more": true,
            "data": [
                {"id": "txn_1", "created": 1705312800, "amount": 1000, "fee": 30, "net": 970,
                 "currency": "eur", "type": "charge", "description": "Order 42", "source": "ch_1",
                 "fee_details": [{"amount": 30, "currency": "eur", "description": "Stripe processing fees", "type": "stripe_fee"}]},
                {"id": "txn_2", "created": 1705316400, "amount": -500, "fee": 0, "net": -500,
                 "currency": "eur", "type": "refund", "description": null, "source": "re_1", "fee_details": []}
            ]
        }"#;
        let list: StripeList<StripeBalanceTransaction> = serde_json::from_str(body).unwrap();
        let page = list
            .into_page(|t| t.id.clone(), StripeBalanceTransaction::into_domain)
            .unwrap();

        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("txn_2"));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].source.as_deref(), Some("ch_1"));
        assert_eq!(page.items[0].fee_details[0].kind, "stripe_fee");
        assert_eq!(page.items[1].entry_type, "refund");
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let body = r#"{"object": "list", "has_more": false, "data": []}"#;
        let list: StripeList<StripeBalanceTransaction> = serde_json::from_str(body).unwrap();
        let page = list
            .into_page(|t| t.id.clone(), StripeBalanceTransaction::into_domain)
            .unwrap();
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_payout_with_expanded_bank_account() {
        let body = r#"{
            "id": "po_123", "created": 1705312800, "arrival_date": 1705485600,
            "amount": 44000, "currency": "eur", "status": "paid", "method": "standard",
            "destination": {"id": "ba_1", "country": "FR", "last4": "1234", "bank_name": "BNP Paribas"}
        }"#;
        let payout: StripePayout = serde_json::from_str(body).unwrap();
        let info = payout.into_domain().unwrap();
        assert_eq!(info.destination.as_deref(), Some("FR **** 1234 (BNP Paribas)"));
        assert_eq!(info.settlement_date().to_string(), "2024-01-17");
    }

    #[test]
    fn test_refund_takes_customer_from_expanded_charge() {
        let body = r#"{"id": "re_1", "reason": "duplicate",
                       "charge": {"id": "ch_1", "customer": "cus_1"}}"#;
        let refund: StripeRefund = serde_json::from_str(body).unwrap();
        let (charge, customer) = split_charge_ref(refund.charge);
        assert_eq!(charge.as_deref(), Some("ch_1"));
        assert_eq!(customer.as_deref(), Some("cus_1"));
    }

    #[test]
    fn test_invoice_tax_falls_back_to_total_minus_subtotal() {
        let body = r#"{"id": "in_1", "number": "ABC-0001", "customer": "cus_1",
                       "invoice_pdf": "https://pay.example/in_1.pdf", "created": 1705312800,
                       "subtotal": 1000, "total": 1200, "currency": "eur", "status": "paid"}"#;
        let invoice: StripeInvoice = serde_json::from_str(body).unwrap();
        let invoice = invoice.into_domain().unwrap();
        assert_eq!(invoice.tax, 200);
        assert_eq!(invoice.document_url.as_deref(), Some("https://pay.example/in_1.pdf"));
    }

    #[test]
    fn test_status_classes() {
        assert!(matches!(classify_status(StatusCode::NOT_FOUND), StatusClass::NotFound));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN), StatusClass::NotFound));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusClass::Transient
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            StatusClass::Transient
        ));
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED), StatusClass::Fatal));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("résumé", 2), "r");
        assert_eq!(truncate("short", 10), "short");
    }
}
