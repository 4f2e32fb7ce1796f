use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::{ClientError, ClientResultExt, LedgerClient};
use crate::domain::{
    origin_lookup, Customer, EnrichedRow, Invoice, LedgerEntry, OriginLookup, OriginatingObject,
};

/// A joined row, plus the invoice it references when there is one.
#[derive(Debug, Clone)]
pub struct JoinedRow {
    pub row: EnrichedRow,
    pub invoice: Option<Invoice>,
}

/// Resolves ledger entries to their originating objects and customers.
///
/// Customers and invoices are cached for the lifetime of the joiner, which is
/// one aggregation run. Misses are cached too so a deleted customer is only
/// asked for once.
pub struct Joiner<'a, C: ?Sized> {
    client: &'a C,
    customers: HashMap<String, Option<Customer>>,
    invoices: HashMap<String, Option<Invoice>>,
}

impl<'a, C: LedgerClient + ?Sized> Joiner<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            customers: HashMap::new(),
            invoices: HashMap::new(),
        }
    }

    /// Join one entry. `NotFound` anywhere degrades the row; any other client
    /// failure is returned.
    pub async fn join(&mut self, entry: LedgerEntry) -> Result<JoinedRow, ClientError> {
        let Some(source_id) = entry.source_id.clone() else {
            return Ok(degraded(entry));
        };
        let Some(lookup) = origin_lookup(entry.kind, &source_id) else {
            return Ok(degraded(entry));
        };

        let Some(origin) = self.origin(lookup, &source_id).await? else {
            warn!(
                entry_id = %entry.id,
                source_id = %source_id,
                "originating object not found, keeping provider description"
            );
            return Ok(degraded(entry));
        };

        let customer = match origin.customer_id() {
            Some(customer_id) => self.customer(customer_id).await?,
            None => None,
        };
        let invoice = match origin.invoice_id() {
            Some(invoice_id) => self.invoice(invoice_id).await?,
            None => None,
        };

        let description = origin
            .description()
            .or_else(|| entry.description.clone())
            .unwrap_or_default();

        Ok(JoinedRow {
            row: EnrichedRow {
                entry,
                origin: Some(origin),
                customer,
                invoice_number: invoice.as_ref().map(|i| i.display_number().to_string()),
                description,
            },
            invoice,
        })
    }

    async fn origin(
        &mut self,
        lookup: OriginLookup,
        id: &str,
    ) -> Result<Option<OriginatingObject>, ClientError> {
        let origin = match lookup {
            OriginLookup::Charge => self
                .client
                .get_charge(id)
                .await
                .found()?
                .map(OriginatingObject::Charge),
            OriginLookup::Refund => self
                .client
                .get_refund(id)
                .await
                .found()?
                .map(OriginatingObject::Refund),
            OriginLookup::Dispute => self
                .client
                .get_dispute(id)
                .await
                .found()?
                .map(OriginatingObject::Dispute),
            OriginLookup::Invoice => self.invoice(id).await?.map(OriginatingObject::Invoice),
        };
        Ok(origin)
    }

    async fn customer(&mut self, id: &str) -> Result<Option<Customer>, ClientError> {
        if let Some(cached) = self.customers.get(id) {
            return Ok(cached.clone());
        }
        let customer = self.client.get_customer(id).await.found()?;
        if customer.is_none() {
            debug!(customer_id = id, "customer not found");
        }
        self.customers.insert(id.to_string(), customer.clone());
        Ok(customer)
    }

    async fn invoice(&mut self, id: &str) -> Result<Option<Invoice>, ClientError> {
        if let Some(cached) = self.invoices.get(id) {
            return Ok(cached.clone());
        }
        let invoice = self.client.get_invoice(id).await.found()?;
        if invoice.is_none() {
            debug!(invoice_id = id, "invoice not found");
        }
        self.invoices.insert(id.to_string(), invoice.clone());
        Ok(invoice)
    }
}

fn degraded(entry: LedgerEntry) -> JoinedRow {
    JoinedRow {
        row: EnrichedRow::degraded(entry),
        invoice: None,
    }
}
