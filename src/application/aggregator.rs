use std::collections::HashSet;

use tracing::{info, warn};

use crate::client::LedgerClient;
use crate::domain::{classify, summarize, Cents, PayoutId, PayoutRecordSet, PayoutScope};

use super::{fetch_entries, scope, AppError, Joiner};

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    /// Largest `net - (gross - fee)` difference, in minor units, that is not reported
    pub tolerance: Cents,
}

/// A payout that could not be aggregated, with the reason.
#[derive(Debug)]
pub struct PayoutFailure {
    pub payout_id: PayoutId,
    pub error: AppError,
}

pub type PayoutResult = Result<PayoutRecordSet, PayoutFailure>;

/// Collects and classifies everything that belongs to the payouts of a scope.
pub struct Aggregator<'a, C: ?Sized> {
    client: &'a C,
    options: AggregateOptions,
}

impl<'a, C: LedgerClient + ?Sized> Aggregator<'a, C> {
    pub fn new(client: &'a C, options: AggregateOptions) -> Self {
        Self { client, options }
    }

    pub async fn resolve(&self, scope: &PayoutScope) -> Result<Vec<PayoutId>, AppError> {
        scope::resolve(self.client, scope).await
    }

    /// One result per resolved payout, in resolver order.
    ///
    /// For a range, a payout that fails is recorded and the run moves on.
    /// For a single payout the failure is returned as the run's error.
    pub async fn aggregate(&self, scope: &PayoutScope) -> Result<Vec<PayoutResult>, AppError> {
        let payout_ids = self.resolve(scope).await?;
        info!(%scope, count = payout_ids.len(), "resolved payouts");

        let mut joiner = Joiner::new(self.client);
        let mut results = Vec::with_capacity(payout_ids.len());
        for payout_id in payout_ids {
            match self.aggregate_payout(&mut joiner, &payout_id).await {
                Ok(record_set) => results.push(Ok(record_set)),
                Err(error) if scope.is_single() => return Err(error),
                Err(error) => {
                    warn!(payout_id = %payout_id, "skipping payout: {}", error);
                    results.push(Err(PayoutFailure { payout_id, error }));
                }
            }
        }
        Ok(results)
    }

    /// fetch, classify, join, summarize for one payout.
    pub async fn aggregate_payout(
        &self,
        joiner: &mut Joiner<'a, C>,
        payout_id: &str,
    ) -> Result<PayoutRecordSet, AppError> {
        let payout = self
            .client
            .get_payout(payout_id)
            .await
            .map_err(|err| AppError::fetch(payout_id, err))?;
        let raw_entries = fetch_entries(self.client, payout_id).await?;

        let mut rows = Vec::with_capacity(raw_entries.len());
        let mut invoices = Vec::new();
        let mut seen_invoices = HashSet::new();
        for raw in raw_entries {
            let entry = classify(raw, payout_id);
            let joined = joiner
                .join(entry)
                .await
                .map_err(|err| AppError::fetch(payout_id, err))?;
            if let Some(invoice) = joined.invoice {
                if seen_invoices.insert(invoice.id.clone()) {
                    invoices.push(invoice);
                }
            }
            rows.push(joined.row);
        }

        let summary = summarize(&rows, self.options.tolerance);
        for warning in &summary.warnings {
            warn!(payout_id, "{}", warning);
        }
        info!(
            payout_id,
            entries = rows.len(),
            invoices = invoices.len(),
            "aggregated payout"
        );

        Ok(PayoutRecordSet {
            payout,
            rows,
            invoices,
            summary,
        })
    }
}
