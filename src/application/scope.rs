use tracing::debug;

use crate::client::LedgerClient;
use crate::domain::{is_valid_payout_id, DateRange, PayoutId, PayoutInfo, PayoutScope};

use super::AppError;

/// Resolve a scope into the payouts it covers.
///
/// A single id is validated and returned as-is without touching the client.
/// A range lists every paid payout settled within it, ordered by settlement
/// date then id.
pub async fn resolve<C: LedgerClient + ?Sized>(
    client: &C,
    scope: &PayoutScope,
) -> Result<Vec<PayoutId>, AppError> {
    match scope {
        PayoutScope::Single(id) => {
            validate_payout_id(id)?;
            Ok(vec![id.clone()])
        }
        PayoutScope::Range(range) => Ok(list_settled(client, range)
            .await?
            .into_iter()
            .map(|payout| payout.id)
            .collect()),
    }
}

pub fn validate_payout_id(id: &str) -> Result<(), AppError> {
    if is_valid_payout_id(id) {
        Ok(())
    } else {
        Err(AppError::InvalidScope(format!(
            "'{}' is not a payout id (expected po_...)",
            id
        )))
    }
}

/// Every paid payout settled within `range`, in resolver order.
pub async fn list_settled<C: LedgerClient + ?Sized>(
    client: &C,
    range: &DateRange,
) -> Result<Vec<PayoutInfo>, AppError> {
    if !range.is_ordered() {
        return Err(AppError::InvalidScope(format!(
            "start date {} is after end date {}",
            range.from, range.to
        )));
    }

    let mut payouts = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = client
            .list_payouts(range, cursor.as_deref())
            .await
            .map_err(AppError::ListPayouts)?;
        debug!(count = page.items.len(), has_more = page.has_more, "listed payouts page");
        payouts.extend(page.items);

        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => break,
        }
    }

    // The provider filters by instant; re-check by calendar date in UTC.
    payouts.retain(|payout| range.contains(payout.settlement_date()));
    payouts.sort_by(|a, b| {
        a.settlement_date()
            .cmp(&b.settlement_date())
            .then_with(|| a.id.cmp(&b.id))
    });
    payouts.dedup_by(|a, b| a.id == b.id);
    Ok(payouts)
}
