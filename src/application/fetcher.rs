use tracing::debug;

use crate::client::{ClientError, LedgerClient};
use crate::domain::RawEntry;

use super::AppError;

/// Lazy walk over the balance transactions of one payout.
///
/// Nothing is requested until `next_page` is called. Each call to
/// `EntryPages::new` starts again from the first page.
pub struct EntryPages<'a, C: ?Sized> {
    client: &'a C,
    payout_id: &'a str,
    cursor: Option<String>,
    done: bool,
}

impl<'a, C: LedgerClient + ?Sized> EntryPages<'a, C> {
    pub fn new(client: &'a C, payout_id: &'a str) -> Self {
        Self {
            client,
            payout_id,
            cursor: None,
            done: false,
        }
    }

    /// The next page of entries in provider order, or `None` once the
    /// provider has signalled the last page.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawEntry>>, ClientError> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .client
            .list_balance_transactions(self.payout_id, self.cursor.as_deref())
            .await?;
        debug!(
            payout_id = self.payout_id,
            count = page.items.len(),
            has_more = page.has_more,
            "fetched balance transaction page"
        );

        match page.next_cursor {
            Some(next) if page.has_more => self.cursor = Some(next),
            _ => self.done = true,
        }
        Ok(Some(page.items))
    }
}

/// Every entry of `payout_id`, in provider order.
///
/// A failed page fails the whole fetch; entries from earlier pages are dropped.
pub async fn fetch_entries<C: LedgerClient + ?Sized>(
    client: &C,
    payout_id: &str,
) -> Result<Vec<RawEntry>, AppError> {
    let mut pages = EntryPages::new(client, payout_id);
    let mut entries = Vec::new();
    while let Some(page) = pages
        .next_page()
        .await
        .map_err(|err| AppError::fetch(payout_id, err))?
    {
        entries.extend(page);
    }
    Ok(entries)
}
