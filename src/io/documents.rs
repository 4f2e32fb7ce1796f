use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::LedgerClient;
use crate::domain::PayoutRecordSet;

use super::{ExportError, ExportSink};

pub const INVOICE_DIR: &str = "invoices";

/// Downloads the rendered document of every invoice in the record set.
///
/// A document that cannot be fetched is logged and skipped; the rest of the
/// bundle is still useful without it.
pub struct InvoiceDocumentSink<'a> {
    client: &'a dyn LedgerClient,
}

impl<'a> InvoiceDocumentSink<'a> {
    pub fn new(client: &'a dyn LedgerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExportSink for InvoiceDocumentSink<'_> {
    fn name(&self) -> &'static str {
        "invoice documents"
    }

    async fn export(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError> {
        let downloadable: Vec<_> = record_set
            .invoices
            .iter()
            .filter(|invoice| invoice.document_url.is_some())
            .collect();
        if downloadable.is_empty() {
            return Ok(());
        }

        let target = dir.join(INVOICE_DIR);
        std::fs::create_dir_all(&target)?;

        let mut saved = 0;
        for invoice in downloadable {
            let bytes = match self.client.get_invoice_document(invoice).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(invoice_id = %invoice.id, "skipping invoice document: {}", err);
                    continue;
                }
            };
            let stem = document_file_stem(invoice.display_number());
            let mut path = target.join(format!("{}.pdf", stem));
            if path.exists() {
                // Another number sanitised to the same stem
                path = target.join(format!("{}_{}.pdf", stem, document_file_stem(&invoice.id)));
            }
            std::fs::write(&path, &bytes)?;
            debug!(invoice_id = %invoice.id, path = %path.display(), "saved invoice document");
            saved += 1;
        }

        info!(
            payout_id = record_set.payout_id(),
            saved,
            "downloaded invoice documents"
        );
        Ok(())
    }
}

/// Invoice numbers become file names: anything outside `[A-Za-z0-9._-]` is replaced.
pub fn document_file_stem(number: &str) -> String {
    let stem: String = number
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        "invoice".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_file_stem() {
        assert_eq!(document_file_stem("A1B2C3-0001"), "A1B2C3-0001");
        assert_eq!(document_file_stem("FA 2024/12"), "FA_2024_12");
        assert_eq!(document_file_stem("../etc/passwd"), "_etc_passwd");
        assert_eq!(document_file_stem(""), "invoice");
    }
}
