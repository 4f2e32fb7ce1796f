use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{EntryKind, PayoutRecordSet};

use super::{Label, Locale};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{sink} export failed: {message}")]
    Sink { sink: &'static str, message: String },
}

/// Something that turns one payout's record set into files under a directory.
#[async_trait]
pub trait ExportSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write this sink's artifacts for `record_set` into `dir`, which exists.
    async fn export(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError>;
}

/// Delimited text files for spreadsheet import.
pub struct CsvSink {
    locale: Locale,
}

impl CsvSink {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    fn writer(&self, path: &Path) -> Result<csv::Writer<BufWriter<File>>, ExportError> {
        let mut file = BufWriter::new(File::create(path)?);
        if self.locale.writes_bom() {
            file.write_all(UTF8_BOM)?;
        }
        Ok(csv::WriterBuilder::new()
            .delimiter(self.locale.delimiter())
            .flexible(true)
            .from_writer(file))
    }

    pub fn write_summary(&self, record_set: &PayoutRecordSet, path: &Path) -> Result<(), ExportError> {
        let l = self.locale;
        let payout = &record_set.payout;
        let summary = &record_set.summary;
        let mut w = self.writer(path)?;

        pair(&mut w, l.label(Label::PayoutSummary), "")?;
        pair(&mut w, "", "")?;
        pair(&mut w, l.label(Label::PayoutId), &payout.id)?;
        pair(&mut w, l.label(Label::Date), &l.date(payout.created))?;
        pair(&mut w, l.label(Label::ArrivalDate), &l.date(payout.arrival_date))?;
        pair(&mut w, l.label(Label::Amount), &l.money(payout.amount, &payout.currency))?;
        pair(&mut w, l.label(Label::Status), &l.status_label(&payout.status))?;
        pair(&mut w, l.label(Label::Method), &payout.method)?;
        pair(&mut w, l.label(Label::Bank), payout.destination.as_deref().unwrap_or(""))?;

        pair(&mut w, "", "")?;
        pair(&mut w, l.label(Label::Movements), "")?;
        for (currency, totals) in &summary.currencies {
            pair(&mut w, "", "")?;
            pair(&mut w, l.label(Label::Currency), currency)?;
            for kind in EntryKind::ALL {
                if totals.gross_by_kind.contains_key(&kind) {
                    pair(&mut w, l.kind_label(kind), &l.money(totals.gross_for(kind), currency))?;
                }
            }
            pair(&mut w, l.label(Label::TotalGross), &l.money(totals.gross, currency))?;
            pair(&mut w, l.label(Label::TotalFees), &l.money(totals.fee, currency))?;
            pair(&mut w, l.label(Label::TotalNet), &l.money(totals.net, currency))?;
        }

        pair(&mut w, "", "")?;
        pair(&mut w, l.label(Label::Statistics), "")?;
        pair(&mut w, l.label(Label::TransactionCount), &record_set.rows.len().to_string())?;
        pair(&mut w, l.label(Label::InvoiceCount), &record_set.invoices.len().to_string())?;
        pair(&mut w, l.label(Label::DisputeCount), &summary.dispute_count.to_string())?;
        if let Some(span) = summary.span {
            let period = format!("{} - {}", l.date(span.first), l.date(span.last));
            pair(&mut w, l.label(Label::Period), &period)?;
        }

        if summary.has_warnings() {
            pair(&mut w, "", "")?;
            pair(&mut w, l.label(Label::Warnings), "")?;
            for warning in &summary.warnings {
                pair(&mut w, "", &warning.to_string())?;
            }
        }

        w.flush()?;
        Ok(())
    }

    pub fn write_transactions(
        &self,
        record_set: &PayoutRecordSet,
        path: &Path,
    ) -> Result<usize, ExportError> {
        let l = self.locale;
        let mut w = self.writer(path)?;
        w.write_record(l.transaction_headers())?;

        for row in &record_set.rows {
            let entry = &row.entry;
            w.write_record([
                l.date(entry.timestamp),
                entry.id.clone(),
                l.provider_type_label(&entry.provider_type),
                l.kind_name(entry.kind).to_string(),
                row.description.clone(),
                l.amount(entry.gross, &entry.currency),
                l.amount(entry.fee, &entry.currency),
                l.amount(entry.net, &entry.currency),
                entry.currency.clone(),
                row.customer_name().unwrap_or_default().to_string(),
                row.invoice_number.clone().unwrap_or_default(),
            ])?;
        }

        w.flush()?;
        Ok(record_set.rows.len())
    }

    pub fn write_invoices(
        &self,
        record_set: &PayoutRecordSet,
        path: &Path,
    ) -> Result<usize, ExportError> {
        let l = self.locale;
        let mut w = self.writer(path)?;
        w.write_record(l.invoice_headers())?;

        for invoice in &record_set.invoices {
            // Prefer the customer we resolved for the row over the invoice's snapshot
            let customer = record_set
                .rows
                .iter()
                .filter_map(|row| row.customer.as_ref())
                .find(|c| invoice.customer.as_deref() == Some(c.id.as_str()));
            let name = customer
                .map(|c| c.display_name().to_string())
                .or_else(|| invoice.customer_name.clone())
                .unwrap_or_default();
            let email = customer
                .and_then(|c| c.email.clone())
                .or_else(|| invoice.customer_email.clone())
                .unwrap_or_default();

            w.write_record([
                invoice.display_number().to_string(),
                l.date(invoice.created),
                invoice.due_date.map(|d| l.date(d)).unwrap_or_default(),
                name,
                email,
                l.amount(invoice.subtotal, &invoice.currency),
                l.amount(invoice.tax, &invoice.currency),
                l.amount(invoice.total, &invoice.currency),
                invoice.currency.to_ascii_uppercase(),
                l.status_label(&invoice.status),
                invoice.id.clone(),
            ])?;
        }

        w.flush()?;
        Ok(record_set.invoices.len())
    }

    pub fn write_fees(&self, record_set: &PayoutRecordSet, path: &Path) -> Result<usize, ExportError> {
        let l = self.locale;
        let mut w = self.writer(path)?;
        w.write_record(l.fee_headers())?;

        let mut count = 0;
        for (entry_id, fee) in record_set.fee_details() {
            w.write_record([
                entry_id.to_string(),
                l.fee_type_label(&fee.kind),
                fee.description.clone().unwrap_or_default(),
                l.amount(fee.amount, &fee.currency),
                fee.currency.clone(),
            ])?;
            count += 1;
        }

        w.flush()?;
        Ok(count)
    }
}

#[async_trait]
impl ExportSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn export(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError> {
        self.write_summary(record_set, &dir.join("summary.csv"))?;
        self.write_transactions(record_set, &dir.join("transactions.csv"))?;
        if !record_set.invoices.is_empty() {
            self.write_invoices(record_set, &dir.join("invoices.csv"))?;
        }
        if record_set.fee_details().next().is_some() {
            self.write_fees(record_set, &dir.join("fees.csv"))?;
        }
        Ok(())
    }
}

fn pair<W: Write>(w: &mut csv::Writer<W>, key: &str, value: &str) -> Result<(), ExportError> {
    w.write_record([key, value])?;
    Ok(())
}

/// Full record set as machine-readable JSON
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    exported_at: DateTime<Utc>,
    #[serde(flatten)]
    record_set: &'a PayoutRecordSet,
}

pub struct JsonReportSink;

#[async_trait]
impl ExportSink for JsonReportSink {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn export(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError> {
        let report = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            exported_at: Utc::now(),
            record_set,
        };
        let mut file = BufWriter::new(File::create(dir.join("report.json"))?);
        serde_json::to_writer_pretty(&mut file, &report)?;
        file.flush()?;
        Ok(())
    }
}
