use std::path::Path;

use async_trait::async_trait;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::domain::{currency_exponent, Cents, EntryKind, PayoutRecordSet};

use super::{ExportError, ExportSink, Label, Locale};

pub const WORKBOOK_FILE: &str = "summary.xlsx";

const HEADER_COLOR: u32 = 0x1F4E79;
const MAX_COLUMN_WIDTH: usize = 50;

/// One workbook per payout: a summary sheet, then transactions, invoices
/// and fees as tables. Amounts are numeric cells so they can be summed.
pub struct XlsxSink {
    locale: Locale,
}

impl XlsxSink {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn write_workbook(&self, record_set: &PayoutRecordSet, path: &Path) -> Result<(), ExportError> {
        let l = self.locale;
        let mut workbook = Workbook::new();
        let styles = Styles::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name(l.label(Label::Summary))?;
        self.summary_sheet(sheet, record_set, &styles)?;

        let sheet = workbook.add_worksheet();
        sheet.set_name(l.label(Label::Transactions))?;
        self.transactions_sheet(sheet, record_set, &styles)?;

        if !record_set.invoices.is_empty() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(l.label(Label::Invoices))?;
            self.invoices_sheet(sheet, record_set, &styles)?;
        }

        if record_set.fee_details().next().is_some() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(l.label(Label::Fees))?;
            self.fees_sheet(sheet, record_set, &styles)?;
        }

        workbook.save(path)?;
        Ok(())
    }

    fn summary_sheet(
        &self,
        sheet: &mut Worksheet,
        record_set: &PayoutRecordSet,
        styles: &Styles,
    ) -> Result<(), ExportError> {
        let l = self.locale;
        let payout = &record_set.payout;
        let summary = &record_set.summary;

        sheet.write_string_with_format(0, 0, l.label(Label::PayoutSummary), &styles.title)?;

        let info = [
            (Label::PayoutId, payout.id.clone()),
            (Label::Date, l.date(payout.created)),
            (Label::ArrivalDate, l.date(payout.arrival_date)),
            (Label::Status, l.status_label(&payout.status)),
            (Label::Method, payout.method.clone()),
            (Label::Bank, payout.destination.clone().unwrap_or_default()),
        ];
        let mut row = 2;
        for (label, value) in info {
            sheet.write_string_with_format(row, 0, l.label(label), &styles.bold)?;
            sheet.write_string(row, 1, value)?;
            row += 1;
        }
        sheet.write_string_with_format(row, 0, l.label(Label::Amount), &styles.bold)?;
        write_amount(sheet, row, 1, payout.amount, &payout.currency)?;
        sheet.write_string(row, 2, payout.currency.to_ascii_uppercase())?;
        row += 2;

        sheet.write_string_with_format(row, 0, l.label(Label::Movements), &styles.subtitle)?;
        row += 1;
        for (currency, totals) in &summary.currencies {
            for kind in EntryKind::ALL {
                if totals.gross_by_kind.contains_key(&kind) {
                    sheet.write_string(row, 0, l.kind_label(kind))?;
                    write_amount(sheet, row, 1, totals.gross_for(kind), currency)?;
                    sheet.write_string(row, 2, currency.as_str())?;
                    row += 1;
                }
            }
            let totals_rows = [
                (Label::TotalGross, totals.gross),
                (Label::TotalFees, totals.fee),
                (Label::TotalNet, totals.net),
            ];
            for (label, amount) in totals_rows {
                sheet.write_string_with_format(row, 0, l.label(label), &styles.bold)?;
                write_amount(sheet, row, 1, amount, currency)?;
                sheet.write_string(row, 2, currency.as_str())?;
                row += 1;
            }
            row += 1;
        }

        sheet.write_string_with_format(row, 0, l.label(Label::Statistics), &styles.subtitle)?;
        row += 1;
        let counts = [
            (Label::TransactionCount, record_set.rows.len()),
            (Label::InvoiceCount, record_set.invoices.len()),
            (Label::DisputeCount, summary.dispute_count),
        ];
        for (label, count) in counts {
            sheet.write_string_with_format(row, 0, l.label(label), &styles.bold)?;
            sheet.write_number(row, 1, count as f64)?;
            row += 1;
        }

        if summary.has_warnings() {
            row += 1;
            sheet.write_string_with_format(row, 0, l.label(Label::Warnings), &styles.subtitle)?;
            row += 1;
            for warning in &summary.warnings {
                sheet.write_string(row, 0, warning.to_string())?;
                row += 1;
            }
        }

        sheet.set_column_width(0, 28)?;
        sheet.set_column_width(1, 30)?;
        sheet.set_column_width(2, 10)?;
        Ok(())
    }

    fn transactions_sheet(
        &self,
        sheet: &mut Worksheet,
        record_set: &PayoutRecordSet,
        styles: &Styles,
    ) -> Result<(), ExportError> {
        let l = self.locale;
        let headers = l.transaction_headers();
        let mut widths = write_headers(sheet, &headers, styles)?;

        for (i, row) in record_set.rows.iter().enumerate() {
            let r = i as u32 + 1;
            let entry = &row.entry;
            let texts = [
                (0, l.date(entry.timestamp)),
                (1, entry.id.clone()),
                (2, l.provider_type_label(&entry.provider_type)),
                (3, l.kind_name(entry.kind).to_string()),
                (4, row.description.clone()),
                (8, entry.currency.clone()),
                (9, row.customer_name().unwrap_or_default().to_string()),
                (10, row.invoice_number.clone().unwrap_or_default()),
            ];
            for (col, text) in texts {
                widen(&mut widths, col, &text);
                sheet.write_string(r, col, text)?;
            }
            write_amount(sheet, r, 5, entry.gross, &entry.currency)?;
            write_amount(sheet, r, 6, entry.fee, &entry.currency)?;
            write_amount(sheet, r, 7, entry.net, &entry.currency)?;
        }

        finish_table(sheet, &widths)
    }

    fn invoices_sheet(
        &self,
        sheet: &mut Worksheet,
        record_set: &PayoutRecordSet,
        styles: &Styles,
    ) -> Result<(), ExportError> {
        let l = self.locale;
        let headers = l.invoice_headers();
        let mut widths = write_headers(sheet, &headers, styles)?;

        for (i, invoice) in record_set.invoices.iter().enumerate() {
            let r = i as u32 + 1;
            let texts = [
                (0, invoice.display_number().to_string()),
                (1, l.date(invoice.created)),
                (2, invoice.due_date.map(|d| l.date(d)).unwrap_or_default()),
                (3, invoice.customer_name.clone().unwrap_or_default()),
                (4, invoice.customer_email.clone().unwrap_or_default()),
                (8, invoice.currency.to_ascii_uppercase()),
                (9, l.status_label(&invoice.status)),
                (10, invoice.id.clone()),
            ];
            for (col, text) in texts {
                widen(&mut widths, col, &text);
                sheet.write_string(r, col, text)?;
            }
            write_amount(sheet, r, 5, invoice.subtotal, &invoice.currency)?;
            write_amount(sheet, r, 6, invoice.tax, &invoice.currency)?;
            write_amount(sheet, r, 7, invoice.total, &invoice.currency)?;
        }

        finish_table(sheet, &widths)
    }

    fn fees_sheet(
        &self,
        sheet: &mut Worksheet,
        record_set: &PayoutRecordSet,
        styles: &Styles,
    ) -> Result<(), ExportError> {
        let l = self.locale;
        let headers = l.fee_headers();
        let mut widths = write_headers(sheet, &headers, styles)?;

        for (i, (entry_id, fee)) in record_set.fee_details().enumerate() {
            let r = i as u32 + 1;
            let texts = [
                (0, entry_id.to_string()),
                (1, l.fee_type_label(&fee.kind)),
                (2, fee.description.clone().unwrap_or_default()),
                (4, fee.currency.clone()),
            ];
            for (col, text) in texts {
                widen(&mut widths, col, &text);
                sheet.write_string(r, col, text)?;
            }
            write_amount(sheet, r, 3, fee.amount, &fee.currency)?;
        }

        finish_table(sheet, &widths)
    }
}

#[async_trait]
impl ExportSink for XlsxSink {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    async fn export(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError> {
        self.write_workbook(record_set, &dir.join(WORKBOOK_FILE))
    }
}

struct Styles {
    title: Format,
    subtitle: Format,
    bold: Format,
    header: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            subtitle: Format::new().set_bold().set_font_size(12),
            bold: Format::new().set_bold(),
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_COLOR)),
        }
    }
}

/// Header row in row 0. Returns the starting column widths.
fn write_headers(
    sheet: &mut Worksheet,
    headers: &[&'static str],
    styles: &Styles,
) -> Result<Vec<usize>, ExportError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &styles.header)?;
    }
    Ok(headers.iter().map(|h| h.chars().count()).collect())
}

fn widen(widths: &mut [usize], col: u16, text: &str) {
    if let Some(width) = widths.get_mut(col as usize) {
        *width = (*width).max(text.chars().count());
    }
}

fn finish_table(sheet: &mut Worksheet, widths: &[usize]) -> Result<(), ExportError> {
    for (col, width) in widths.iter().enumerate() {
        let width = (width + 2).min(MAX_COLUMN_WIDTH);
        sheet.set_column_width(col as u16, width as f64)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Minor units as a number cell with the currency's decimals.
fn write_amount(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    amount: Cents,
    currency: &str,
) -> Result<(), ExportError> {
    let exponent = currency_exponent(currency);
    let value = amount as f64 / 10f64.powi(exponent as i32);
    let format = Format::new().set_num_format(number_format(exponent));
    sheet.write_number_with_format(row, col, value, &format)?;
    Ok(())
}

fn number_format(exponent: u32) -> String {
    if exponent == 0 {
        "#,##0".to_string()
    } else {
        format!("#,##0.{}", "0".repeat(exponent as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_format_follows_exponent() {
        assert_eq!(number_format(2), "#,##0.00");
        assert_eq!(number_format(0), "#,##0");
        assert_eq!(number_format(3), "#,##0.000");
    }
}
