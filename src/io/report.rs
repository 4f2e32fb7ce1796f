use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::domain::{Cents, EntryKind, PayoutRecordSet};

use super::{ExportError, ExportSink, Label, Locale};

pub const REPORT_FILE: &str = "report.pdf";

/// Transactions listed in the printed report; the workbook has the rest.
pub const REPORT_ROW_LIMIT: usize = 50;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const LINE_HEIGHT: f32 = 6.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;

/// Printable one-document summary of a payout for the accountant's file.
pub struct PdfReportSink {
    locale: Locale,
}

impl PdfReportSink {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn write_report(&self, record_set: &PayoutRecordSet, path: &Path) -> Result<(), ExportError> {
        let l = self.locale;
        let payout = &record_set.payout;
        let summary = &record_set.summary;

        let title = format!("{} {}", l.label(Label::Report), payout.id);
        let (doc, page, layer) = PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        let mut page = PageCursor::new(&doc, layer, regular, bold);

        page.heading(l.label(Label::Report), 16.0);
        page.text(&format!("{}: {}", l.label(Label::PayoutId), payout.id));
        page.text(&format!(
            "{} {}",
            l.label(Label::GeneratedOn),
            l.datetime(Utc::now())
        ));
        page.gap();

        page.heading(&format!("1. {}", l.label(Label::PayoutSummary)), 12.0);
        let info = [
            (Label::Date, l.date(payout.created)),
            (Label::ArrivalDate, l.date(payout.arrival_date)),
            (Label::Amount, printable_money(l, payout.amount, &payout.currency)),
            (Label::Status, l.status_label(&payout.status)),
            (Label::Method, payout.method.clone()),
            (Label::Bank, payout.destination.clone().unwrap_or_default()),
        ];
        for (label, value) in info {
            page.pair(l.label(label), &value);
        }
        page.gap();

        page.heading(&format!("2. {}", l.label(Label::Movements)), 12.0);
        for (currency, totals) in &summary.currencies {
            for kind in EntryKind::ALL {
                if totals.gross_by_kind.contains_key(&kind) {
                    page.pair(l.kind_label(kind), &printable_money(l, totals.gross_for(kind), currency));
                }
            }
            page.pair(l.label(Label::TotalGross), &printable_money(l, totals.gross, currency));
            page.pair(l.label(Label::TotalFees), &printable_money(l, totals.fee, currency));
            page.pair(l.label(Label::TotalNet), &printable_money(l, totals.net, currency));
            page.gap();
        }

        page.heading(&format!("3. {}", l.label(Label::Statistics)), 12.0);
        page.pair(l.label(Label::TransactionCount), &record_set.rows.len().to_string());
        page.pair(l.label(Label::InvoiceCount), &record_set.invoices.len().to_string());
        page.pair(l.label(Label::DisputeCount), &summary.dispute_count.to_string());
        if let Some(span) = summary.span {
            page.pair(
                l.label(Label::Period),
                &format!("{} - {}", l.date(span.first), l.date(span.last)),
            );
        }
        page.gap();

        page.heading(&format!("4. {}", l.label(Label::Transactions)), 12.0);
        let headers = l.transaction_headers();
        // Date, reference, type, gross, fee, net
        let columns = [0usize, 1, 2, 5, 6, 7];
        let offsets = [0.0, 22.0, 70.0, 110.0, 135.0, 155.0];
        let header_cells: Vec<String> = columns.iter().map(|&c| headers[c].to_string()).collect();
        page.table_row(&offsets, &header_cells, true);
        for row in record_set.rows.iter().take(REPORT_ROW_LIMIT) {
            let entry = &row.entry;
            page.table_row(
                &offsets,
                &[
                    l.date(entry.timestamp),
                    clip(&entry.id, 28),
                    clip(&l.provider_type_label(&entry.provider_type), 22),
                    l.amount_grouped(entry.gross, &entry.currency),
                    l.amount_grouped(entry.fee, &entry.currency),
                    l.amount_grouped(entry.net, &entry.currency),
                ],
                false,
            );
        }
        if record_set.rows.len() > REPORT_ROW_LIMIT {
            page.text(&l.more_rows(record_set.rows.len() - REPORT_ROW_LIMIT));
        }

        if summary.has_warnings() {
            page.gap();
            page.heading(l.label(Label::Warnings), 12.0);
            for warning in &summary.warnings {
                page.text(&warning.to_string());
            }
        }

        let mut out = BufWriter::new(File::create(path)?);
        doc.save(&mut out).map_err(pdf_error)?;
        Ok(())
    }
}

#[async_trait]
impl ExportSink for PdfReportSink {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn export(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError> {
        self.write_report(record_set, &dir.join(REPORT_FILE))
    }
}

/// Writes lines top to bottom, opening a new page when the current one is full.
struct PageCursor<'d> {
    doc: &'d PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl<'d> PageCursor<'d> {
    fn new(
        doc: &'d PdfDocumentReference,
        layer: PdfLayerReference,
        regular: IndirectFontRef,
        bold: IndirectFontRef,
    ) -> Self {
        Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= height;
    }

    fn heading(&mut self, text: &str, size: f32) {
        self.advance(LINE_HEIGHT + 2.0);
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), &self.bold);
    }

    fn text(&mut self, text: &str) {
        self.advance(LINE_HEIGHT);
        self.layer.use_text(text, BODY_SIZE, Mm(MARGIN), Mm(self.y), &self.regular);
    }

    fn pair(&mut self, label: &str, value: &str) {
        self.advance(LINE_HEIGHT);
        self.layer.use_text(label, BODY_SIZE, Mm(MARGIN), Mm(self.y), &self.bold);
        self.layer.use_text(value, BODY_SIZE, Mm(MARGIN + 60.0), Mm(self.y), &self.regular);
    }

    fn table_row(&mut self, offsets: &[f32], cells: &[String], header: bool) {
        self.advance(LINE_HEIGHT - 1.0);
        let font = if header { &self.bold } else { &self.regular };
        for (offset, cell) in offsets.iter().zip(cells) {
            self.layer
                .use_text(cell.as_str(), TABLE_SIZE, Mm(MARGIN + offset), Mm(self.y), font);
        }
    }

    fn gap(&mut self) {
        self.advance(LINE_HEIGHT / 2.0);
    }
}

/// The built-in PDF fonts have no euro glyph; amounts carry the ISO code.
fn printable_money(locale: Locale, amount: Cents, currency: &str) -> String {
    format!("{} {}", locale.amount_grouped(amount, currency), currency)
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn pdf_error(err: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(err.to_string())
}
