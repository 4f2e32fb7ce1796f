//! Locale-dependent rendering of amounts, dates and labels.
//!
//! All amounts arrive as integer minor units and are rendered with the
//! currency's exponent; nothing here goes through floating point.

use chrono::{DateTime, Utc};

use crate::domain::{currency_symbol, split_minor, Cents, EntryKind};

/// Output conventions for one audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// Decimal comma, `;` separated files with a BOM, dd/mm/YYYY dates
    #[default]
    Fr,
    /// Decimal point, `,` separated files, ISO dates
    En,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "fr" | "fr-fr" => Ok(Locale::Fr),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(format!("unsupported locale '{}' (expected fr or en)", other)),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locale::Fr => write!(f, "fr"),
            Locale::En => write!(f, "en"),
        }
    }
}

/// Keys for the fixed texts of the summary and report outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    PayoutSummary,
    PayoutId,
    Date,
    ArrivalDate,
    Amount,
    Status,
    Method,
    Bank,
    Movements,
    Currency,
    TotalGross,
    TotalFees,
    TotalNet,
    Statistics,
    TransactionCount,
    InvoiceCount,
    DisputeCount,
    Period,
    Warnings,
    Summary,
    Transactions,
    Invoices,
    Fees,
    Report,
    GeneratedOn,
}

impl Locale {
    pub fn delimiter(&self) -> u8 {
        match self {
            Locale::Fr => b';',
            Locale::En => b',',
        }
    }

    /// Spreadsheet software only detects UTF-8 in `;` files when a BOM is present.
    pub fn writes_bom(&self) -> bool {
        matches!(self, Locale::Fr)
    }

    fn decimal_separator(&self) -> char {
        match self {
            Locale::Fr => ',',
            Locale::En => '.',
        }
    }

    fn group_separator(&self) -> char {
        match self {
            Locale::Fr => ' ',
            Locale::En => ',',
        }
    }

    /// Amount without grouping or symbol, for machine-read columns: "1234,56".
    pub fn amount(&self, amount: Cents, currency: &str) -> String {
        self.render(amount, currency, None)
    }

    /// Amount with thousands grouping: "1 234,56" / "1,234.56".
    pub fn amount_grouped(&self, amount: Cents, currency: &str) -> String {
        self.render(amount, currency, Some(self.group_separator()))
    }

    /// Grouped amount with the currency symbol: "1 234,56 €" / "€1,234.56".
    pub fn money(&self, amount: Cents, currency: &str) -> String {
        let symbol = currency_symbol(currency);
        match self {
            Locale::Fr => format!("{} {}", self.amount_grouped(amount, currency), symbol),
            Locale::En => {
                let sign = if amount < 0 { "-" } else { "" };
                let digits = self.amount_grouped(amount.abs(), currency);
                if symbol.chars().count() == 1 {
                    format!("{}{}{}", sign, symbol, digits)
                } else {
                    format!("{}{} {}", sign, digits, symbol)
                }
            }
        }
    }

    fn render(&self, amount: Cents, currency: &str, group: Option<char>) -> String {
        let (negative, units, fraction) = split_minor(amount, currency);
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        match group {
            Some(separator) => out.push_str(&group_thousands(units, separator)),
            None => out.push_str(&units.to_string()),
        }
        if let Some(fraction) = fraction {
            out.push(self.decimal_separator());
            out.push_str(&fraction);
        }
        out
    }

    pub fn date(&self, at: DateTime<Utc>) -> String {
        match self {
            Locale::Fr => at.format("%d/%m/%Y").to_string(),
            Locale::En => at.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn datetime(&self, at: DateTime<Utc>) -> String {
        match self {
            Locale::Fr => at.format("%d/%m/%Y %H:%M").to_string(),
            Locale::En => at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }

    pub fn kind_label(&self, kind: EntryKind) -> &'static str {
        match (self, kind) {
            (Locale::Fr, EntryKind::Payment) => "Paiements",
            (Locale::Fr, EntryKind::Refund) => "Remboursements",
            (Locale::Fr, EntryKind::Fee) => "Frais",
            (Locale::Fr, EntryKind::Dispute) => "Litiges",
            (Locale::Fr, EntryKind::Adjustment) => "Ajustements",
            (Locale::Fr, EntryKind::Other) => "Autres",
            (Locale::En, EntryKind::Payment) => "Payments",
            (Locale::En, EntryKind::Refund) => "Refunds",
            (Locale::En, EntryKind::Fee) => "Fees",
            (Locale::En, EntryKind::Dispute) => "Disputes",
            (Locale::En, EntryKind::Adjustment) => "Adjustments",
            (Locale::En, EntryKind::Other) => "Other",
        }
    }

    /// Singular name of one entry's kind, for row-level columns.
    pub fn kind_name(&self, kind: EntryKind) -> &'static str {
        match (self, kind) {
            (Locale::Fr, EntryKind::Payment) => "Paiement",
            (Locale::Fr, EntryKind::Refund) => "Remboursement",
            (Locale::Fr, EntryKind::Fee) => "Frais",
            (Locale::Fr, EntryKind::Dispute) => "Litige",
            (Locale::Fr, EntryKind::Adjustment) => "Ajustement",
            (Locale::Fr, EntryKind::Other) => "Autre",
            (Locale::En, EntryKind::Payment) => "Payment",
            (Locale::En, EntryKind::Refund) => "Refund",
            (Locale::En, EntryKind::Fee) => "Fee",
            (Locale::En, EntryKind::Dispute) => "Dispute",
            (Locale::En, EntryKind::Adjustment) => "Adjustment",
            (Locale::En, EntryKind::Other) => "Other",
        }
    }

    /// Label for a provider balance-transaction type. Unknown types are shown as-is.
    pub fn provider_type_label(&self, provider_type: &str) -> String {
        let label = match self {
            Locale::Fr => match provider_type {
                "charge" | "payment" => Some("Paiement"),
                "refund" | "payment_refund" => Some("Remboursement"),
                "payment_failure_refund" => Some("Remb. Échec Paiement"),
                "adjustment" => Some("Ajustement"),
                "application_fee" => Some("Commission Application"),
                "application_fee_refund" => Some("Remb. Commission"),
                "transfer" => Some("Transfert"),
                "payout" => Some("Virement"),
                "payout_failure" => Some("Échec Virement"),
                "stripe_fee" => Some("Frais Stripe"),
                "network_cost" => Some("Coûts Réseau"),
                "tax_fee" => Some("Taxe"),
                "dispute" => Some("Litige"),
                "dispute_won" => Some("Litige Gagné"),
                "dispute_lost" => Some("Litige Perdu"),
                "reserve_transaction" | "reserved_funds" => Some("Réserve"),
                _ => None,
            },
            Locale::En => None,
        };
        label
            .map(str::to_string)
            .unwrap_or_else(|| humanize(provider_type))
    }

    pub fn fee_type_label(&self, fee_type: &str) -> String {
        let label = match self {
            Locale::Fr => match fee_type {
                "stripe_fee" => Some("Frais Stripe"),
                "application_fee" => Some("Commission Application"),
                "network_cost" => Some("Coûts Réseau"),
                "tax" => Some("Taxe"),
                _ => None,
            },
            Locale::En => None,
        };
        label
            .map(str::to_string)
            .unwrap_or_else(|| humanize(fee_type))
    }

    pub fn status_label(&self, status: &str) -> String {
        let label = match self {
            Locale::Fr => match status {
                "paid" => Some("Payé"),
                "pending" => Some("En attente"),
                "in_transit" => Some("En transit"),
                "canceled" => Some("Annulé"),
                "failed" => Some("Échoué"),
                "draft" => Some("Brouillon"),
                "open" => Some("Ouverte"),
                "uncollectible" => Some("Irrécouvrable"),
                "void" => Some("Annulée"),
                _ => None,
            },
            Locale::En => None,
        };
        label.map(str::to_string).unwrap_or_else(|| humanize(status))
    }

    pub fn label(&self, label: Label) -> &'static str {
        match self {
            Locale::Fr => match label {
                Label::PayoutSummary => "Récapitulatif du Virement",
                Label::PayoutId => "ID Payout",
                Label::Date => "Date",
                Label::ArrivalDate => "Date Arrivée",
                Label::Amount => "Montant",
                Label::Status => "Statut",
                Label::Method => "Méthode",
                Label::Bank => "Banque",
                Label::Movements => "Détail des Mouvements",
                Label::Currency => "Devise",
                Label::TotalGross => "Total Brut",
                Label::TotalFees => "Total Frais",
                Label::TotalNet => "Total Net",
                Label::Statistics => "Statistiques",
                Label::TransactionCount => "Nombre de Transactions",
                Label::InvoiceCount => "Nombre de Factures",
                Label::DisputeCount => "Nombre de Litiges",
                Label::Period => "Période",
                Label::Warnings => "Avertissements",
                Label::Summary => "Résumé",
                Label::Transactions => "Transactions",
                Label::Invoices => "Factures",
                Label::Fees => "Frais",
                Label::Report => "Rapport Comptable",
                Label::GeneratedOn => "Généré le",
            },
            Locale::En => match label {
                Label::PayoutSummary => "Payout Summary",
                Label::PayoutId => "Payout ID",
                Label::Date => "Date",
                Label::ArrivalDate => "Arrival Date",
                Label::Amount => "Amount",
                Label::Status => "Status",
                Label::Method => "Method",
                Label::Bank => "Bank",
                Label::Movements => "Movements",
                Label::Currency => "Currency",
                Label::TotalGross => "Total Gross",
                Label::TotalFees => "Total Fees",
                Label::TotalNet => "Total Net",
                Label::Statistics => "Statistics",
                Label::TransactionCount => "Transactions",
                Label::InvoiceCount => "Invoices",
                Label::DisputeCount => "Disputes",
                Label::Period => "Period",
                Label::Warnings => "Warnings",
                Label::Summary => "Summary",
                Label::Transactions => "Transactions",
                Label::Invoices => "Invoices",
                Label::Fees => "Fees",
                Label::Report => "Accounting Report",
                Label::GeneratedOn => "Generated on",
            },
        }
    }

    /// Trailer for a truncated listing.
    pub fn more_rows(&self, count: usize) -> String {
        match self {
            Locale::Fr => format!("... et {} autres transactions (voir le classeur)", count),
            Locale::En => format!("... and {} more transactions (see the workbook)", count),
        }
    }

    pub fn transaction_headers(&self) -> [&'static str; 11] {
        match self {
            Locale::Fr => [
                "Date",
                "Référence",
                "Type",
                "Catégorie",
                "Description",
                "Montant Brut",
                "Frais",
                "Montant Net",
                "Devise",
                "Client",
                "N° Facture",
            ],
            Locale::En => [
                "Date",
                "Reference",
                "Type",
                "Kind",
                "Description",
                "Gross",
                "Fee",
                "Net",
                "Currency",
                "Customer",
                "Invoice No.",
            ],
        }
    }

    pub fn invoice_headers(&self) -> [&'static str; 11] {
        match self {
            Locale::Fr => [
                "N° Facture",
                "Date",
                "Date Échéance",
                "Client",
                "Email",
                "Montant HT",
                "TVA",
                "Montant TTC",
                "Devise",
                "Statut",
                "ID Stripe",
            ],
            Locale::En => [
                "Invoice No.",
                "Date",
                "Due Date",
                "Customer",
                "Email",
                "Subtotal",
                "Tax",
                "Total",
                "Currency",
                "Status",
                "Stripe ID",
            ],
        }
    }

    pub fn fee_headers(&self) -> [&'static str; 5] {
        match self {
            Locale::Fr => ["Transaction", "Type", "Description", "Montant", "Devise"],
            Locale::En => ["Transaction", "Type", "Description", "Amount", "Currency"],
        }
    }
}

fn group_thousands(units: u64, separator: char) -> String {
    let digits = units.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(digit);
    }
    out
}

/// "dispute_won" -> "Dispute won"
fn humanize(code: &str) -> String {
    let spaced = code.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_amounts_fr() {
        let fr = Locale::Fr;
        assert_eq!(fr.amount(123456, "EUR"), "1234,56");
        assert_eq!(fr.amount(-30, "eur"), "-0,30");
        assert_eq!(fr.amount_grouped(123456789, "EUR"), "1 234 567,89");
        assert_eq!(fr.money(44000, "EUR"), "440,00 €");
        assert_eq!(fr.money(-50000, "EUR"), "-500,00 €");
        assert_eq!(fr.money(1500, "JPY"), "1 500 ¥");
    }

    #[test]
    fn test_amounts_en() {
        let en = Locale::En;
        assert_eq!(en.amount(123456, "USD"), "1234.56");
        assert_eq!(en.amount_grouped(123456789, "USD"), "1,234,567.89");
        assert_eq!(en.money(-123456, "USD"), "-$1,234.56");
        assert_eq!(en.money(1000, "CAD"), "10.00 $ CA");
        assert_eq!(en.money(1000, "CHF"), "10.00 CHF");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0, ' '), "0");
        assert_eq!(group_thousands(999, ' '), "999");
        assert_eq!(group_thousands(1000, ' '), "1 000");
        assert_eq!(group_thousands(1234567, ','), "1,234,567");
    }

    #[test]
    fn test_dates() {
        let at = Utc.with_ymd_and_hms(2024, 12, 17, 14, 30, 0).unwrap();
        assert_eq!(Locale::Fr.date(at), "17/12/2024");
        assert_eq!(Locale::En.date(at), "2024-12-17");
        assert_eq!(Locale::Fr.datetime(at), "17/12/2024 14:30");
    }

    #[test]
    fn test_labels() {
        assert_eq!(Locale::Fr.provider_type_label("stripe_fee"), "Frais Stripe");
        assert_eq!(Locale::Fr.provider_type_label("charge"), "Paiement");
        assert_eq!(Locale::Fr.provider_type_label("climate_order"), "Climate order");
        assert_eq!(Locale::En.provider_type_label("dispute_won"), "Dispute won");
        assert_eq!(Locale::Fr.status_label("paid"), "Payé");
        assert_eq!(Locale::En.status_label("in_transit"), "In transit");
        assert_eq!(Locale::Fr.kind_label(EntryKind::Refund), "Remboursements");
        assert_eq!(Locale::Fr.kind_name(EntryKind::Dispute), "Litige");
        assert_eq!(Locale::En.kind_name(EntryKind::Payment), "Payment");
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!("fr".parse::<Locale>(), Ok(Locale::Fr));
        assert_eq!("en_US".parse::<Locale>(), Ok(Locale::En));
        assert!("de".parse::<Locale>().is_err());
    }
}
