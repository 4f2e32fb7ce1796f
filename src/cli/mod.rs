use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::{scope, AggregateOptions, Aggregator, BatchReport, OutcomeStatus};
use crate::client::{
    InMemoryLedger, LedgerClient, LedgerSnapshot, StripeClient, StripeConfig, STRIPE_API_BASE,
};
use crate::domain::{Cents, DateRange, EntryKind, PayoutRecordSet, PayoutScope};
use crate::io::{
    BundleWriter, CsvSink, InvoiceDocumentSink, JsonReportSink, Locale, PdfReportSink, XlsxSink,
};

/// payout-export - accountant bundles for processor payouts
#[derive(Parser)]
#[command(name = "payout-export")]
#[command(about = "Collects every ledger entry behind a payout and exports it for accounting")]
#[command(version)]
pub struct Cli {
    /// Processor secret API key
    #[arg(long, env = "STRIPE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Processor API base URL
    #[arg(long, env = "STRIPE_API_BASE", default_value = STRIPE_API_BASE, global = true)]
    pub api_base: String,

    /// Replay a recorded JSON snapshot instead of calling the API
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Output conventions: fr (decimal comma, `;` separated) or en
    #[arg(long, default_value = "fr", global = true)]
    pub locale: String,

    /// Tolerated net - (gross - fee) difference, in minor units
    #[arg(long, default_value = "0", global = true)]
    pub epsilon: u32,

    /// Retries for transient API failures
    #[arg(long, default_value = "3", global = true)]
    pub max_retries: u32,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate payouts and write one bundle per payout
    Export {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Output directory
        #[arg(short, long, env = "OUTPUT_DIR", default_value = "./output")]
        output: PathBuf,

        /// Do not download invoice documents
        #[arg(long)]
        no_invoices: bool,

        /// Keep the bundle directories only, without a zip of each
        #[arg(long)]
        no_archive: bool,
    },

    /// Aggregate payouts and print their totals without writing files
    Summary {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Output format: table, json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List the paid payouts settled within a date range
    Payouts {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: String,
    },
}

/// Either one payout or a settlement date range.
#[derive(Args)]
pub struct ScopeArgs {
    /// Payout id (po_...)
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    pub payout: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<String>,
}

impl ScopeArgs {
    pub fn into_scope(self) -> Result<PayoutScope> {
        match (self.payout, self.from, self.to) {
            (Some(payout), None, None) => Ok(PayoutScope::Single(payout.trim().to_string())),
            (None, Some(from), Some(to)) => Ok(PayoutScope::Range(parse_range(&from, &to)?)),
            (None, None, None) => anyhow::bail!("Specify --payout or --from/--to"),
            _ => anyhow::bail!("--from and --to must be used together"),
        }
    }
}

/// How `summary` prints its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Table,
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(SummaryFormat::Table),
            "json" => Ok(SummaryFormat::Json),
            other => Err(format!("unsupported format '{}' (expected table or json)", other)),
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "payout_export=debug" } else { "payout_export=warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let locale: Locale = self
            .locale
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let options = AggregateOptions {
            tolerance: Cents::from(self.epsilon),
        };
        let client = self.open_client()?;

        match self.command {
            Commands::Export {
                scope,
                output,
                no_invoices,
                no_archive,
            } => {
                let scope = scope.into_scope()?;
                let mut writer = BundleWriter::new(output)
                    .with_sink(CsvSink::new(locale))
                    .with_sink(XlsxSink::new(locale))
                    .with_sink(PdfReportSink::new(locale))
                    .with_sink(JsonReportSink)
                    .with_archive(!no_archive);
                if !no_invoices {
                    writer = writer.with_sink(InvoiceDocumentSink::new(client.as_ref()));
                }
                run_export_command(client.as_ref(), &scope, options, &writer).await?;
            }

            Commands::Summary { scope, format } => {
                let format: SummaryFormat =
                    format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
                let scope = scope.into_scope()?;
                run_summary_command(client.as_ref(), &scope, options, locale, format).await?;
            }

            Commands::Payouts { from, to } => {
                let range = parse_range(&from, &to)?;
                run_payouts_command(client.as_ref(), &range, locale).await?;
            }
        }

        Ok(())
    }

    fn open_client(&self) -> Result<Box<dyn LedgerClient>> {
        if let Some(path) = &self.snapshot {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
            let snapshot: LedgerSnapshot = serde_json::from_str(&content)
                .with_context(|| format!("Invalid snapshot file: {}", path.display()))?;
            return Ok(Box::new(InMemoryLedger::new(snapshot)));
        }

        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .context("No API key: pass --api-key or set STRIPE_API_KEY (or use --snapshot)")?;
        let config = StripeConfig::new(api_key)
            .with_base_url(self.api_base.clone())
            .with_max_retries(self.max_retries);
        Ok(Box::new(StripeClient::new(config)?))
    }
}

async fn run_export_command(
    client: &dyn LedgerClient,
    scope: &PayoutScope,
    options: AggregateOptions,
    writer: &BundleWriter<'_>,
) -> Result<()> {
    let aggregator = Aggregator::new(client, options);
    let results = aggregator.aggregate(scope).await?;

    if results.is_empty() {
        println!("No payouts found for {}.", scope);
        return Ok(());
    }

    let mut report = BatchReport::new();
    for result in results {
        match result {
            Ok(record_set) => match writer.write(&record_set).await {
                Ok(path) => report.record_export(&record_set, path),
                Err(err) => {
                    warn!(payout_id = record_set.payout_id(), "export failed: {}", err);
                    report.record_failure(record_set.payout_id(), err);
                }
            },
            Err(failure) => report.record_failure(failure.payout_id, failure.error),
        }
    }

    print_batch_report(&report, writer);

    if report.has_failures() {
        anyhow::bail!(
            "{} of {} payout(s) failed",
            report.failed_count(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn print_batch_report(report: &BatchReport, writer: &BundleWriter<'_>) {
    println!("Output directory: {}", writer.output_dir().display());
    println!();
    println!("{:<32} {:<24} {}", "PAYOUT", "OUTCOME", "DETAIL");
    println!("{}", "-".repeat(80));
    for outcome in &report.outcomes {
        match &outcome.status {
            OutcomeStatus::Exported { path } => {
                println!(
                    "{:<32} {:<24} {}",
                    outcome.payout_id,
                    "exported",
                    path.display()
                );
            }
            OutcomeStatus::ExportedWithWarnings { path, warnings } => {
                println!(
                    "{:<32} {:<24} {}",
                    outcome.payout_id,
                    "exported with warnings",
                    path.display()
                );
                for warning in warnings {
                    println!("{:<32}   ! {}", "", warning);
                }
            }
            OutcomeStatus::Failed { reason } => {
                println!("{:<32} {:<24} {}", outcome.payout_id, "failed", reason);
            }
        }
    }
    println!("{}", "-".repeat(80));
    println!(
        "{} exported ({} with warnings), {} failed",
        report.exported_count(),
        report.with_warnings_count(),
        report.failed_count()
    );
}

async fn run_summary_command(
    client: &dyn LedgerClient,
    scope: &PayoutScope,
    options: AggregateOptions,
    locale: Locale,
    format: SummaryFormat,
) -> Result<()> {
    let aggregator = Aggregator::new(client, options);
    let results = aggregator.aggregate(scope).await?;

    if format == SummaryFormat::Json {
        let summaries: Vec<serde_json::Value> = results
            .iter()
            .map(|result| match result {
                Ok(set) => serde_json::json!({
                    "payout_id": set.payout_id(),
                    "summary": set.summary,
                }),
                Err(failure) => serde_json::json!({
                    "payout_id": failure.payout_id,
                    "error": failure.error.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No payouts found for {}.", scope);
        return Ok(());
    }

    for result in &results {
        match result {
            Ok(set) => print_record_set_summary(set, locale),
            Err(failure) => println!("Payout {}: FAILED ({})", failure.payout_id, failure.error),
        }
        println!();
    }
    Ok(())
}

fn print_record_set_summary(set: &PayoutRecordSet, locale: Locale) {
    let payout = &set.payout;
    let summary = &set.summary;

    println!("Payout: {}", payout.id);
    println!("  Created:    {}", locale.date(payout.created));
    println!("  Arrival:    {}", locale.date(payout.arrival_date));
    println!("  Amount:     {}", locale.money(payout.amount, &payout.currency));
    println!("  Status:     {}", locale.status_label(&payout.status));
    if let Some(span) = summary.span {
        println!(
            "  Entries:    {} ({} to {})",
            summary.entry_count(),
            locale.date(span.first),
            locale.date(span.last)
        );
    } else {
        println!("  Entries:    0");
    }
    println!("  Invoices:   {}", set.invoices.len());
    println!("  Disputes:   {}", summary.dispute_count);
    println!();

    println!(
        "  {:<8} {:>16} {:>16} {:>16} {:>8}",
        "CURRENCY", "GROSS", "FEES", "NET", "ENTRIES"
    );
    println!("  {}", "-".repeat(68));
    for (currency, totals) in &summary.currencies {
        println!(
            "  {:<8} {:>16} {:>16} {:>16} {:>8}",
            currency,
            locale.amount_grouped(totals.gross, currency),
            locale.amount_grouped(totals.fee, currency),
            locale.amount_grouped(totals.net, currency),
            totals.entry_count
        );
    }

    let counts: Vec<String> = EntryKind::ALL
        .iter()
        .filter(|kind| summary.count_for(**kind) > 0)
        .map(|kind| format!("{}: {}", locale.kind_name(*kind), summary.count_for(*kind)))
        .collect();
    if !counts.is_empty() {
        println!("  Kinds: {}", counts.join(", "));
    }

    for warning in &summary.warnings {
        println!("  ! {}", warning);
    }
}

async fn run_payouts_command(
    client: &dyn LedgerClient,
    range: &DateRange,
    locale: Locale,
) -> Result<()> {
    let payouts = scope::list_settled(client, range).await?;
    if payouts.is_empty() {
        println!("No payouts settled between {} and {}.", range.from, range.to);
        return Ok(());
    }

    println!(
        "{:<32} {:<12} {:>16} {:<10}",
        "ID", "ARRIVAL", "AMOUNT", "STATUS"
    );
    println!("{}", "-".repeat(73));
    for payout in &payouts {
        println!(
            "{:<32} {:<12} {:>16} {:<10}",
            payout.id,
            locale.date(payout.arrival_date),
            locale.money(payout.amount, &payout.currency),
            payout.status
        );
    }
    println!("{} payout(s)", payouts.len());
    Ok(())
}

fn parse_range(from: &str, to: &str) -> Result<DateRange> {
    Ok(DateRange::new(parse_date(from)?, parse_date(to)?))
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("Date must be in YYYY-MM-DD format: {}", date_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_args(payout: Option<&str>, from: Option<&str>, to: Option<&str>) -> ScopeArgs {
        ScopeArgs {
            payout: payout.map(String::from),
            from: from.map(String::from),
            to: to.map(String::from),
        }
    }

    #[test]
    fn test_scope_from_payout() {
        let scope = scope_args(Some("po_123"), None, None).into_scope().unwrap();
        assert_eq!(scope, PayoutScope::Single("po_123".into()));
    }

    #[test]
    fn test_scope_from_range() {
        let scope = scope_args(None, Some("2024-01-01"), Some("2024-01-31"))
            .into_scope()
            .unwrap();
        assert_eq!(
            scope,
            PayoutScope::Range(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            ))
        );
    }

    #[test]
    fn test_scope_requires_both_dates() {
        assert!(scope_args(None, Some("2024-01-01"), None).into_scope().is_err());
        assert!(scope_args(None, None, None).into_scope().is_err());
        assert!(scope_args(None, Some("01/01/2024"), Some("2024-01-31"))
            .into_scope()
            .is_err());
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from([
            "payout-export",
            "--snapshot",
            "data.json",
            "export",
            "--payout",
            "po_123",
            "--no-invoices",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export { no_invoices: true, .. }
        ));
        assert_eq!(cli.snapshot, Some(PathBuf::from("data.json")));
    }

    #[test]
    fn test_cli_rejects_payout_with_dates() {
        let parsed = Cli::try_parse_from([
            "payout-export",
            "export",
            "--payout",
            "po_123",
            "--from",
            "2024-01-01",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_summary_format_parsing() {
        assert_eq!("table".parse::<SummaryFormat>(), Ok(SummaryFormat::Table));
        assert_eq!("JSON".parse::<SummaryFormat>(), Ok(SummaryFormat::Json));
        assert!("csv".parse::<SummaryFormat>().is_err());
    }
}
